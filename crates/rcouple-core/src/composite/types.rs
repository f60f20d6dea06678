//! Lifecycle phases of a composite.

use std::fmt;

/// Where a composite is in its lifecycle
///
/// ```text
/// Unconfigured -> Configured -> Initialized -> Stepping -> Finalized
/// ```
///
/// Any failure raised by a component while stepping, rewinding, saving or loading moves the
/// composite to `Failed`. A failed composite can only be finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositePhase {
    Unconfigured,
    Configured,
    Initialized,
    Stepping,
    Finalized,
    Failed,
}

impl CompositePhase {
    /// True once the components have been initialized and the composite can step
    pub fn is_running(&self) -> bool {
        matches!(self, CompositePhase::Initialized | CompositePhase::Stepping)
    }
}

impl fmt::Display for CompositePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompositePhase::Unconfigured => "unconfigured",
            CompositePhase::Configured => "configured",
            CompositePhase::Initialized => "initialized",
            CompositePhase::Stepping => "stepping",
            CompositePhase::Finalized => "finalized",
            CompositePhase::Failed => "failed",
        };
        f.write_str(name)
    }
}
