//! In-memory checkpoints for the bounded one-step rewind.
//!
//! A component checkpoints its state immediately before each update. Resuming restores that
//! checkpoint, so at most one step can be undone between updates. This is separate from the
//! directory based `save_state`/`load_state` which persist state to disk.

use crate::errors::{CouplerError, CouplerResult};

/// Holds the state of a component as it was before its most recent update
#[derive(Debug, Clone)]
pub struct ResumeBuffer<S> {
    snapshot: Option<S>,
}

impl<S> Default for ResumeBuffer<S> {
    fn default() -> Self {
        Self { snapshot: None }
    }
}

impl<S: Clone> ResumeBuffer<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a copy of `state`, replacing any earlier checkpoint
    pub fn checkpoint(&mut self, state: &S) {
        self.snapshot = Some(state.clone());
    }

    /// Remove and return the checkpoint
    pub fn take(&mut self) -> CouplerResult<S> {
        self.snapshot.take().ok_or(CouplerError::RewindUnavailable)
    }

    pub fn is_available(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn clear(&mut self) {
        self.snapshot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_latest_checkpoint_is_kept() {
        let mut buffer = ResumeBuffer::new();
        assert!(!buffer.is_available());

        buffer.checkpoint(&1);
        buffer.checkpoint(&2);
        assert_eq!(buffer.take().unwrap(), 2);
        assert!(matches!(buffer.take(), Err(CouplerError::RewindUnavailable)));
    }

    #[test]
    fn clear_discards_checkpoint() {
        let mut buffer = ResumeBuffer::new();
        buffer.checkpoint(&vec![1.0, 2.0]);
        buffer.clear();
        assert!(buffer.take().is_err());
    }
}
