//! A composite runs several components as a single model.
//!
//! The composite is configured from a TOML file listing the components (`[models]`) and the
//! variables copied between them (`[exchanges]`).
//! Every update steps each component in registration order and, straight after a component
//! has stepped, copies the values it produced into the inputs of other components.
//! The composite keeps its own clock which moves by exactly one composite step per update.
//! A composite can also be moved to a target time, including a single step back in time.
//!
//! At the composite boundary, variables and attributes are addressed as
//! `<component id>/<name>`. Names whose component is not registered never cause a panic:
//! reads return `None` and writes follow the configured [`UnknownComponentPolicy`].
//!
//! [`UnknownComponentPolicy`]: crate::config::UnknownComponentPolicy

mod alignment;
mod clock;
mod router;
mod runtime;
mod types;

#[cfg(test)]
mod tests;

pub use clock::CompositeClock;
pub use runtime::Composite;
pub use types::CompositePhase;
