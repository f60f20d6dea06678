//! Couple independently steppable simulation components into a single synchronized run.
//!
//! A [`Composite`] is configured from a TOML file listing its components and the variables
//! exchanged between them. Each component is any type implementing [`Component`]; the
//! example components in [`components`] are registered automatically.
//!
//! ```no_run
//! use rcouple::Composite;
//! use std::path::Path;
//!
//! let mut composite = Composite::new();
//! composite.initialize(Path::new("composite.toml"))?;
//! composite.update_until(10.0)?;
//! let runoff = composite.get_value("land/runoff")?;
//! composite.finalize()?;
//! # Ok::<(), rcouple::errors::CouplerError>(())
//! ```

pub use rcouple_components::components;
pub use rcouple_core::{
    component, composite, config, errors, exchange, grid, naming, persistence, registry, resume,
    time, value,
};

pub use rcouple_core::component::Component;
pub use rcouple_core::composite::Composite;
