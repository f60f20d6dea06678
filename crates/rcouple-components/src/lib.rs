//! Example components which can be coupled with `rcouple-core`.
//!
//! Linking this crate registers the components with the `typetag` registry, so they can be
//! built from configuration files by their `type` name.

pub mod components;
