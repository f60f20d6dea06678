pub mod component;
pub mod composite;
pub mod config;
pub mod errors;
pub mod exchange;
pub mod grid;
pub mod naming;
pub mod persistence;
pub mod registry;
pub mod resume;
pub mod time;
pub mod value;

#[cfg(test)]
mod example_components;
