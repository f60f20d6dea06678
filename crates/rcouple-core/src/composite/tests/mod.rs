//! Behaviour tests for the composite.
//!
//! These run small composites of [`TestComponent`]s built through a closure factory, so the
//! order and number of component calls can be checked from a shared [`CallLog`].

use crate::component::Component;
use crate::config::{CompositeConfig, CouplingSettings};
use crate::errors::{CouplerError, CouplerResult};
use crate::example_components::{CallLog, TestComponent};
use std::path::Path;

use super::Composite;


/// Configure a composite from components, registered in the given order
fn configure(
    components: Vec<TestComponent>,
    exchanges: &[(&str, &str)],
    coupling: CouplingSettings,
    log: &CallLog,
) -> Composite {
    let mut config = CompositeConfig::new().with_coupling(coupling);
    for component in &components {
        config = config.with_model(&component.name, format!("{}.toml", component.name));
    }
    for (source, destination) in exchanges {
        config = config.with_exchange(source, destination);
    }

    let factory = |id: &str, _path: &Path| -> CouplerResult<Box<dyn Component>> {
        components
            .iter()
            .find(|c| c.name == id)
            .map(|c| Box::new(c.clone().with_log(log)) as Box<dyn Component>)
            .ok_or_else(|| CouplerError::UnknownComponent(id.to_string()))
    };

    let mut composite = Composite::new();
    composite.configure_with(&config, &factory).unwrap();
    composite
}

/// Configure and initialize a composite
fn initialized(
    components: Vec<TestComponent>,
    exchanges: &[(&str, &str)],
    log: &CallLog,
) -> Composite {
    let mut composite = configure(components, exchanges, CouplingSettings::default(), log);
    composite.initialize_all().unwrap();
    composite
}

/// The first element of a scalar variable
fn scalar(composite: &Composite, name: &str) -> f64 {
    let value = composite.get_value(name).unwrap().unwrap();
    let first = value.as_f64().unwrap().iter().next().copied();
    first.unwrap()
}
