//! The ordered set of components taking part in a composite run.

use crate::component::{Component, ComponentFactory};
use crate::config::ModelEntry;
use crate::errors::CouplerResult;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lifecycle phase of a single registered component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentPhase {
    Unconfigured,
    Configured,
    Running,
    Finalized,
}

impl fmt::Display for ComponentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentPhase::Unconfigured => "unconfigured",
            ComponentPhase::Configured => "configured",
            ComponentPhase::Running => "running",
            ComponentPhase::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// A component together with the id it is registered under
#[derive(Debug)]
pub struct RegisteredComponent {
    id: String,
    config_path: PathBuf,
    component: Box<dyn Component>,
    phase: ComponentPhase,
}

impl RegisteredComponent {
    pub fn new(id: &str, config_path: &Path, component: Box<dyn Component>) -> Self {
        Self {
            id: id.to_string(),
            config_path: config_path.to_path_buf(),
            component,
            phase: ComponentPhase::Unconfigured,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn phase(&self) -> ComponentPhase {
        self.phase
    }

    pub fn component(&self) -> &dyn Component {
        self.component.as_ref()
    }

    pub fn component_mut(&mut self) -> &mut dyn Component {
        self.component.as_mut()
    }

    /// Pass the configuration path on to the component
    pub fn configure(&mut self) -> CouplerResult<()> {
        self.component.configure(&self.config_path)?;
        self.phase = ComponentPhase::Configured;
        Ok(())
    }

    pub fn initialize(&mut self) -> CouplerResult<()> {
        self.component.initialize()?;
        self.phase = ComponentPhase::Running;
        Ok(())
    }

    /// Finalize the component unless that already happened
    pub fn finalize(&mut self) -> CouplerResult<()> {
        if self.phase == ComponentPhase::Finalized {
            return Ok(());
        }
        self.component.finalize()?;
        self.phase = ComponentPhase::Finalized;
        Ok(())
    }
}

/// Components in registration order
///
/// The order is fixed when the registry is configured and is the order used for
/// initialization, stepping, exchanges and every aggregated listing.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: Vec<RegisteredComponent>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct and configure a component for every entry
    ///
    /// The first failure is returned unchanged and no registry is produced.
    pub fn configure(entries: &[ModelEntry], factory: &dyn ComponentFactory) -> CouplerResult<Self> {
        let mut registry = Self::new();
        for entry in entries {
            info!(
                component = %entry.id,
                config = %entry.config_path.display(),
                "Configuring component"
            );
            let component = factory.create(&entry.id, &entry.config_path)?;
            let mut registered = RegisteredComponent::new(&entry.id, &entry.config_path, component);
            registered.configure()?;

            let reported = registered.component().component_name();
            if reported != entry.id {
                debug!(
                    component = %entry.id,
                    reported = %reported,
                    "Component reports a name different to its id"
                );
            }
            registry.components.push(registered);
        }
        Ok(registry)
    }

    /// Initialize every component in registration order
    pub fn initialize_all(&mut self) -> CouplerResult<()> {
        for registered in self.components.iter_mut() {
            info!(component = %registered.id, "Initializing component");
            registered.initialize()?;
        }
        Ok(())
    }

    /// Finalize every component that has not been finalized yet
    pub fn finalize_all(&mut self) -> CouplerResult<()> {
        for registered in self.components.iter_mut() {
            info!(component = %registered.id, "Finalizing component");
            registered.finalize()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.components.iter().any(|c| c.id == id)
    }

    /// Component ids in registration order
    pub fn ids(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.id.as_str()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredComponent> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut RegisteredComponent> {
        self.components.iter_mut().find(|c| c.id == id)
    }

    pub fn last(&self) -> Option<&RegisteredComponent> {
        self.components.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredComponent> {
        self.components.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RegisteredComponent> {
        self.components.iter_mut()
    }
}
