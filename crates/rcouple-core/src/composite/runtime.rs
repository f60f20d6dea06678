//! Composite struct, lifecycle and stepping.

use crate::component::{ComponentFactory, TomlComponentFactory};
use crate::config::{CompositeConfig, CouplingSettings};
use crate::errors::{CouplerError, CouplerResult};
use crate::exchange::{ExchangeBinding, ExchangeTable};
use crate::registry::ComponentRegistry;
use crate::time::Time;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::clock::CompositeClock;
use super::types::CompositePhase;

/// Several components stepped together as a single model
///
/// Components are stepped in registration order. After each component has stepped, the
/// exchanges sourced from it are applied, so a component registered later sees values
/// produced earlier in the same update while a component registered earlier only sees them
/// in the next update.
///
/// Variables of the composite are addressed as `<component id>/<variable>`.
#[derive(Debug)]
pub struct Composite {
    pub(super) registry: ComponentRegistry,
    pub(super) exchanges: ExchangeTable,
    pub(super) settings: CouplingSettings,
    pub(super) clock: Option<CompositeClock>,
    pub(super) phase: CompositePhase,
    /// An update has happened since the last rewind or initialization
    pub(super) rewind_available: bool,
}

impl Default for Composite {
    fn default() -> Self {
        Self {
            registry: ComponentRegistry::new(),
            exchanges: ExchangeTable::new(),
            settings: CouplingSettings::default(),
            clock: None,
            phase: CompositePhase::Unconfigured,
            rewind_available: false,
        }
    }
}

impl Composite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the composite configuration at `path` and configure every component
    ///
    /// Components are built from their own configuration files by [`TomlComponentFactory`].
    pub fn configure(&mut self, path: &Path) -> CouplerResult<()> {
        let config = CompositeConfig::from_file(path)?;
        info!(config = %path.display(), "Read composite configuration");
        self.configure_with(&config, &TomlComponentFactory)
    }

    /// Configure from an already parsed configuration, building components with `factory`
    pub fn configure_with(
        &mut self,
        config: &CompositeConfig,
        factory: &dyn ComponentFactory,
    ) -> CouplerResult<()> {
        self.require("configure", &[CompositePhase::Unconfigured])?;
        config.validate(Path::new("<composite configuration>"))?;

        let registry = ComponentRegistry::configure(&config.models, factory)?;
        let exchanges = ExchangeTable::from_pairs(&config.exchanges)?;
        for name in exchanges.unresolved(|id| registry.contains(id)) {
            warn!(
                variable = %name,
                "Exchange refers to a component that is not registered and will be skipped"
            );
        }

        info!(
            components = registry.len(),
            exchanges = exchanges.len(),
            "Configured composite"
        );
        self.registry = registry;
        self.exchanges = exchanges;
        self.settings = config.coupling.clone();
        self.phase = CompositePhase::Configured;
        Ok(())
    }

    /// Configure from `path` and initialize every component
    pub fn initialize(&mut self, path: &Path) -> CouplerResult<()> {
        self.configure(path)?;
        self.initialize_all()
    }

    /// Initialize every component, prime the exchanges and derive the composite clock
    ///
    /// The priming pass applies every exchange once, component by component in registration
    /// order, so inputs hold the initial outputs of their sources before the first update.
    pub fn initialize_all(&mut self) -> CouplerResult<()> {
        self.require("initialize", &[CompositePhase::Configured])?;

        let result = self.initialize_components();
        self.record_failure(&result);
        result?;

        self.phase = CompositePhase::Initialized;
        self.rewind_available = false;
        info!(
            reference = %self.reference_id(),
            current_time = self.clock()?.current_time(),
            time_step = self.clock()?.time_step(),
            "Initialized composite"
        );
        Ok(())
    }

    fn initialize_components(&mut self) -> CouplerResult<()> {
        self.registry.initialize_all()?;
        for id in self.component_ids() {
            self.apply_exchanges(&id)?;
        }
        let reference = self.reference_id();
        self.clock = Some(CompositeClock::from_registry(
            &self.registry,
            &reference,
            self.settings.strict_time_base,
        )?);
        Ok(())
    }

    /// Advance every component by one step and the composite clock by one composite step
    pub fn update(&mut self) -> CouplerResult<()> {
        self.require(
            "update",
            &[CompositePhase::Initialized, CompositePhase::Stepping],
        )?;

        let result = self.step();
        self.record_failure(&result);
        result?;

        self.phase = CompositePhase::Stepping;
        self.rewind_available = true;
        Ok(())
    }

    fn step(&mut self) -> CouplerResult<()> {
        for id in self.component_ids() {
            if let Some(registered) = self.registry.get_mut(&id) {
                registered.component_mut().update()?;
            }
            self.apply_exchanges(&id)?;
        }

        let clock = self.clock_mut()?;
        clock.advance();
        debug!(current_time = clock.current_time(), "Composite stepped");
        Ok(())
    }

    /// Copy every exchange sourced from `component` into its destination
    pub(super) fn apply_exchanges(&mut self, component: &str) -> CouplerResult<()> {
        let bindings: Vec<ExchangeBinding> =
            self.exchanges.sourced_from(component).cloned().collect();
        for binding in bindings {
            let source = binding.source();
            match self.get_value(&source)? {
                Some(value) => {
                    self.set_value(&binding.destination, &value)?;
                    debug!(
                        source = %source,
                        destination = %binding.destination,
                        "Applied exchange"
                    );
                }
                None => warn!(source = %source, "Skipping exchange with an unregistered source"),
            }
        }
        Ok(())
    }

    /// Finalize every component
    ///
    /// Allowed once initialization has been attempted: from `Initialized`, `Stepping`
    /// or `Failed`. Calling it again has no effect.
    pub fn finalize(&mut self) -> CouplerResult<()> {
        if self.phase == CompositePhase::Finalized {
            return Ok(());
        }
        self.require(
            "finalize",
            &[
                CompositePhase::Initialized,
                CompositePhase::Stepping,
                CompositePhase::Failed,
            ],
        )?;

        let result = self.registry.finalize_all();
        self.record_failure(&result);
        result?;

        self.phase = CompositePhase::Finalized;
        info!("Finalized composite");
        Ok(())
    }

    /// Ask every component to write its state to `directory`
    ///
    /// The directory is created if needed. Components are responsible for choosing file
    /// names that do not collide.
    pub fn save_state(&mut self, directory: &Path) -> CouplerResult<()> {
        self.require_running("save state")?;
        fs::create_dir_all(directory).map_err(|source| CouplerError::Io {
            path: directory.to_path_buf(),
            source,
        })?;

        let result = self
            .registry
            .iter()
            .try_for_each(|registered| registered.component().save_state(directory));
        self.record_failure(&result);
        result?;

        info!(directory = %directory.display(), "Saved composite state");
        Ok(())
    }

    /// Ask every component to read its state from `directory`
    ///
    /// The composite clock is then moved to the reference component's current time.
    pub fn load_state(&mut self, directory: &Path) -> CouplerResult<()> {
        self.require_running("load state")?;

        let result = self
            .registry
            .iter_mut()
            .try_for_each(|registered| registered.component_mut().load_state(directory));
        self.record_failure(&result);
        result?;

        let current_time = self.reference_component_time()?;
        self.clock_mut()?.resync(current_time);
        self.rewind_available = false;
        info!(
            directory = %directory.display(),
            current_time = current_time,
            "Loaded composite state"
        );
        Ok(())
    }

    /// Set the start time of every component
    ///
    /// After initialization the components' current times move with their start time,
    /// so the composite clock follows the reference component.
    pub fn set_start_time(&mut self, time: Time) -> CouplerResult<()> {
        self.require_configured("set the start time")?;
        for registered in self.registry.iter_mut() {
            registered.component_mut().set_start_time(time)?;
        }
        if self.clock.is_some() {
            let current_time = self.reference_component_time()?;
            let clock = self.clock_mut()?;
            clock.start_time = time;
            clock.rebase(current_time);
            debug!(
                start_time = time,
                current_time = current_time,
                "Moved composite start time"
            );
        }
        Ok(())
    }

    /// Set the end time of every component
    pub fn set_end_time(&mut self, time: Time) -> CouplerResult<()> {
        self.require_configured("set the end time")?;
        for registered in self.registry.iter_mut() {
            registered.component_mut().set_end_time(time)?;
        }
        if let Some(clock) = self.clock.as_mut() {
            clock.end_time = time;
        }
        Ok(())
    }

    pub fn start_time(&self) -> CouplerResult<Time> {
        Ok(self.clock()?.start_time)
    }

    pub fn end_time(&self) -> CouplerResult<Time> {
        Ok(self.clock()?.end_time)
    }

    pub fn current_time(&self) -> CouplerResult<Time> {
        Ok(self.clock()?.current_time())
    }

    pub fn time_step(&self) -> CouplerResult<Time> {
        Ok(self.clock()?.time_step())
    }

    pub fn time_units(&self) -> CouplerResult<String> {
        Ok(self.clock()?.time_units.clone())
    }

    pub fn phase(&self) -> CompositePhase {
        self.phase
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn exchanges(&self) -> &ExchangeTable {
        &self.exchanges
    }

    pub fn settings(&self) -> &CouplingSettings {
        &self.settings
    }

    /// Id of the component providing the start time, end time and units
    pub fn reference_id(&self) -> String {
        self.settings
            .reference_component
            .clone()
            .or_else(|| self.registry.last().map(|c| c.id().to_string()))
            .unwrap_or_default()
    }

    /// The components and their exchanges in the DOT language
    pub fn as_dot(&self) -> String {
        self.exchanges.as_dot(&self.registry.ids())
    }

    pub(super) fn component_ids(&self) -> Vec<String> {
        self.registry.ids().into_iter().map(String::from).collect()
    }

    pub(super) fn clock(&self) -> CouplerResult<&CompositeClock> {
        self.clock.as_ref().ok_or_else(|| CouplerError::InvalidPhase {
            operation: "read the composite clock",
            phase: self.phase.to_string(),
        })
    }

    pub(super) fn clock_mut(&mut self) -> CouplerResult<&mut CompositeClock> {
        let phase = self.phase;
        self.clock.as_mut().ok_or_else(|| CouplerError::InvalidPhase {
            operation: "step the composite clock",
            phase: phase.to_string(),
        })
    }

    fn reference_component_time(&self) -> CouplerResult<Time> {
        let reference = self.reference_id();
        self.registry
            .get(&reference)
            .map(|registered| registered.component().current_time())
            .ok_or(CouplerError::UnknownComponent(reference))
    }

    pub(super) fn require(
        &self,
        operation: &'static str,
        allowed: &[CompositePhase],
    ) -> CouplerResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(CouplerError::InvalidPhase {
                operation,
                phase: self.phase.to_string(),
            })
        }
    }

    pub(super) fn require_running(&self, operation: &'static str) -> CouplerResult<()> {
        self.require(
            operation,
            &[CompositePhase::Initialized, CompositePhase::Stepping],
        )
    }

    fn require_configured(&self, operation: &'static str) -> CouplerResult<()> {
        self.require(
            operation,
            &[
                CompositePhase::Configured,
                CompositePhase::Initialized,
                CompositePhase::Stepping,
            ],
        )
    }

    /// Move to the failed phase if `result` holds an error
    pub(super) fn record_failure<T>(&mut self, result: &CouplerResult<T>) {
        if let Err(e) = result {
            warn!(error = %e, phase = %self.phase, "Composite failed");
            self.phase = CompositePhase::Failed;
        }
    }
}
