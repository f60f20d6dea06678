//! The clock of a composite.

use crate::errors::{CouplerError, CouplerResult};
use crate::registry::ComponentRegistry;
use crate::time::{plan_steps, StepPlan, Time};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Times closer than this are treated as equal when reconciling components
const TIME_TOLERANCE: f64 = 1e-9;

/// The composite's view of time
///
/// Start time, end time and units come from the reference component.
/// The step is the largest step of any component.
/// The current time is tracked by the composite itself: it starts at the reference
/// component's current time and moves by exactly one step per update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeClock {
    pub start_time: Time,
    pub end_time: Time,
    pub time_units: String,
    time_step: Time,
    /// Time at `step_index == 0`
    origin: Time,
    step_index: u64,
}

impl CompositeClock {
    pub fn new(
        start_time: Time,
        end_time: Time,
        time_units: &str,
        time_step: Time,
        current_time: Time,
    ) -> CouplerResult<Self> {
        if !(time_step.is_finite() && time_step > 0.0) {
            return Err(CouplerError::InvalidTimeStep(time_step));
        }
        Ok(Self {
            start_time,
            end_time,
            time_units: time_units.to_string(),
            time_step,
            origin: current_time,
            step_index: 0,
        })
    }

    /// Derive the clock from the registered components
    ///
    /// When `strict` is set every component must report the same start time, end time and
    /// time units as the reference component.
    pub fn from_registry(
        registry: &ComponentRegistry,
        reference: &str,
        strict: bool,
    ) -> CouplerResult<Self> {
        let reference_component = registry
            .get(reference)
            .ok_or_else(|| CouplerError::UnknownComponent(reference.to_string()))?
            .component();

        let start_time = reference_component.start_time();
        let end_time = reference_component.end_time();
        let time_units = reference_component.time_units();

        let mut time_step = Time::NEG_INFINITY;
        for registered in registry.iter() {
            let component = registered.component();
            time_step = time_step.max(component.time_step());

            if strict && registered.id() != reference {
                let mismatch = |quantity: &'static str, expected: String, found: String| {
                    CouplerError::TimeBaseMismatch {
                        quantity,
                        reference: reference.to_string(),
                        component: registered.id().to_string(),
                        expected,
                        found,
                    }
                };
                if (component.start_time() - start_time).abs() > TIME_TOLERANCE {
                    return Err(mismatch(
                        "start time",
                        start_time.to_string(),
                        component.start_time().to_string(),
                    ));
                }
                if (component.end_time() - end_time).abs() > TIME_TOLERANCE {
                    return Err(mismatch(
                        "end time",
                        end_time.to_string(),
                        component.end_time().to_string(),
                    ));
                }
                if component.time_units() != time_units {
                    return Err(mismatch("time units", time_units, component.time_units()));
                }
            }
        }

        let clock = Self::new(
            start_time,
            end_time,
            &time_units,
            time_step,
            reference_component.current_time(),
        )?;
        debug!(
            reference = %reference,
            start_time = clock.start_time,
            end_time = clock.end_time,
            time_step = clock.time_step,
            current_time = clock.current_time(),
            "Derived composite clock"
        );
        Ok(clock)
    }

    pub fn current_time(&self) -> Time {
        self.origin + self.step_index as f64 * self.time_step
    }

    pub fn time_step(&self) -> Time {
        self.time_step
    }

    /// Number of completed updates, net of rewinds
    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    pub fn advance(&mut self) {
        self.step_index += 1;
    }

    /// Move back a single step
    pub fn rewind(&mut self) -> CouplerResult<()> {
        if self.step_index == 0 {
            return Err(CouplerError::RewindUnavailable);
        }
        self.step_index -= 1;
        Ok(())
    }

    /// Move the clock to `time`, for example after state has been loaded
    ///
    /// If `time` is not a whole number of steps after the clock's origin, the origin is
    /// moved to `time`.
    pub fn resync(&mut self, time: Time) {
        match plan_steps(self.origin, time, self.time_step) {
            Ok(StepPlan::Stay) => self.step_index = 0,
            Ok(StepPlan::Forward(steps)) => self.step_index = steps as u64,
            _ => {
                self.origin = time;
                self.step_index = 0;
            }
        }
    }

    /// Keep the step count but shift the origin so the current time becomes `time`
    ///
    /// Used when the components' start time moves after initialization.
    pub fn rebase(&mut self, time: Time) {
        self.origin = time - self.step_index as f64 * self.time_step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::config::ModelEntry;
    use crate::example_components::TestComponent;
    use is_close::is_close;
    use std::path::{Path, PathBuf};

    fn registry(components: Vec<TestComponent>) -> ComponentRegistry {
        let entries: Vec<ModelEntry> = components
            .iter()
            .map(|c| ModelEntry {
                id: c.name.clone(),
                config_path: PathBuf::from(format!("{}.toml", c.name)),
            })
            .collect();
        let factory = move |id: &str, _path: &Path| -> CouplerResult<Box<dyn Component>> {
            let component = components
                .iter()
                .find(|c| c.name == id)
                .cloned()
                .ok_or_else(|| CouplerError::UnknownComponent(id.to_string()))?;
            Ok(Box::new(component))
        };
        ComponentRegistry::configure(&entries, &factory).unwrap()
    }

    #[test]
    fn time_step_is_the_largest_step() {
        let registry = registry(vec![
            TestComponent::new("fast", 1.0).with_time(0.0, 10.0, 1.0),
            TestComponent::new("slow", 1.0).with_time(5.0, 20.0, 5.0),
        ]);

        let clock = CompositeClock::from_registry(&registry, "slow", false).unwrap();
        assert_eq!(clock.time_step(), 5.0);
        assert_eq!(clock.start_time, 5.0);
        assert_eq!(clock.end_time, 20.0);
        assert_eq!(clock.current_time(), 5.0);

        let clock = CompositeClock::from_registry(&registry, "fast", false).unwrap();
        assert_eq!(clock.start_time, 0.0);
        assert_eq!(clock.time_step(), 5.0);
    }

    #[test]
    fn strict_time_base() {
        let registry = registry(vec![
            TestComponent::new("a", 1.0).with_time(0.0, 10.0, 1.0),
            TestComponent::new("b", 1.0).with_time(0.0, 12.0, 1.0),
        ]);
        let err = CompositeClock::from_registry(&registry, "a", true).unwrap_err();
        assert!(matches!(
            err,
            CouplerError::TimeBaseMismatch {
                quantity: "end time",
                ..
            }
        ));

        let registry = self::registry(vec![
            TestComponent::new("a", 1.0),
            TestComponent::new("b", 1.0).with_units("hours since 2000-01-01"),
        ]);
        let err = CompositeClock::from_registry(&registry, "a", true).unwrap_err();
        assert!(err.to_string().contains("time units"));
        assert!(CompositeClock::from_registry(&registry, "a", false).is_ok());
    }

    #[test]
    fn unknown_reference() {
        let registry = registry(vec![TestComponent::new("a", 1.0)]);
        assert!(matches!(
            CompositeClock::from_registry(&registry, "b", false),
            Err(CouplerError::UnknownComponent(_))
        ));
    }

    #[test]
    fn advance_rewind_and_resync() {
        let mut clock = CompositeClock::new(1.0, 10.0, "days", 0.5, 1.0).unwrap();
        assert!(matches!(clock.rewind(), Err(CouplerError::RewindUnavailable)));

        clock.advance();
        clock.advance();
        assert_eq!(clock.current_time(), 2.0);
        clock.rewind().unwrap();
        assert_eq!(clock.current_time(), 1.5);

        clock.resync(4.0);
        assert_eq!(clock.step_index(), 6);
        assert_eq!(clock.current_time(), 4.0);

        clock.resync(0.25);
        assert_eq!(clock.step_index(), 0);
        assert_eq!(clock.current_time(), 0.25);
    }

    #[test]
    fn rebase_keeps_the_step_count() {
        let mut clock = CompositeClock::new(0.0, 10.0, "days", 1.0, 0.0).unwrap();
        clock.advance();
        clock.advance();

        clock.rebase(7.0);
        assert_eq!(clock.step_index(), 2);
        assert_eq!(clock.current_time(), 7.0);

        clock.rewind().unwrap();
        assert_eq!(clock.current_time(), 6.0);
        clock.advance();
        clock.advance();
        assert_eq!(clock.current_time(), 8.0);
    }

    #[test]
    fn small_steps_do_not_accumulate_error() {
        let mut clock = CompositeClock::new(0.0, 10.0, "days", 0.1, 0.0).unwrap();
        for _ in 0..70 {
            clock.advance();
        }
        assert!(
            is_close!(clock.current_time(), 7.0),
            "Expected 7.0, got {}",
            clock.current_time()
        );

        clock.resync(clock.current_time());
        assert_eq!(clock.step_index(), 70);
    }
}
