//! Time handling shared by components and the composite.
//!
//! Times are plain floating point values in the units reported by `time_units`.
//! Both a single component and the composite move between times in whole steps,
//! which is what [`plan_steps`] checks.

use crate::errors::{CouplerError, CouplerResult};
use serde::{Deserialize, Serialize};

pub type Time = f64;

/// Fraction of a step that two times may differ by and still be considered aligned.
const ALIGNMENT_TOLERANCE: f64 = 1e-9;

/// How to move from the current time to a target time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPlan {
    /// Already at the target
    Stay,
    /// Take this many steps forward
    Forward(usize),
    /// Go back this many steps
    Rewind(usize),
}

/// Determine how many whole steps separate `current` from `target`.
///
/// Returns an error if the step is not positive or if the target cannot be reached
/// using whole steps.
pub fn plan_steps(current: Time, target: Time, time_step: Time) -> CouplerResult<StepPlan> {
    if !(time_step.is_finite() && time_step > 0.0) {
        return Err(CouplerError::InvalidTimeStep(time_step));
    }

    let ratio = (target - current) / time_step;
    let steps = ratio.round();
    if !ratio.is_finite()
        || steps.abs() >= usize::MAX as f64
        || (ratio - steps).abs() > ALIGNMENT_TOLERANCE
    {
        return Err(CouplerError::TimeAlignment {
            current,
            target,
            time_step,
        });
    }

    Ok(match steps {
        s if s > 0.0 => StepPlan::Forward(s as usize),
        s if s < 0.0 => StepPlan::Rewind((-s) as usize),
        _ => StepPlan::Stay,
    })
}

/// Check that `target` does not lie past `end_time`
///
/// Rounding within [`ALIGNMENT_TOLERANCE`] of a step is accepted.
pub fn ensure_not_past_end(target: Time, end_time: Time, time_step: Time) -> CouplerResult<()> {
    if target.is_nan() || target - end_time > ALIGNMENT_TOLERANCE * time_step.abs() {
        return Err(CouplerError::BeyondEndTime { target, end_time });
    }
    Ok(())
}

fn default_time_units() -> String {
    "days since 1970-01-01 00:00:00".to_string()
}

/// The internal clock of a single component.
///
/// Deserialized directly from the `[time]` table of a component configuration.
/// The current time is derived from the number of steps taken so that repeated
/// stepping does not accumulate rounding error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelClock {
    pub start_time: Time,
    pub end_time: Time,
    pub time_step: Time,
    #[serde(default = "default_time_units")]
    pub time_units: String,
    #[serde(default)]
    step_index: u64,
}

impl ModelClock {
    pub fn new(start_time: Time, end_time: Time, time_step: Time) -> Self {
        Self {
            start_time,
            end_time,
            time_step,
            time_units: default_time_units(),
            step_index: 0,
        }
    }

    pub fn with_units(mut self, time_units: impl Into<String>) -> Self {
        self.time_units = time_units.into();
        self
    }

    /// Check that the clock can be stepped
    pub fn validate(&self) -> CouplerResult<()> {
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(CouplerError::InvalidTimeStep(self.time_step));
        }
        if self.end_time < self.start_time {
            return Err(CouplerError::Error(format!(
                "End time {} is before start time {}",
                self.end_time, self.start_time
            )));
        }
        Ok(())
    }

    pub fn current_time(&self) -> Time {
        self.start_time + self.step_index as f64 * self.time_step
    }

    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    pub fn advance(&mut self) {
        self.step_index += 1;
    }

    /// Restart the clock at its start time
    pub fn reset(&mut self) {
        self.step_index = 0;
    }
}
