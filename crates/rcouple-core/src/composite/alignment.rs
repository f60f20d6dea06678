//! Moving a composite to a requested time.

use crate::errors::{CouplerError, CouplerResult};
use crate::time::{ensure_not_past_end, plan_steps, StepPlan, Time};
use tracing::{debug, info};

use super::runtime::Composite;

impl Composite {
    /// Advance (or rewind a single step) to `time`
    ///
    /// `time` must be a whole number of composite steps away from the current time and must
    /// not lie past the composite end time. Moving forward repeats [`Composite::update`].
    /// Moving back one step resumes every component from the checkpoint taken before its last
    /// update, which is only possible if an update has happened since the last rewind.
    /// Nothing changes if the target cannot be reached.
    pub fn update_until(&mut self, time: Time) -> CouplerResult<()> {
        self.require_running("update until")?;
        let clock = self.clock()?;
        let (current, time_step) = (clock.current_time(), clock.time_step());
        ensure_not_past_end(time, clock.end_time, time_step)?;

        match plan_steps(current, time, time_step)? {
            StepPlan::Stay => Ok(()),
            StepPlan::Forward(steps) => {
                debug!(current_time = current, target = time, steps, "Stepping forward");
                for _ in 0..steps {
                    self.update()?;
                }
                Ok(())
            }
            StepPlan::Rewind(1) => self.resume_state(),
            StepPlan::Rewind(_) => Err(CouplerError::RewindTooFar {
                current,
                target: time,
                time_step,
            }),
        }
    }

    /// Undo the most recent update
    ///
    /// Every component resumes from the checkpoint taken before its last update and the
    /// composite clock moves back one step.
    pub fn resume_state(&mut self) -> CouplerResult<()> {
        self.require_running("resume state")?;
        if !self.rewind_available {
            return Err(CouplerError::RewindUnavailable);
        }

        let result = self
            .registry
            .iter_mut()
            .try_for_each(|registered| registered.component_mut().resume_state());
        self.record_failure(&result);
        result?;

        let clock = self.clock_mut()?;
        clock.rewind()?;
        let current_time = clock.current_time();
        self.rewind_available = false;
        info!(current_time, "Rewound composite by one step");
        Ok(())
    }

    /// Fractional steps are not supported by a composite
    pub fn update_frac(&mut self, _fraction: f64) -> CouplerResult<()> {
        Err(CouplerError::Unsupported("update_frac"))
    }
}
