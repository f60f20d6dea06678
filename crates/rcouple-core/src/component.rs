//! The model-interface contract implemented by every pluggable component.
//!
//! A component is an independently steppable simulation with its own clock and a set of
//! named variables. The coupling engine only ever talks to components through
//! [`Component`]; concrete engines are selected at configuration time through the `type`
//! tag of their configuration file.

use crate::errors::{CouplerError, CouplerResult};
use crate::grid::{Axis, GridType, UniformGrid};
use crate::time::{ensure_not_past_end, plan_steps, StepPlan, Time};
use crate::value::{Value, VarType};
use std::fmt::{Debug, Display};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// A simulation component
///
/// Lifecycle: [`configure`](Component::configure) once with the path to the component's own
/// configuration, [`initialize`](Component::initialize) once, then any number of
/// [`update`](Component::update) calls and finally [`finalize`](Component::finalize).
///
/// Variables are addressed by their local (unqualified) name.
/// Metadata about a variable's element type and size is derived from its current value
/// unless a component overrides the accessors.
#[typetag::serde(tag = "type")]
pub trait Component: Debug + Send + Sync {
    /// Apply the configuration stored at `config_path`
    fn configure(&mut self, config_path: &Path) -> CouplerResult<()>;

    /// Prepare the initial state so that outputs hold their step-0 values
    fn initialize(&mut self) -> CouplerResult<()>;

    /// Advance the component by a single time step
    fn update(&mut self) -> CouplerResult<()>;

    /// Advance (or rewind a single step) to `time`
    ///
    /// The target must be a whole number of steps away from the current time and must not
    /// lie past the end time.
    fn update_until(&mut self, time: Time) -> CouplerResult<()> {
        let current = self.current_time();
        let time_step = self.time_step();
        ensure_not_past_end(time, self.end_time(), time_step)?;
        match plan_steps(current, time, time_step)? {
            StepPlan::Stay => Ok(()),
            StepPlan::Forward(steps) => {
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

    /// Advance by a fraction of a time step
    fn update_frac(&mut self, _fraction: f64) -> CouplerResult<()> {
        Err(CouplerError::Unsupported("update_frac"))
    }

    /// Restore the in-memory checkpoint taken before the most recent update
    fn resume_state(&mut self) -> CouplerResult<()>;

    /// Write the complete internal state to files in `directory`
    fn save_state(&self, directory: &Path) -> CouplerResult<()>;

    /// Read the internal state from the files written by [`Component::save_state`]
    fn load_state(&mut self, directory: &Path) -> CouplerResult<()>;

    fn finalize(&mut self) -> CouplerResult<()>;

    /// Name the component reports for itself
    fn component_name(&self) -> &str;

    fn input_var_names(&self) -> Vec<String>;

    fn output_var_names(&self) -> Vec<String>;

    /// Names of the string valued configuration attributes, as `section:option`
    fn attribute_names(&self) -> Vec<String> {
        vec![]
    }

    fn get_attribute_value(&self, name: &str) -> CouplerResult<String> {
        Err(CouplerError::UnknownAttribute {
            component: self.component_name().to_string(),
            attribute: name.to_string(),
        })
    }

    fn set_attribute_value(&mut self, name: &str, _value: &str) -> CouplerResult<()> {
        Err(CouplerError::UnknownAttribute {
            component: self.component_name().to_string(),
            attribute: name.to_string(),
        })
    }

    fn get_value(&self, name: &str) -> CouplerResult<Value>;

    fn set_value(&mut self, name: &str, value: &Value) -> CouplerResult<()>;

    fn get_value_at_indices(&self, name: &str, indices: &[Vec<usize>]) -> CouplerResult<Value> {
        self.get_value(name)?.at_indices(indices)
    }

    fn set_value_at_indices(
        &mut self,
        name: &str,
        indices: &[Vec<usize>],
        source: &Value,
    ) -> CouplerResult<()> {
        let mut value = self.get_value(name)?;
        value.set_at_indices(indices, source)?;
        self.set_value(name, &value)
    }

    fn var_type(&self, name: &str) -> CouplerResult<VarType> {
        Ok(self.get_value(name)?.var_type())
    }

    fn var_rank(&self, name: &str) -> CouplerResult<usize> {
        Ok(self.get_value(name)?.rank())
    }

    fn var_size(&self, name: &str) -> CouplerResult<usize> {
        Ok(self.get_value(name)?.size())
    }

    fn var_nbytes(&self, name: &str) -> CouplerResult<usize> {
        Ok(self.get_value(name)?.nbytes())
    }

    fn var_units(&self, name: &str) -> CouplerResult<String>;

    /// The uniform grid a variable is defined on
    fn grid(&self, _name: &str) -> CouplerResult<&UniformGrid> {
        Err(CouplerError::Unsupported("grid"))
    }

    fn grid_type(&self, name: &str) -> CouplerResult<GridType> {
        Ok(self.grid(name)?.grid_type())
    }

    fn grid_shape(&self, name: &str) -> CouplerResult<Vec<usize>> {
        Ok(self.grid(name)?.shape().to_vec())
    }

    fn grid_spacing(&self, name: &str) -> CouplerResult<Vec<f64>> {
        Ok(self.grid(name)?.spacing().to_vec())
    }

    fn grid_origin(&self, name: &str) -> CouplerResult<Vec<f64>> {
        Ok(self.grid(name)?.origin().to_vec())
    }

    fn grid_x(&self, name: &str) -> CouplerResult<Vec<f64>> {
        self.grid(name)?.coordinates(Axis::X)
    }

    fn grid_y(&self, name: &str) -> CouplerResult<Vec<f64>> {
        self.grid(name)?.coordinates(Axis::Y)
    }

    fn grid_z(&self, name: &str) -> CouplerResult<Vec<f64>> {
        self.grid(name)?.coordinates(Axis::Z)
    }

    fn grid_connectivity(&self, _name: &str) -> CouplerResult<Vec<usize>> {
        Err(CouplerError::Unsupported("grid_connectivity"))
    }

    fn grid_offset(&self, _name: &str) -> CouplerResult<Vec<usize>> {
        Err(CouplerError::Unsupported("grid_offset"))
    }

    fn start_time(&self) -> Time;

    fn end_time(&self) -> Time;

    fn current_time(&self) -> Time;

    fn time_step(&self) -> Time;

    fn time_units(&self) -> String;

    fn set_start_time(&mut self, _time: Time) -> CouplerResult<()> {
        Err(CouplerError::Unsupported("set_start_time"))
    }

    fn set_end_time(&mut self, _time: Time) -> CouplerResult<()> {
        Err(CouplerError::Unsupported("set_end_time"))
    }
}

/// Parse the string form of a numeric attribute
pub fn parse_attribute<T>(attribute: &str, value: &str) -> CouplerResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| CouplerError::InvalidAttributeValue {
            attribute: attribute.to_string(),
            value: value.to_string(),
            details: e.to_string(),
        })
}

/// Creates component instances for the ids found in a composite configuration
///
/// Any `Fn(&str, &Path) -> CouplerResult<Box<dyn Component>>` closure is a factory.
pub trait ComponentFactory {
    fn create(&self, id: &str, config_path: &Path) -> CouplerResult<Box<dyn Component>>;
}

impl<F> ComponentFactory for F
where
    F: Fn(&str, &Path) -> CouplerResult<Box<dyn Component>>,
{
    fn create(&self, id: &str, config_path: &Path) -> CouplerResult<Box<dyn Component>> {
        self(id, config_path)
    }
}

/// Builds components from their TOML configuration files
///
/// The `type` key selects the implementation, the remaining keys are its settings:
///
/// ```toml
/// type = "BucketModel"
/// name = "land"
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlComponentFactory;

impl ComponentFactory for TomlComponentFactory {
    fn create(&self, _id: &str, config_path: &Path) -> CouplerResult<Box<dyn Component>> {
        load_component(config_path)
    }
}

/// Deserialize a component from a TOML configuration file
pub fn load_component(config_path: &Path) -> CouplerResult<Box<dyn Component>> {
    let contents = fs::read_to_string(config_path).map_err(|source| CouplerError::Io {
        path: config_path.to_path_buf(),
        source,
    })?;
    toml::from_str::<Box<dyn Component>>(&contents).map_err(|e| CouplerError::Config {
        path: config_path.to_path_buf(),
        details: e.to_string(),
    })
}
