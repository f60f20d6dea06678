//! Linear reservoir routing
//!
//! Each grid cell is a reservoir whose outflow is proportional to its storage.

use ndarray::ArrayD;
use rcouple_core::component::{parse_attribute, Component};
use rcouple_core::errors::{CouplerError, CouplerResult};
use rcouple_core::grid::UniformGrid;
use rcouple_core::persistence::{read_state, state_file, write_state};
use rcouple_core::resume::ResumeBuffer;
use rcouple_core::time::{ModelClock, Time};
use rcouple_core::value::Value;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

const VAR_INFLOW: &str = "inflow";
const VAR_DISCHARGE: &str = "discharge";
const VAR_STORAGE: &str = "storage";

/// Parameters for the linear reservoir
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearReservoirParameters {
    /// Fraction of the storage released per unit time
    /// unit: 1 / day
    pub recession: f64,
    /// unit: mm
    #[serde(default)]
    pub initial_storage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ReservoirState {
    inflow: ArrayD<f64>,
    storage: ArrayD<f64>,
    discharge: ArrayD<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ReservoirSnapshot {
    time: ModelClock,
    state: ReservoirState,
}

/// Linear reservoir routing
///
/// Input `inflow`, outputs `discharge` and `storage`.
/// Over a step of length $dt$ the inflow is added to the storage and then a fraction
/// $k \cdot dt$ of the storage is released:
///
/// $$ S' = S + I \cdot dt, \quad Q = k S', \quad S_{next} = S' - Q \cdot dt $$
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearReservoir {
    #[serde(default)]
    name: String,
    time: ModelClock,
    grid: UniformGrid,
    parameters: LinearReservoirParameters,
    #[serde(skip)]
    state: ReservoirState,
    #[serde(skip)]
    resume: ResumeBuffer<ReservoirSnapshot>,
}

impl LinearReservoir {
    pub fn new(
        name: &str,
        time: ModelClock,
        grid: UniformGrid,
        parameters: LinearReservoirParameters,
    ) -> Self {
        Self {
            name: name.to_string(),
            time,
            grid,
            parameters,
            state: ReservoirState::default(),
            resume: ResumeBuffer::new(),
        }
    }

    /// Route `inflow` through a reservoir holding `storage` for `dt`
    ///
    /// Returns the new storage and the discharge rate.
    pub fn route(&self, storage: f64, inflow: f64, dt: f64) -> (f64, f64) {
        let filled = storage + inflow * dt;
        let discharge = self.parameters.recession * filled;
        (filled - discharge * dt, discharge)
    }

    fn validate(&self) -> CouplerResult<()> {
        self.time.validate()?;
        self.grid.validate()?;

        let k = self.parameters.recession;
        if !(0.0..=1.0).contains(&(k * self.time.time_step)) {
            return Err(CouplerError::Error(format!(
                "{}: recession {} must release between none and all of the storage in a step of {}",
                self.name, k, self.time.time_step
            )));
        }
        if self.parameters.initial_storage < 0.0 {
            return Err(CouplerError::Error(format!(
                "{}: initial storage must be non-negative",
                self.name
            )));
        }
        Ok(())
    }

    fn snapshot(&self) -> ReservoirSnapshot {
        ReservoirSnapshot {
            time: self.time.clone(),
            state: self.state.clone(),
        }
    }

    fn variable(&self, name: &str) -> CouplerResult<&ArrayD<f64>> {
        match name {
            VAR_INFLOW => Ok(&self.state.inflow),
            VAR_DISCHARGE => Ok(&self.state.discharge),
            VAR_STORAGE => Ok(&self.state.storage),
            _ => Err(self.unknown_variable(name)),
        }
    }

    fn variable_mut(&mut self, name: &str) -> CouplerResult<&mut ArrayD<f64>> {
        match name {
            VAR_INFLOW => Ok(&mut self.state.inflow),
            VAR_DISCHARGE => Ok(&mut self.state.discharge),
            VAR_STORAGE => Ok(&mut self.state.storage),
            _ => Err(self.unknown_variable(name)),
        }
    }

    fn unknown_variable(&self, name: &str) -> CouplerError {
        CouplerError::UnknownVariable {
            component: self.name.clone(),
            variable: name.to_string(),
        }
    }
}

#[typetag::serde]
impl Component for LinearReservoir {
    fn configure(&mut self, config_path: &Path) -> CouplerResult<()> {
        if self.name.is_empty() {
            self.name = config_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "reservoir".to_string());
        }
        self.validate()?;
        info!(component = %self.name, shape = ?self.grid.shape(), "Configured linear reservoir");
        Ok(())
    }

    fn initialize(&mut self) -> CouplerResult<()> {
        let shape = self.grid.shape().to_vec();
        let p = &self.parameters;
        self.state = ReservoirState {
            inflow: ArrayD::zeros(shape.clone()),
            storage: ArrayD::from_elem(shape.clone(), p.initial_storage),
            discharge: ArrayD::from_elem(shape, p.recession * p.initial_storage),
        };
        self.time.reset();
        self.resume.clear();
        Ok(())
    }

    fn update(&mut self) -> CouplerResult<()> {
        let snapshot = self.snapshot();
        self.resume.checkpoint(&snapshot);

        let dt = self.time.time_step;
        let mut storage = self.state.storage.clone();
        let mut discharge = self.state.discharge.clone();
        ndarray::Zip::from(&mut storage)
            .and(&mut discharge)
            .and(&self.state.inflow)
            .for_each(|s, q, &inflow| {
                let (new_storage, new_discharge) = self.route(*s, inflow, dt);
                *s = new_storage;
                *q = new_discharge;
            });
        self.state.storage = storage;
        self.state.discharge = discharge;
        self.time.advance();

        debug!(
            component = %self.name,
            time = self.time.current_time(),
            total_discharge = self.state.discharge.sum(),
            "Linear reservoir stepped"
        );
        Ok(())
    }

    fn resume_state(&mut self) -> CouplerResult<()> {
        let snapshot = self.resume.take()?;
        self.time = snapshot.time;
        self.state = snapshot.state;
        Ok(())
    }

    fn save_state(&self, directory: &Path) -> CouplerResult<()> {
        write_state(&state_file(directory, &self.name), &self.snapshot())
    }

    fn load_state(&mut self, directory: &Path) -> CouplerResult<()> {
        let snapshot: ReservoirSnapshot = read_state(&state_file(directory, &self.name))?;
        if snapshot.state.storage.shape() != self.grid.shape() {
            return Err(CouplerError::ShapeMismatch {
                expected: self.grid.shape().to_vec(),
                found: snapshot.state.storage.shape().to_vec(),
            });
        }
        self.time = snapshot.time;
        self.state = snapshot.state;
        self.resume.clear();
        Ok(())
    }

    fn finalize(&mut self) -> CouplerResult<()> {
        info!(component = %self.name, "Finalized linear reservoir");
        Ok(())
    }

    fn component_name(&self) -> &str {
        &self.name
    }

    fn input_var_names(&self) -> Vec<String> {
        vec![VAR_INFLOW.to_string()]
    }

    fn output_var_names(&self) -> Vec<String> {
        vec![VAR_DISCHARGE.to_string(), VAR_STORAGE.to_string()]
    }

    fn attribute_names(&self) -> Vec<String> {
        vec![
            "parameters:recession".to_string(),
            "parameters:initial_storage".to_string(),
        ]
    }

    fn get_attribute_value(&self, name: &str) -> CouplerResult<String> {
        match name {
            "parameters:recession" => Ok(self.parameters.recession.to_string()),
            "parameters:initial_storage" => Ok(self.parameters.initial_storage.to_string()),
            _ => Err(CouplerError::UnknownAttribute {
                component: self.name.clone(),
                attribute: name.to_string(),
            }),
        }
    }

    fn set_attribute_value(&mut self, name: &str, value: &str) -> CouplerResult<()> {
        let parsed: f64 = parse_attribute(name, value)?;
        let previous = self.parameters.clone();
        match name {
            "parameters:recession" => self.parameters.recession = parsed,
            "parameters:initial_storage" => self.parameters.initial_storage = parsed,
            _ => {
                return Err(CouplerError::UnknownAttribute {
                    component: self.name.clone(),
                    attribute: name.to_string(),
                })
            }
        }
        self.validate().map_err(|e| {
            self.parameters = previous;
            CouplerError::InvalidAttributeValue {
                attribute: name.to_string(),
                value: value.to_string(),
                details: e.to_string(),
            }
        })
    }

    fn get_value(&self, name: &str) -> CouplerResult<Value> {
        Ok(Value::Float64(self.variable(name)?.clone()))
    }

    fn set_value(&mut self, name: &str, value: &Value) -> CouplerResult<()> {
        value.copy_into(self.variable_mut(name)?)
    }

    fn var_units(&self, name: &str) -> CouplerResult<String> {
        match name {
            VAR_INFLOW | VAR_DISCHARGE => Ok("mm day-1".to_string()),
            VAR_STORAGE => Ok("mm".to_string()),
            _ => Err(self.unknown_variable(name)),
        }
    }

    fn grid(&self, name: &str) -> CouplerResult<&UniformGrid> {
        self.variable(name)?;
        Ok(&self.grid)
    }

    fn start_time(&self) -> Time {
        self.time.start_time
    }

    fn end_time(&self) -> Time {
        self.time.end_time
    }

    fn current_time(&self) -> Time {
        self.time.current_time()
    }

    fn time_step(&self) -> Time {
        self.time.time_step
    }

    fn time_units(&self) -> String {
        self.time.time_units.clone()
    }

    fn set_start_time(&mut self, time: Time) -> CouplerResult<()> {
        self.time.start_time = time;
        Ok(())
    }

    fn set_end_time(&mut self, time: Time) -> CouplerResult<()> {
        self.time.end_time = time;
        Ok(())
    }
}
