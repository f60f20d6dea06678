//! Bucket land-surface water balance
//!
//! Each grid cell is a bucket which fills with precipitation, loses water to evaporation and
//! drains a fixed fraction of its storage. Water above the bucket's capacity leaves as runoff
//! straight away.

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

const VAR_PRECIPITATION: &str = "precipitation";
const VAR_RUNOFF: &str = "runoff";
const VAR_STORAGE: &str = "storage";

const ATTRIBUTES: [&str; 5] = [
    "parameters:capacity",
    "parameters:drainage",
    "parameters:evaporation",
    "parameters:initial_storage",
    "parameters:precipitation",
];

/// Parameters for the bucket model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketParameters {
    /// Maximum water a bucket can hold
    /// unit: mm
    pub capacity: f64,
    /// Fraction of the storage drained per unit time
    /// unit: 1 / day
    pub drainage: f64,
    /// Evaporation rate
    /// unit: mm / day
    #[serde(default)]
    pub evaporation: f64,
    /// unit: mm
    #[serde(default)]
    pub initial_storage: f64,
    /// Precipitation rate used until a value is set
    /// unit: mm / day
    #[serde(default)]
    pub precipitation: f64,
}

impl BucketParameters {
    fn get(&self, attribute: &str) -> Option<f64> {
        Some(match attribute {
            "parameters:capacity" => self.capacity,
            "parameters:drainage" => self.drainage,
            "parameters:evaporation" => self.evaporation,
            "parameters:initial_storage" => self.initial_storage,
            "parameters:precipitation" => self.precipitation,
            _ => return None,
        })
    }

    fn get_mut(&mut self, attribute: &str) -> Option<&mut f64> {
        Some(match attribute {
            "parameters:capacity" => &mut self.capacity,
            "parameters:drainage" => &mut self.drainage,
            "parameters:evaporation" => &mut self.evaporation,
            "parameters:initial_storage" => &mut self.initial_storage,
            "parameters:precipitation" => &mut self.precipitation,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct BucketState {
    precipitation: ArrayD<f64>,
    storage: ArrayD<f64>,
    runoff: ArrayD<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BucketSnapshot {
    time: ModelClock,
    state: BucketState,
}

/// A gridded bucket water balance
///
/// Input `precipitation`, outputs `runoff` and `storage`.
///
/// Configured from TOML:
///
/// ```toml
/// type = "BucketModel"
/// name = "land"
///
/// [time]
/// start_time = 1.0
/// end_time = 30.0
/// time_step = 1.0
///
/// [grid]
/// shape = [2, 2]
/// spacing = [1000.0, 1000.0]
/// origin = [0.0, 0.0]
///
/// [parameters]
/// capacity = 100.0
/// drainage = 0.1
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketModel {
    #[serde(default)]
    name: String,
    time: ModelClock,
    grid: UniformGrid,
    parameters: BucketParameters,
    #[serde(skip)]
    state: BucketState,
    #[serde(skip)]
    resume: ResumeBuffer<BucketSnapshot>,
}

impl BucketModel {
    pub fn new(
        name: &str,
        time: ModelClock,
        grid: UniformGrid,
        parameters: BucketParameters,
    ) -> Self {
        Self {
            name: name.to_string(),
            time,
            grid,
            parameters,
            state: BucketState::default(),
            resume: ResumeBuffer::new(),
        }
    }

    pub fn parameters(&self) -> &BucketParameters {
        &self.parameters
    }

    /// Advance a single bucket by `dt`
    ///
    /// Returns the new storage and the runoff rate over the step.
    pub fn step_bucket(&self, storage: f64, precipitation: f64, dt: f64) -> (f64, f64) {
        let p = &self.parameters;
        let filled = (storage + (precipitation - p.evaporation) * dt).max(0.0);
        let overflow = (filled - p.capacity).max(0.0);
        let retained = filled - overflow;
        let drained = retained * p.drainage * dt;
        (retained - drained, (overflow + drained) / dt)
    }

    fn validate(&self) -> CouplerResult<()> {
        self.time.validate()?;
        self.grid.validate()?;

        let p = &self.parameters;
        let invalid = |details: String| CouplerError::Error(format!("{}: {}", self.name, details));
        if p.capacity <= 0.0 {
            return Err(invalid(format!("capacity must be positive, got {}", p.capacity)));
        }
        if p.drainage < 0.0 || p.drainage * self.time.time_step > 1.0 {
            return Err(invalid(format!(
                "drainage {} must be non-negative and drain at most the full storage in a step of {}",
                p.drainage, self.time.time_step
            )));
        }
        if p.evaporation < 0.0 || p.initial_storage < 0.0 {
            return Err(invalid(
                "evaporation and initial storage must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    fn snapshot(&self) -> BucketSnapshot {
        BucketSnapshot {
            time: self.time.clone(),
            state: self.state.clone(),
        }
    }

    fn restore(&mut self, snapshot: BucketSnapshot) {
        self.time = snapshot.time;
        self.state = snapshot.state;
    }

    fn variable(&self, name: &str) -> CouplerResult<&ArrayD<f64>> {
        match name {
            VAR_PRECIPITATION => Ok(&self.state.precipitation),
            VAR_RUNOFF => Ok(&self.state.runoff),
            VAR_STORAGE => Ok(&self.state.storage),
            _ => Err(self.unknown_variable(name)),
        }
    }

    fn variable_mut(&mut self, name: &str) -> CouplerResult<&mut ArrayD<f64>> {
        match name {
            VAR_PRECIPITATION => Ok(&mut self.state.precipitation),
            VAR_RUNOFF => Ok(&mut self.state.runoff),
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

    fn unknown_attribute(&self, name: &str) -> CouplerError {
        CouplerError::UnknownAttribute {
            component: self.name.clone(),
            attribute: name.to_string(),
        }
    }
}

#[typetag::serde]
impl Component for BucketModel {
    fn configure(&mut self, config_path: &Path) -> CouplerResult<()> {
        if self.name.is_empty() {
            self.name = config_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "bucket".to_string());
        }
        self.validate()?;
        info!(component = %self.name, shape = ?self.grid.shape(), "Configured bucket model");
        Ok(())
    }

    fn initialize(&mut self) -> CouplerResult<()> {
        let shape = self.grid.shape().to_vec();
        let p = &self.parameters;
        self.state = BucketState {
            precipitation: ArrayD::from_elem(shape.clone(), p.precipitation),
            storage: ArrayD::from_elem(shape.clone(), p.initial_storage),
            runoff: ArrayD::from_elem(shape, p.initial_storage * p.drainage),
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
        let mut runoff = self.state.runoff.clone();
        ndarray::Zip::from(&mut storage)
            .and(&mut runoff)
            .and(&self.state.precipitation)
            .for_each(|s, r, &precipitation| {
                let (new_storage, new_runoff) = self.step_bucket(*s, precipitation, dt);
                *s = new_storage;
                *r = new_runoff;
            });
        self.state.storage = storage;
        self.state.runoff = runoff;
        self.time.advance();

        debug!(
            component = %self.name,
            time = self.time.current_time(),
            mean_runoff = self.state.runoff.mean().unwrap_or(0.0),
            "Bucket model stepped"
        );
        Ok(())
    }

    fn resume_state(&mut self) -> CouplerResult<()> {
        let snapshot = self.resume.take()?;
        self.restore(snapshot);
        Ok(())
    }

    fn save_state(&self, directory: &Path) -> CouplerResult<()> {
        write_state(&state_file(directory, &self.name), &self.snapshot())
    }

    fn load_state(&mut self, directory: &Path) -> CouplerResult<()> {
        let snapshot: BucketSnapshot = read_state(&state_file(directory, &self.name))?;
        if snapshot.state.storage.shape() != self.grid.shape() {
            return Err(CouplerError::ShapeMismatch {
                expected: self.grid.shape().to_vec(),
                found: snapshot.state.storage.shape().to_vec(),
            });
        }
        self.restore(snapshot);
        self.resume.clear();
        Ok(())
    }

    fn finalize(&mut self) -> CouplerResult<()> {
        info!(component = %self.name, time = self.time.current_time(), "Finalized bucket model");
        Ok(())
    }

    fn component_name(&self) -> &str {
        &self.name
    }

    fn input_var_names(&self) -> Vec<String> {
        vec![VAR_PRECIPITATION.to_string()]
    }

    fn output_var_names(&self) -> Vec<String> {
        vec![VAR_RUNOFF.to_string(), VAR_STORAGE.to_string()]
    }

    fn attribute_names(&self) -> Vec<String> {
        ATTRIBUTES.iter().map(|a| a.to_string()).collect()
    }

    fn get_attribute_value(&self, name: &str) -> CouplerResult<String> {
        self.parameters
            .get(name)
            .map(|value| value.to_string())
            .ok_or_else(|| self.unknown_attribute(name))
    }

    fn set_attribute_value(&mut self, name: &str, value: &str) -> CouplerResult<()> {
        let parsed: f64 = parse_attribute(name, value)?;
        let previous = self.parameters.clone();
        match self.parameters.get_mut(name) {
            Some(slot) => *slot = parsed,
            None => return Err(self.unknown_attribute(name)),
        }
        if let Err(e) = self.validate() {
            self.parameters = previous;
            return Err(CouplerError::InvalidAttributeValue {
                attribute: name.to_string(),
                value: value.to_string(),
                details: e.to_string(),
            });
        }
        Ok(())
    }

    fn get_value(&self, name: &str) -> CouplerResult<Value> {
        Ok(Value::Float64(self.variable(name)?.clone()))
    }

    fn set_value(&mut self, name: &str, value: &Value) -> CouplerResult<()> {
        value.copy_into(self.variable_mut(name)?)
    }

    fn var_units(&self, name: &str) -> CouplerResult<String> {
        match name {
            VAR_PRECIPITATION | VAR_RUNOFF => Ok("mm day-1".to_string()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rcouple_core::grid::GridType;
    use tempfile::tempdir;

    fn parameters() -> BucketParameters {
        BucketParameters {
            capacity: 10.0,
            drainage: 0.1,
            evaporation: 1.0,
            initial_storage: 5.0,
            precipitation: 3.0,
        }
    }

    fn bucket() -> BucketModel {
        let mut bucket = BucketModel::new(
            "land",
            ModelClock::new(1.0, 10.0, 1.0),
            UniformGrid::new(vec![2, 3], vec![100.0, 100.0], vec![0.0, 0.0]).unwrap(),
            parameters(),
        );
        bucket.configure(Path::new("land.toml")).unwrap();
        bucket.initialize().unwrap();
        bucket
    }

    fn first(bucket: &BucketModel, name: &str) -> f64 {
        bucket.get_value(name).unwrap().as_f64().unwrap()[[0, 0]]
    }

    #[test]
    fn step_bucket_balances_water() {
        let bucket = bucket();

        // 5 + (3 - 1) = 7, no overflow, drains 0.7
        let (storage, runoff) = bucket.step_bucket(5.0, 3.0, 1.0);
        assert_relative_eq!(storage, 6.3, epsilon = 1e-12);
        assert_relative_eq!(runoff, 0.7, epsilon = 1e-12);

        // 9 + 5 = 14, overflow 4, drains 1.0
        let (storage, runoff) = bucket.step_bucket(9.0, 6.0, 1.0);
        assert_relative_eq!(storage, 9.0, epsilon = 1e-12);
        assert_relative_eq!(runoff, 5.0, epsilon = 1e-12);

        // Evaporation cannot take the storage below zero
        let (storage, runoff) = bucket.step_bucket(0.5, 0.0, 1.0);
        assert_relative_eq!(storage, 0.0, epsilon = 1e-12);
        assert_relative_eq!(runoff, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn initial_outputs() {
        let bucket = bucket();
        assert_relative_eq!(first(&bucket, VAR_RUNOFF), 0.5, epsilon = 1e-12);
        assert_relative_eq!(first(&bucket, VAR_STORAGE), 5.0, epsilon = 1e-12);
        assert_eq!(bucket.var_size(VAR_RUNOFF).unwrap(), 6);
        assert_eq!(bucket.var_nbytes(VAR_RUNOFF).unwrap(), 48);
        assert_eq!(bucket.current_time(), 1.0);
    }

    #[test]
    fn update_and_resume() {
        let mut bucket = bucket();
        bucket.update().unwrap();
        assert_eq!(bucket.current_time(), 2.0);
        assert_relative_eq!(first(&bucket, VAR_STORAGE), 6.3, epsilon = 1e-12);
        assert_relative_eq!(first(&bucket, VAR_RUNOFF), 0.7, epsilon = 1e-12);

        bucket.resume_state().unwrap();
        assert_eq!(bucket.current_time(), 1.0);
        assert_relative_eq!(first(&bucket, VAR_STORAGE), 5.0, epsilon = 1e-12);
        assert!(matches!(
            bucket.resume_state(),
            Err(CouplerError::RewindUnavailable)
        ));
    }

    #[test]
    fn update_until() {
        let mut bucket = bucket();
        bucket.update_until(4.0).unwrap();
        assert_eq!(bucket.current_time(), 4.0);
        bucket.update_until(3.0).unwrap();
        assert_eq!(bucket.current_time(), 3.0);
        assert!(matches!(
            bucket.update_until(1.0),
            Err(CouplerError::RewindTooFar { .. })
        ));
        assert!(bucket.update_until(3.5).is_err());
    }

    #[test]
    fn values_and_indices() {
        let mut bucket = bucket();
        bucket
            .set_value(VAR_PRECIPITATION, &Value::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
            .unwrap();
        let selected = bucket
            .get_value_at_indices(VAR_PRECIPITATION, &[vec![0, 2], vec![1, 0]])
            .unwrap();
        assert_eq!(selected, Value::from_vec(vec![3.0, 4.0]));

        bucket
            .set_value_at_indices(VAR_PRECIPITATION, &[vec![1, 2]], &Value::scalar(0.0))
            .unwrap();
        let precipitation = bucket.get_value(VAR_PRECIPITATION).unwrap();
        assert_eq!(precipitation.as_f64().unwrap()[[1, 2]], 0.0);

        assert!(matches!(
            bucket.get_value("rainfall"),
            Err(CouplerError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn grid_metadata() {
        let bucket = bucket();
        assert_eq!(bucket.grid_type(VAR_STORAGE).unwrap(), GridType::UniformRectilinear);
        assert_eq!(bucket.grid_shape(VAR_STORAGE).unwrap(), vec![2, 3]);
        assert_eq!(bucket.grid_x(VAR_STORAGE).unwrap(), vec![50.0, 150.0, 250.0]);
        assert_eq!(bucket.grid_y(VAR_STORAGE).unwrap(), vec![50.0, 150.0]);
        assert!(bucket.grid_connectivity(VAR_STORAGE).is_err());
        assert_eq!(bucket.var_units(VAR_STORAGE).unwrap(), "mm");
    }

    #[test]
    fn attributes() {
        let mut bucket = bucket();
        assert_eq!(bucket.attribute_names().len(), 5);
        assert_eq!(
            bucket.get_attribute_value("parameters:capacity").unwrap(),
            "10"
        );

        bucket
            .set_attribute_value("parameters:capacity", "20")
            .unwrap();
        assert_eq!(bucket.parameters().capacity, 20.0);

        assert!(matches!(
            bucket.set_attribute_value("parameters:drainage", "1.5"),
            Err(CouplerError::InvalidAttributeValue { .. })
        ));
        assert_eq!(bucket.parameters().drainage, 0.1);
        assert!(matches!(
            bucket.set_attribute_value("parameters:colour", "1"),
            Err(CouplerError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let mut bucket = bucket();
        bucket.update().unwrap();
        bucket.save_state(dir.path()).unwrap();

        bucket.update().unwrap();
        bucket.update().unwrap();
        bucket.load_state(dir.path()).unwrap();
        assert_eq!(bucket.current_time(), 2.0);
        assert_relative_eq!(first(&bucket, VAR_STORAGE), 6.3, epsilon = 1e-12);
        assert!(bucket.resume_state().is_err());
    }

    #[test]
    fn from_toml() {
        let config = r#"
type = "BucketModel"

[time]
start_time = 0.0
end_time = 5.0
time_step = 0.5

[grid]
shape = [3]
spacing = [1.0]
origin = [0.0]

[parameters]
capacity = 50.0
drainage = 0.2
"#;
        let mut component: Box<dyn Component> = toml::from_str(config).unwrap();
        component.configure(Path::new("/runs/hillslope.toml")).unwrap();
        component.initialize().unwrap();
        assert_eq!(component.component_name(), "hillslope");
        assert_eq!(component.time_step(), 0.5);
        assert_eq!(component.var_size(VAR_STORAGE).unwrap(), 3);

        let invalid = config.replace("drainage = 0.2", "drainage = 3.0");
        let mut component: Box<dyn Component> = toml::from_str(&invalid).unwrap();
        assert!(component.configure(Path::new("hillslope.toml")).is_err());
    }
}
