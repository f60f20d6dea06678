use crate::component::{parse_attribute, Component};
use crate::errors::{CouplerError, CouplerResult};
use crate::grid::UniformGrid;
use crate::persistence::{read_state, state_file, write_state};
use crate::resume::ResumeBuffer;
use crate::time::{ModelClock, Time};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared record of the calls made to test components, as `"<name>:<operation>"`
#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn record(&self, name: &str, operation: &str) {
        self.0.lock().unwrap().push(format!("{name}:{operation}"));
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Calls of a single operation, in order
    pub fn calls_of(&self, operation: &str) -> Vec<String> {
        let suffix = format!(":{operation}");
        self.calls()
            .into_iter()
            .filter(|call| call.ends_with(&suffix))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct TestState {
    forcing: f64,
    level: f64,
    counter: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TestSnapshot {
    time: ModelClock,
    state: TestState,
}

/// A scalar component for exercising the coupling engine
///
/// Input `forcing`, outputs `level` and `counter`.
/// `level` starts at `initial_level` and every update adds `increment + forcing` to it.
/// `counter` counts the updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TestComponent {
    #[serde(default)]
    pub name: String,
    pub time: ModelClock,
    pub increment: f64,
    #[serde(default)]
    pub initial_level: f64,
    #[serde(skip)]
    state: TestState,
    #[serde(skip)]
    resume: ResumeBuffer<TestSnapshot>,
    #[serde(skip, default = "UniformGrid::scalar")]
    grid: UniformGrid,
    #[serde(skip)]
    log: CallLog,
    /// Operation that fails when called
    #[serde(skip)]
    fail_on: Option<String>,
}

impl TestComponent {
    pub fn new(name: &str, increment: f64) -> Self {
        Self {
            name: name.to_string(),
            time: ModelClock::new(0.0, 10.0, 1.0),
            increment,
            initial_level: 0.0,
            state: TestState::default(),
            resume: ResumeBuffer::new(),
            grid: UniformGrid::scalar(),
            log: CallLog::default(),
            fail_on: None,
        }
    }

    pub fn with_time(mut self, start_time: Time, end_time: Time, time_step: Time) -> Self {
        self.time = ModelClock::new(start_time, end_time, time_step);
        self
    }

    pub fn with_initial_level(mut self, level: f64) -> Self {
        self.initial_level = level;
        self
    }

    pub fn with_units(mut self, time_units: &str) -> Self {
        self.time = self.time.with_units(time_units);
        self
    }

    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn failing_on(mut self, operation: &str) -> Self {
        self.fail_on = Some(operation.to_string());
        self
    }

    fn call(&self, operation: &str) -> CouplerResult<()> {
        self.log.record(&self.name, operation);
        match &self.fail_on {
            Some(failing) if failing == operation => Err(CouplerError::Error(format!(
                "{} failed to {}",
                self.name, operation
            ))),
            _ => Ok(()),
        }
    }

    fn snapshot(&self) -> TestSnapshot {
        TestSnapshot {
            time: self.time.clone(),
            state: self.state.clone(),
        }
    }

    fn restore(&mut self, snapshot: TestSnapshot) {
        self.time = snapshot.time;
        self.state = snapshot.state;
    }

    fn unknown_variable(&self, name: &str) -> CouplerError {
        CouplerError::UnknownVariable {
            component: self.name.clone(),
            variable: name.to_string(),
        }
    }
}

#[typetag::serde]
impl Component for TestComponent {
    fn configure(&mut self, _config_path: &Path) -> CouplerResult<()> {
        self.call("configure")?;
        self.time.validate()
    }

    fn initialize(&mut self) -> CouplerResult<()> {
        self.call("initialize")?;
        self.time.reset();
        self.state = TestState {
            level: self.initial_level,
            ..TestState::default()
        };
        self.resume.clear();
        Ok(())
    }

    fn update(&mut self) -> CouplerResult<()> {
        self.call("update")?;
        let snapshot = self.snapshot();
        self.resume.checkpoint(&snapshot);
        self.state.level += self.increment + self.state.forcing;
        self.state.counter += 1.0;
        self.time.advance();
        Ok(())
    }

    fn resume_state(&mut self) -> CouplerResult<()> {
        self.call("resume")?;
        let snapshot = self.resume.take()?;
        self.restore(snapshot);
        Ok(())
    }

    fn save_state(&self, directory: &Path) -> CouplerResult<()> {
        self.call("save")?;
        write_state(&state_file(directory, &self.name), &self.snapshot())
    }

    fn load_state(&mut self, directory: &Path) -> CouplerResult<()> {
        self.call("load")?;
        let snapshot: TestSnapshot = read_state(&state_file(directory, &self.name))?;
        self.restore(snapshot);
        self.resume.clear();
        Ok(())
    }

    fn finalize(&mut self) -> CouplerResult<()> {
        self.call("finalize")
    }

    fn component_name(&self) -> &str {
        &self.name
    }

    fn input_var_names(&self) -> Vec<String> {
        vec!["forcing".to_string()]
    }

    fn output_var_names(&self) -> Vec<String> {
        vec!["level".to_string(), "counter".to_string()]
    }

    fn attribute_names(&self) -> Vec<String> {
        vec!["parameters:increment".to_string()]
    }

    fn get_attribute_value(&self, name: &str) -> CouplerResult<String> {
        match name {
            "parameters:increment" => Ok(self.increment.to_string()),
            _ => Err(CouplerError::UnknownAttribute {
                component: self.name.clone(),
                attribute: name.to_string(),
            }),
        }
    }

    fn set_attribute_value(&mut self, name: &str, value: &str) -> CouplerResult<()> {
        match name {
            "parameters:increment" => {
                self.increment = parse_attribute(name, value)?;
                Ok(())
            }
            _ => Err(CouplerError::UnknownAttribute {
                component: self.name.clone(),
                attribute: name.to_string(),
            }),
        }
    }

    fn get_value(&self, name: &str) -> CouplerResult<Value> {
        let value = match name {
            "forcing" => self.state.forcing,
            "level" => self.state.level,
            "counter" => self.state.counter,
            _ => return Err(self.unknown_variable(name)),
        };
        Ok(Value::scalar(value))
    }

    fn set_value(&mut self, name: &str, value: &Value) -> CouplerResult<()> {
        let mut current = self.get_value(name)?;
        current.assign(value)?;
        let new_value = current
            .as_f64()
            .and_then(|arr| arr.iter().next().copied())
            .ok_or_else(|| self.unknown_variable(name))?;
        match name {
            "forcing" => self.state.forcing = new_value,
            "level" => self.state.level = new_value,
            _ => self.state.counter = new_value,
        }
        Ok(())
    }

    fn var_units(&self, name: &str) -> CouplerResult<String> {
        match name {
            "forcing" | "level" => Ok("m".to_string()),
            "counter" => Ok("1".to_string()),
            _ => Err(self.unknown_variable(name)),
        }
    }

    fn grid(&self, name: &str) -> CouplerResult<&UniformGrid> {
        self.get_value(name)?;
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
        self.call("set_start_time")?;
        self.time.start_time = time;
        Ok(())
    }

    fn set_end_time(&mut self, time: Time) -> CouplerResult<()> {
        self.call("set_end_time")?;
        self.time.end_time = time;
        Ok(())
    }
}
