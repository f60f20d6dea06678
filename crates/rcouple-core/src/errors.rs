use crate::time::Time;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for invalid coupling operations.
///
/// Failures raised by a component are returned to the caller unchanged,
/// so this enum is shared by the coupling engine and every component implementation.
#[derive(Error, Debug)]
pub enum CouplerError {
    #[error("{0}")]
    Error(String),

    #[error("Invalid configuration in '{path}': {details}")]
    Config { path: PathBuf, details: String },

    #[error("Configuration '{path}' has no '[{section}]' section or it is empty")]
    MissingSection { path: PathBuf, section: String },

    #[error("'{0}' is not a qualified name. Expected '<component>/<variable>'")]
    InvalidQualifiedName(String),

    #[error("No component with id '{0}' is registered")]
    UnknownComponent(String),

    #[error("Component '{component}' has no variable '{variable}'")]
    UnknownVariable { component: String, variable: String },

    #[error("Component '{component}' has no attribute '{attribute}'")]
    UnknownAttribute { component: String, attribute: String },

    #[error("Invalid value '{value}' for attribute '{attribute}': {details}")]
    InvalidAttributeValue {
        attribute: String,
        value: String,
        details: String,
    },

    #[error("Cannot move from t={current} to t={target}: the difference is not a multiple of the time step {time_step}")]
    TimeAlignment {
        current: Time,
        target: Time,
        time_step: Time,
    },

    #[error("Cannot advance to t={target}: it lies beyond the end time t={end_time}")]
    BeyondEndTime { target: Time, end_time: Time },

    #[error("Cannot rewind from t={current} to t={target}: only a single step ({time_step}) of rewind is supported")]
    RewindTooFar {
        current: Time,
        target: Time,
        time_step: Time,
    },

    #[error("No checkpoint is available to rewind to. A rewind must follow an update")]
    RewindUnavailable,

    #[error("Time step must be positive and finite, got {0}")]
    InvalidTimeStep(Time),

    #[error("Operation '{0}' is not supported")]
    Unsupported(&'static str),

    #[error("Cannot {operation} while the composite is {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: String,
    },

    #[error("Components disagree on {quantity}: '{reference}' has {expected} but '{component}' has {found}")]
    TimeBaseMismatch {
        quantity: &'static str,
        reference: String,
        component: String,
        expected: String,
        found: String,
    },

    #[error("Type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Shape mismatch: cannot assign {found:?} into {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Index {index:?} is out of bounds for shape {shape:?}")]
    IndexOutOfBounds { index: Vec<usize>, shape: Vec<usize> },

    #[error("Could not access '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read state file '{path}': {details}")]
    StateFormat { path: PathBuf, details: String },
}

/// Convenience type for `Result<T, CouplerError>`.
pub type CouplerResult<T> = Result<T, CouplerError>;
