//! Helpers for writing component state files.
//!
//! All components of a composite share one state directory, so each component writes a
//! single file named after itself.

use crate::errors::{CouplerError, CouplerResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Path of the state file for `component` inside `directory`
pub fn state_file(directory: &Path, component: &str) -> PathBuf {
    directory.join(format!("{component}.state.toml"))
}

/// Serialize `state` to a TOML file
pub fn write_state<T: Serialize>(path: &Path, state: &T) -> CouplerResult<()> {
    let contents = toml::to_string(state).map_err(|e| CouplerError::StateFormat {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;
    fs::write(path, contents).map_err(|source| CouplerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Deserialize state previously written with [`write_state`]
pub fn read_state<T: DeserializeOwned>(path: &Path) -> CouplerResult<T> {
    let contents = fs::read_to_string(path).map_err(|source| CouplerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|e| CouplerError::StateFormat {
        path: path.to_path_buf(),
        details: e.to_string(),
    })
}
