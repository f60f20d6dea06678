//! Composite configuration.
//!
//! A composite configuration is a TOML document with the sections:
//!
//! ```toml
//! [models]
//! land = "land.toml"
//! routing = "routing.toml"
//!
//! [exchanges]
//! "land/runoff" = "routing/inflow"
//!
//! [coupling]
//! reference_component = "routing"
//! strict_time_base = false
//! unknown_component = "ignore"
//! ```
//!
//! `[models]` maps component ids to the path of each component's own configuration.
//! The order of the entries is the registration order used everywhere in the composite.
//! Relative paths are resolved against the directory holding the composite configuration.
//! `[exchanges]` and `[coupling]` are optional. Other sections are ignored.

use crate::errors::{CouplerError, CouplerResult};
use crate::naming::QualifiedName;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What to do when a value is written to a component id that is not registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownComponentPolicy {
    /// Log a warning and do nothing
    #[default]
    Ignore,
    /// Fail with [`CouplerError::UnknownComponent`]
    Error,
}

/// Settings from the optional `[coupling]` section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CouplingSettings {
    /// Component providing the start time, end time and time units of the composite.
    ///
    /// Defaults to the last registered component.
    pub reference_component: Option<String>,
    /// Require every component to agree with the reference on start time, end time and units
    pub strict_time_base: bool,
    pub unknown_component: UnknownComponentPolicy,
}

/// A component id and the configuration used to build it
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEntry {
    pub id: String,
    pub config_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    models: IndexMap<String, PathBuf>,
    #[serde(default)]
    exchanges: IndexMap<String, String>,
    #[serde(default)]
    coupling: CouplingSettings,
}

/// The parsed contents of a composite configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositeConfig {
    pub models: Vec<ModelEntry>,
    /// `(source, destination)` qualified names in file order
    pub exchanges: Vec<(String, String)>,
    pub coupling: CouplingSettings,
}

impl CompositeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and validate the configuration file at `path`
    pub fn from_file(path: &Path) -> CouplerResult<Self> {
        let contents = fs::read_to_string(path).map_err(|source| CouplerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents, path)
    }

    /// Parse configuration contents that were read from `origin`
    ///
    /// `origin` is used to resolve relative component paths and in error messages.
    pub fn from_toml(contents: &str, origin: &Path) -> CouplerResult<Self> {
        let raw: RawConfig = toml::from_str(contents).map_err(|e| CouplerError::Config {
            path: origin.to_path_buf(),
            details: e.to_string(),
        })?;

        if raw.models.is_empty() {
            return Err(CouplerError::MissingSection {
                path: origin.to_path_buf(),
                section: "models".to_string(),
            });
        }

        let base_dir = origin.parent().unwrap_or_else(|| Path::new(""));
        let models = raw
            .models
            .into_iter()
            .map(|(id, config_path)| ModelEntry {
                config_path: base_dir.join(config_path),
                id,
            })
            .collect();

        let config = Self {
            models,
            exchanges: raw.exchanges.into_iter().collect(),
            coupling: raw.coupling,
        };
        config.validate(origin)?;
        Ok(config)
    }

    /// Register a component
    pub fn with_model(mut self, id: &str, config_path: impl Into<PathBuf>) -> Self {
        self.models.push(ModelEntry {
            id: id.to_string(),
            config_path: config_path.into(),
        });
        self
    }

    /// Copy `source` into `destination` after the source component steps
    pub fn with_exchange(mut self, source: &str, destination: &str) -> Self {
        self.exchanges
            .push((source.to_string(), destination.to_string()));
        self
    }

    pub fn with_coupling(mut self, coupling: CouplingSettings) -> Self {
        self.coupling = coupling;
        self
    }

    /// Check the configuration is internally consistent
    ///
    /// Component ids must be unique and must not contain the name separator.
    /// Both sides of every exchange must be qualified names and the reference component
    /// (if any) must be registered.
    pub fn validate(&self, origin: &Path) -> CouplerResult<()> {
        let config_error = |details: String| CouplerError::Config {
            path: origin.to_path_buf(),
            details,
        };

        if self.models.is_empty() {
            return Err(CouplerError::MissingSection {
                path: origin.to_path_buf(),
                section: "models".to_string(),
            });
        }

        for (i, entry) in self.models.iter().enumerate() {
            if entry.id.is_empty() || entry.id.contains(crate::naming::SEPARATOR) {
                return Err(config_error(format!(
                    "Component id '{}' must be non-empty and must not contain '{}'",
                    entry.id,
                    crate::naming::SEPARATOR
                )));
            }
            if self.models[..i].iter().any(|other| other.id == entry.id) {
                return Err(config_error(format!(
                    "Component id '{}' is registered more than once",
                    entry.id
                )));
            }
        }

        for (source, destination) in &self.exchanges {
            for name in [source, destination] {
                if QualifiedName::split(name).is_none() {
                    return Err(config_error(format!(
                        "Exchange '{}' = '{}' uses '{}' which is not of the form '<component>/<variable>'",
                        source, destination, name
                    )));
                }
            }
        }

        if let Some(reference) = &self.coupling.reference_component {
            if !self.models.iter().any(|entry| &entry.id == reference) {
                return Err(config_error(format!(
                    "Reference component '{}' is not listed in [models]",
                    reference
                )));
            }
        }
        Ok(())
    }
}
