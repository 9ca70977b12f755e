//! Config provenance, recorded alongside the resolved `Config` for
//! telemetry.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::Config;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigSource {
    File { path: String, hash: String },
    Env { var: String },
    Cli { flag: String },
    Default { reason: String },
}

impl ConfigSource {
    pub fn file(path: &Path, hash: String) -> Self {
        ConfigSource::File {
            path: path.to_string_lossy().to_string(),
            hash,
        }
    }

    pub fn env(var: impl Into<String>) -> Self {
        ConfigSource::Env { var: var.into() }
    }

    pub fn cli(flag: impl Into<String>) -> Self {
        ConfigSource::Cli { flag: flag.into() }
    }

    pub fn default_value(reason: impl Into<String>) -> Self {
        ConfigSource::Default {
            reason: reason.into(),
        }
    }
}

/// Resolved configuration plus the provenance of every value that
/// diverged from the built-in default, for telemetry emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub resolved: Config,
    pub sources: Vec<ConfigSource>,
}

impl ConfigSnapshot {
    pub fn new(resolved: Config, sources: Vec<ConfigSource>) -> Self {
        ConfigSnapshot { resolved, sources }
    }
}
