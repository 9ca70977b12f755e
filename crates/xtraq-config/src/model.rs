//! The `Config` struct: one value per configuration input key, plus the
//! env-var-only toggles alongside them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonTypeLogLevel {
    Off,
    Summary,
    Detailed,
}

impl Default for JsonTypeLogLevel {
    fn default() -> Self {
        JsonTypeLogLevel::Summary
    }
}

impl std::str::FromStr for JsonTypeLogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(JsonTypeLogLevel::Off),
            "summary" => Ok(JsonTypeLogLevel::Summary),
            "detailed" => Ok(JsonTypeLogLevel::Detailed),
            _ => Err(format!("unknown json type log level: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    pub namespace_root: String,
    pub output_dir: String,
    pub build_schemas: Vec<String>,
    pub ignored_schemas: Vec<String>,
    pub ignored_procedures: Vec<String>,
    /// Wildcard-aware procedure allow-list for snapshot refresh; empty means "no restriction".
    pub build_procedures: Vec<String>,
    pub generator_connection_string: Option<String>,
    pub emit_json_include_null_values: bool,
    pub enable_minimal_api_extensions: bool,
    pub enable_entity_framework_integration: bool,
    pub json_type_log_level: JsonTypeLogLevel,
    pub max_open_retries: u32,
    pub retry_delay_ms: u64,
    pub command_timeout_secs: u64,
    /// Legacy single-column JSON sentinel upgrade.
    pub legacy_json_sentinel_upgrade: bool,
    /// Target framework moniker selector for optional endpoint emission.
    pub target_framework: Option<String>,
    /// Caps fan-out of analyzer/writer work; default is
    /// resolved to `num_cpus::get()` at orchestration time when `None`.
    pub max_degree_of_parallelism: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            namespace_root: "Xtraq".to_string(),
            output_dir: "Xtraq".to_string(),
            build_schemas: Vec::new(),
            ignored_schemas: Vec::new(),
            ignored_procedures: Vec::new(),
            build_procedures: Vec::new(),
            generator_connection_string: None,
            emit_json_include_null_values: false,
            enable_minimal_api_extensions: false,
            enable_entity_framework_integration: false,
            json_type_log_level: JsonTypeLogLevel::default(),
            max_open_retries: 0,
            retry_delay_ms: 200,
            command_timeout_secs: 60,
            legacy_json_sentinel_upgrade: false,
            target_framework: None,
            max_degree_of_parallelism: None,
        }
    }
}
