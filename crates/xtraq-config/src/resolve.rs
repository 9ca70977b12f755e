//! Layered configuration resolution.
//!
//! Order (highest to lowest precedence):
//! 1. Explicit CLI overrides (`ConfigOverrides`)
//! 2. `XTRAQ_*` environment variables
//! 3. `xtraq.toml` in the working directory (or `--config` path)
//! 4. Built-in defaults
//!
//! Environment variables are read *only* in this module; every other crate
//! receives an already-resolved `Config` value.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use xtraq_common::error::{Error, Result};

use crate::model::{Config, JsonTypeLogLevel};
use crate::snapshot::{ConfigSnapshot, ConfigSource};

/// CLI-supplied overrides; every field is optional so an absent flag falls
/// through to the next resolution tier.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub output_dir: Option<String>,
    pub build_schemas: Option<Vec<String>>,
    pub procedure_filter: Option<Vec<String>>,
    pub connection_string: Option<String>,
    pub no_cache: bool,
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Resolve the final `Config`, recording provenance for telemetry.
pub fn load_config(overrides: &ConfigOverrides) -> Result<(Config, ConfigSnapshot)> {
    let mut config = Config::default();
    let mut sources = Vec::new();

    let config_path = overrides
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("xtraq.toml"));

    if config_path.exists() {
        load_file(&config_path, &mut config)?;
        sources.push(ConfigSource::file(&config_path, file_hash(&config_path)?));
    } else {
        sources.push(ConfigSource::default_value("config file not found, using defaults"));
    }

    apply_env(&mut config, &mut sources);
    apply_overrides(&mut config, overrides, &mut sources);

    Ok((config.clone(), ConfigSnapshot::new(config, sources)))
}

fn load_file(path: &Path, config: &mut Config) -> Result<()> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
    let parsed: Config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;
    *config = parsed;
    Ok(())
}

fn file_hash(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(xtraq_common::hash::content_hash(&bytes))
}

fn apply_env(config: &mut Config, sources: &mut Vec<ConfigSource>) {
    if let Ok(v) = env::var("XTRAQ_OUTPUT_DIR") {
        config.output_dir = v;
        sources.push(ConfigSource::env("XTRAQ_OUTPUT_DIR"));
    }
    if let Ok(v) = env::var("XTRAQ_BUILD_SCHEMAS") {
        config.build_schemas = split_list(&v);
        sources.push(ConfigSource::env("XTRAQ_BUILD_SCHEMAS"));
    }
    if let Ok(v) = env::var("XTRAQ_BUILD_PROCEDURES") {
        config.build_procedures = split_list(&v);
        sources.push(ConfigSource::env("XTRAQ_BUILD_PROCEDURES"));
    }
    if let Ok(v) = env::var("XTRAQ_JSON_INCLUDE_NULL_VALUES") {
        config.emit_json_include_null_values = parse_bool(&v);
        sources.push(ConfigSource::env("XTRAQ_JSON_INCLUDE_NULL_VALUES"));
    }
    if let Ok(v) = env::var("XTRAQ_MINIMAL_API") {
        config.enable_minimal_api_extensions = parse_bool(&v);
        sources.push(ConfigSource::env("XTRAQ_MINIMAL_API"));
    }
    if let Ok(v) = env::var("XTRAQ_ENTITY_FRAMEWORK") {
        config.enable_entity_framework_integration = parse_bool(&v);
        sources.push(ConfigSource::env("XTRAQ_ENTITY_FRAMEWORK"));
    }
    if let Ok(v) = env::var("XTRAQ_TFM") {
        config.target_framework = Some(v);
        sources.push(ConfigSource::env("XTRAQ_TFM"));
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Apply CLI overrides last: they win over both file and environment.
fn apply_overrides(config: &mut Config, overrides: &ConfigOverrides, sources: &mut Vec<ConfigSource>) {
    if let Some(dir) = &overrides.output_dir {
        config.output_dir = dir.clone();
        sources.push(ConfigSource::cli("--output-dir"));
    }
    if let Some(schemas) = &overrides.build_schemas {
        config.build_schemas = schemas.clone();
        sources.push(ConfigSource::cli("--schemas"));
    }
    if let Some(filter) = &overrides.procedure_filter {
        config.build_procedures = filter.clone();
        sources.push(ConfigSource::cli("--filter"));
    }
    if let Some(conn) = &overrides.connection_string {
        config.generator_connection_string = Some(conn.clone());
        sources.push(ConfigSource::cli("--connection-string"));
    }
}

/// `JsonTypeLogLevel` has its own `FromStr`; used by the CLI's `--json-log`
/// flag to avoid a clap value-enum duplicating the config model.
pub fn parse_json_type_log_level(s: &str) -> std::result::Result<JsonTypeLogLevel, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_nothing_present() {
        let overrides = ConfigOverrides {
            config_path: Some(PathBuf::from("/nonexistent/xtraq.toml")),
            ..Default::default()
        };
        let (config, snapshot) = load_config(&overrides).unwrap();
        assert_eq!(config.output_dir, "Xtraq");
        assert_eq!(snapshot.sources.len() >= 1, true);
    }

    #[test]
    fn file_values_applied_then_overridden_by_cli() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"output_dir = "FromFile""#).unwrap();
        let overrides = ConfigOverrides {
            config_path: Some(file.path().to_path_buf()),
            output_dir: Some("FromCli".to_string()),
            ..Default::default()
        };
        let (config, _snapshot) = load_config(&overrides).unwrap();
        assert_eq!(config.output_dir, "FromCli");
    }

    #[test]
    fn split_list_handles_comma_and_semicolon() {
        assert_eq!(split_list("a, b; c"), vec!["a", "b", "c"]);
    }
}
