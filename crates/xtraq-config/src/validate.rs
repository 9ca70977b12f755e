//! Semantic validation of a resolved `Config`, beyond what deserialization
//! already enforces.

use xtraq_common::error::{Error, Result};

use crate::model::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPurpose {
    Snapshot,
    Build,
}

/// Validate `config` for the given command. `snapshot` requires a
/// connection string; `build` only requires an output directory (it reads
/// from the on-disk snapshot, never the database).
pub fn validate(config: &Config, purpose: ConfigPurpose) -> Result<()> {
    if config.output_dir.trim().is_empty() {
        return Err(Error::MissingConfig("OutputDir".to_string()));
    }
    if config.namespace_root.trim().is_empty() {
        return Err(Error::MissingConfig("NamespaceRoot".to_string()));
    }
    if purpose == ConfigPurpose::Snapshot {
        match &config.generator_connection_string {
            Some(s) if !s.trim().is_empty() => {}
            _ => return Err(Error::MissingConfig("GeneratorConnectionString".to_string())),
        }
    }
    if config.max_open_retries > 20 {
        return Err(Error::Config(
            "MaxOpenRetries above 20 is almost certainly a misconfiguration".to_string(),
        ));
    }
    for schema in config.build_schemas.iter().chain(config.ignored_schemas.iter()) {
        if schema.trim().is_empty() {
            return Err(Error::Config("schema allow/ignore list contains an empty entry".to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_does_not_require_connection_string() {
        let config = Config::default();
        assert!(validate(&config, ConfigPurpose::Build).is_ok());
    }

    #[test]
    fn snapshot_requires_connection_string() {
        let config = Config::default();
        let err = validate(&config, ConfigPurpose::Snapshot).unwrap_err();
        assert_eq!(err.code(), 11);
    }

    #[test]
    fn rejects_empty_output_dir() {
        let mut config = Config::default();
        config.output_dir = "   ".to_string();
        assert!(validate(&config, ConfigPurpose::Build).is_err());
    }
}
