//! Command-line surface: `snapshot`, `build`, `version`,
//! `update`, each accepting `--verbose`, `--debug`, `--no-cache`,
//! `--telemetry`, and a procedure filter.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use xtraq_config::ConfigOverrides;

#[derive(Parser)]
#[command(name = "xtraq", author, version, about = "Generates strongly-typed client bindings from SQL Server stored procedures", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape live database metadata into the content-addressed snapshot.
    Snapshot(CommandArgs),
    /// Render generated client bindings from the on-disk snapshot.
    Build(CommandArgs),
    /// Print the tool version and exit.
    Version,
    /// Check for a newer release. Self-update is out of scope; this prints
    /// the current version and a notice that no update server is configured.
    Update,
}

#[derive(Args, Clone)]
pub struct CommandArgs {
    /// Emit info-level progress to stderr.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Emit debug-level progress to stderr.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Bypass the resolution planner; treat every object in scope as stale.
    #[arg(long = "no-cache", global = true)]
    pub no_cache: bool,

    /// Write a run telemetry document under `.xtraq/telemetry/`.
    #[arg(long, global = true)]
    pub telemetry: bool,

    /// Restrict to procedures matching any of these wildcard patterns.
    #[arg(long = "filter", value_name = "PATTERN")]
    pub procedure_filter: Option<Vec<String>>,

    /// Restrict to these schemas (overrides `BuildSchemas`).
    #[arg(long = "schemas", value_name = "SCHEMA")]
    pub schemas: Option<Vec<String>>,

    /// Override the configured generated-output directory.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Override the configured database connection string.
    #[arg(long = "connection-string", env = "XTRAQ_GENERATOR_CONNECTION_STRING")]
    pub connection_string: Option<String>,

    /// Path to `xtraq.toml`; defaults to `./xtraq.toml`.
    #[arg(long = "config", value_name = "PATH")]
    pub config_path: Option<PathBuf>,
}

impl CommandArgs {
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config_path.clone(),
            output_dir: self.output_dir.clone(),
            build_schemas: self.schemas.clone(),
            procedure_filter: self.procedure_filter.clone(),
            connection_string: self.connection_string.clone(),
            no_cache: self.no_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snapshot_with_schema_and_filter_flags() {
        let cli = Cli::parse_from([
            "xtraq",
            "snapshot",
            "--no-cache",
            "--schemas",
            "dbo",
            "--schemas",
            "audit",
            "--filter",
            "Get*",
        ]);
        let Commands::Snapshot(args) = cli.command else {
            panic!("expected the snapshot subcommand");
        };
        assert!(args.no_cache);
        assert_eq!(args.schemas, Some(vec!["dbo".to_string(), "audit".to_string()]));
        let overrides = args.to_overrides();
        assert_eq!(overrides.procedure_filter, Some(vec!["Get*".to_string()]));
    }

    #[test]
    fn version_takes_no_arguments() {
        let cli = Cli::parse_from(["xtraq", "version"]);
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn update_takes_no_arguments() {
        let cli = Cli::parse_from(["xtraq", "update"]);
        assert!(matches!(cli.command, Commands::Update));
    }
}
