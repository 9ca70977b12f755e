//! Orchestrator: sequences the `snapshot` and `build`
//! commands over the already-built `xtraq-*` crates. Each command loads
//! config, times its phases, and returns a `RunTelemetry` document the
//! caller may persist.

pub mod build;
pub mod snapshot;

/// Filesystem layout root for the snapshot contract:
/// `<root>/.xtraq/snapshots/`, relative to the current working directory.
pub const SNAPSHOT_ROOT: &str = ".xtraq/snapshots";
