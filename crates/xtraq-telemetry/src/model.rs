//! Telemetry document shape: one JSON file per command invocation,
//! carrying per-run identity fields and phase timings. A single document
//! rather than batched sample tables -- there is exactly one run to
//! describe, not a stream of samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use xtraq_common::diag::Warning;
use xtraq_common::id::RunId;

/// Wall-clock span of one orchestrator phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub name: String,
    pub duration_ms: u64,
}

/// Counts of objects touched during this run, keyed the same way as
/// `SnapshotStats` so the two documents read consistently side by side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectCounts {
    pub procedures: usize,
    pub tables: usize,
    pub table_types: usize,
    pub user_defined_types: usize,
    pub functions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTelemetry {
    pub run_id: RunId,
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub phases: Vec<PhaseTiming>,
    pub query_count: u64,
    pub warm_run: bool,
    pub object_counts: ObjectCounts,
    #[serde(default)]
    pub warnings: Vec<Warning>,
    pub succeeded: bool,
}

impl RunTelemetry {
    pub fn file_name(&self) -> String {
        format!("{}.json", self.run_id)
    }
}
