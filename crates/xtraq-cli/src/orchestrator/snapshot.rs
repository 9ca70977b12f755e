//! `snapshot` command: config → planner → metadata query → writer →
//! telemetry.

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use xtraq_common::diag::Diagnostics;
use xtraq_common::error::{Error, Result};
use xtraq_common::id::RunId;
use xtraq_common::model::SnapshotIndex;
use xtraq_config::{load_config, validate, ConfigOverrides, ConfigPurpose};
use xtraq_metadata::{MetadataClient, RetryPolicy, SqlServerMetadataClient};
use xtraq_plan::{build_plan, LiveProcedure, PlanInputs};
use xtraq_snapshot::{BuildOptions, BuildSummary, SchemaMetadataProvider, SnapshotWriter};
use xtraq_telemetry::{ObjectCounts, PhaseTimer, RunTelemetry};

use super::SNAPSHOT_ROOT;

pub struct SnapshotOutcome {
    pub summary: BuildSummary,
    pub telemetry: RunTelemetry,
}

pub async fn run(overrides: &ConfigOverrides, cancel: CancellationToken) -> Result<SnapshotOutcome> {
    let started_at = Utc::now();
    let (config, _snapshot) = load_config(overrides)?;
    validate(&config, ConfigPurpose::Snapshot)?;

    let mut timer = PhaseTimer::new();
    timer.start("connect");
    let connection_string = config
        .generator_connection_string
        .clone()
        .expect("validate() rejects a missing connection string for the snapshot command");
    let retry = RetryPolicy::new(config.max_open_retries, config.retry_delay_ms);
    let client = SqlServerMetadataClient::new(connection_string, retry);

    timer.start("discover");
    let live_schemas: Vec<String> = client.list_schemas().await?.into_iter().map(|s| s.name).collect();
    let live_procedure_rows = client.list_procedures(&[]).await?;
    let live_procedures: Vec<LiveProcedure> = live_procedure_rows
        .iter()
        .map(|p| LiveProcedure {
            schema: p.schema.clone(),
            name: p.name.clone(),
            modified_ticks: p.modified_ticks,
        })
        .collect();

    timer.start("plan");
    let provider = SchemaMetadataProvider::new(SNAPSHOT_ROOT);
    let prior_index = provider
        .load_index()
        .unwrap_or_else(|_| SnapshotIndex::empty(env!("CARGO_PKG_VERSION"), SnapshotIndex::SCHEMA_VERSION));

    let max_degree_of_parallelism = config.max_degree_of_parallelism.unwrap_or_else(num_cpus::get);
    let plan = build_plan(&PlanInputs {
        configured_schemas: &config.build_schemas,
        ignored_schemas: &config.ignored_schemas,
        procedure_filter: &config.build_procedures,
        prior_index: &prior_index,
        live_procedures: &live_procedures,
        live_schemas: &live_schemas,
        skip_planner: overrides.no_cache,
        max_degree_of_parallelism,
    });
    info!(
        warm_run = plan.warm_run,
        to_refresh = plan.total_refresh_count(),
        "resolution plan computed"
    );

    if cancel.is_cancelled() {
        return Err(Error::Contract("cancelled before the snapshot write phase began".to_string()));
    }

    timer.start("write");
    let diagnostics = Diagnostics::new();
    let writer = SnapshotWriter::new(&client, SNAPSHOT_ROOT, diagnostics.clone());
    let summary = writer
        .write_snapshot(BuildOptions {
            plan: &plan,
            live_procedures: &live_procedure_rows,
            max_degree_of_parallelism,
        })
        .await?;

    let phases = timer.finish();
    let telemetry = RunTelemetry {
        run_id: RunId::new(),
        command: "snapshot".to_string(),
        started_at,
        finished_at: Utc::now(),
        phases,
        query_count: summary.queries_issued,
        warm_run: summary.warm_run,
        object_counts: ObjectCounts {
            procedures: summary.procedures_refreshed,
            tables: summary.tables_written,
            table_types: summary.table_types_written,
            user_defined_types: summary.user_defined_types_written,
            functions: summary.functions_written,
        },
        warnings: diagnostics.flush(),
        succeeded: true,
    };

    Ok(SnapshotOutcome { summary, telemetry })
}
