//! `build` command: ensure snapshot present → read from snapshot →
//! table-type/procedure/context generation → telemetry.

use std::path::PathBuf;

use chrono::Utc;

use xtraq_codegen::{CodeGenerator, GenerationSummary, GeneratorOptions};
use xtraq_common::error::{Error, Result};
use xtraq_common::id::RunId;
use xtraq_config::{load_config, validate, ConfigOverrides, ConfigPurpose};
use xtraq_snapshot::SchemaMetadataProvider;
use xtraq_telemetry::{ObjectCounts, PhaseTimer, RunTelemetry};

use super::SNAPSHOT_ROOT;

pub struct BuildOutcome {
    pub summary: GenerationSummary,
    pub telemetry: RunTelemetry,
}

pub async fn run(overrides: &ConfigOverrides) -> Result<BuildOutcome> {
    let started_at = Utc::now();
    let (config, _snapshot) = load_config(overrides)?;
    validate(&config, ConfigPurpose::Build)?;

    let mut timer = PhaseTimer::new();
    timer.start("read-snapshot");
    let provider = SchemaMetadataProvider::new(SNAPSHOT_ROOT);
    let index = provider
        .load_index()
        .map_err(|_| Error::MissingConfig("no snapshot found at .xtraq/snapshots; run `xtraq snapshot` first".to_string()))?;
    let procedures = provider.load_all_procedures(&index)?;
    let table_types = index
        .table_types
        .iter()
        .map(|file| provider.load_table_type(file))
        .collect::<Result<Vec<_>>>()?;

    timer.start("generate");
    let generator = CodeGenerator::new(GeneratorOptions {
        output_dir: PathBuf::from(&config.output_dir),
        namespace: config.namespace_root.clone(),
        enable_minimal_api_extensions: config.enable_minimal_api_extensions,
        enable_entity_framework_integration: config.enable_entity_framework_integration,
        template_root: None,
    });
    let summary = generator.generate(&procedures, &table_types)?;

    let phases = timer.finish();
    let telemetry = RunTelemetry {
        run_id: RunId::new(),
        command: "build".to_string(),
        started_at,
        finished_at: Utc::now(),
        phases,
        query_count: 0,
        warm_run: false,
        object_counts: ObjectCounts {
            procedures: procedures.len(),
            tables: 0,
            table_types: table_types.len(),
            user_defined_types: 0,
            functions: 0,
        },
        warnings: Vec::new(),
        succeeded: true,
    };

    Ok(BuildOutcome { summary, telemetry })
}
