//! Round-trip and touchless-when-unchanged properties for the snapshot
//! contract: whatever the writer persists, the reader
//! reconstructs unchanged, and a second write of identical content never
//! touches the file on disk.

use xtraq_common::model::{
    Column, ParserVersions, Parameter, ProcedureDescriptor, ProcedureIndexEntry, ResultSet, SnapshotIndex,
    SnapshotStats,
};
use xtraq_snapshot::atomic::atomic_write_json;
use xtraq_snapshot::layout::SnapshotLayout;
use xtraq_snapshot::reader::SchemaMetadataProvider;

fn sample_descriptor() -> ProcedureDescriptor {
    ProcedureDescriptor {
        catalog: None,
        schema: "dbo".to_string(),
        name: "GetUserById".to_string(),
        operation_name: "GetUserById".to_string(),
        modified_ticks: 1234,
        input_parameters: vec![Parameter {
            name: "@UserId".to_string(),
            sql_type_name: "int".to_string(),
            is_nullable: false,
            max_length: None,
            precision: None,
            scale: None,
            is_output: false,
            has_default: false,
            is_table_type: false,
            user_type_ref: None,
        }],
        output_fields: Vec::new(),
        result_sets: vec![ResultSet {
            index: 0,
            name: "Primary".to_string(),
            returns_json: false,
            returns_json_array: false,
            json_root_property: None,
            has_select_star: false,
            exec_source_schema: None,
            exec_source_procedure: None,
            procedure_ref: None,
            columns: vec![Column::placeholder("Id", "Id")],
            json_structure: Vec::new(),
        }],
        executed_procedures: Vec::new(),
    }
}

#[test]
fn procedure_round_trips_through_writer_and_reader() {
    let dir = tempfile::tempdir().unwrap();
    let layout = SnapshotLayout::new(dir.path());
    let descriptor = sample_descriptor();

    let file = xtraq_common::hash::artifact_file_name(None, &descriptor.schema, &descriptor.name);
    let path = layout.procedures_dir().join(&file);
    let outcome = atomic_write_json(&path, &descriptor).unwrap();
    assert!(outcome.written);

    let mut index = SnapshotIndex::empty("test", "1.0.0");
    index.procedures.push(ProcedureIndexEntry {
        schema: descriptor.schema.clone(),
        name: descriptor.name.clone(),
        file,
        hash: outcome.hash,
        result_sets: descriptor.result_sets.len(),
        modified_ticks: descriptor.modified_ticks,
        executed_procedures: Vec::new(),
    });
    index.finalize();
    atomic_write_json(&layout.index_path(), &index).unwrap();

    let provider = SchemaMetadataProvider::new(dir.path());
    let loaded_index = provider.load_index().unwrap();
    let loaded = provider
        .find_procedure(&loaded_index, "dbo", "GetUserById")
        .unwrap()
        .expect("procedure should be found");

    assert_eq!(loaded.schema, descriptor.schema);
    assert_eq!(loaded.name, descriptor.name);
    assert_eq!(loaded.modified_ticks, descriptor.modified_ticks);
    assert_eq!(loaded.input_parameters.len(), descriptor.input_parameters.len());
    assert_eq!(loaded.result_sets.len(), descriptor.result_sets.len());
}

#[test]
fn warm_run_hydrates_every_procedure_untouched_this_run() {
    let dir = tempfile::tempdir().unwrap();
    let layout = SnapshotLayout::new(dir.path());

    let mut index = SnapshotIndex {
        schema_version: SnapshotIndex::SCHEMA_VERSION.to_string(),
        fingerprint: String::new(),
        parser: ParserVersions {
            tool_version: "0".to_string(),
            parser_version: "0".to_string(),
        },
        stats: SnapshotStats::default(),
        procedures: Vec::new(),
        table_types: Vec::new(),
        user_defined_types: Vec::new(),
        tables: Vec::new(),
        functions: Vec::new(),
    };

    for name in ["ProcA", "ProcB", "ProcC"] {
        let mut descriptor = sample_descriptor();
        descriptor.name = name.to_string();
        let file = xtraq_common::hash::artifact_file_name(None, &descriptor.schema, &descriptor.name);
        let outcome = atomic_write_json(&layout.procedures_dir().join(&file), &descriptor).unwrap();
        index.procedures.push(ProcedureIndexEntry {
            schema: descriptor.schema,
            name: descriptor.name,
            file,
            hash: outcome.hash,
            result_sets: descriptor.result_sets.len(),
            modified_ticks: descriptor.modified_ticks,
            executed_procedures: Vec::new(),
        });
    }
    index.finalize();
    atomic_write_json(&layout.index_path(), &index).unwrap();

    let provider = SchemaMetadataProvider::new(dir.path());
    let loaded_index = provider.load_index().unwrap();
    let all = provider.load_all_procedures(&loaded_index).unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().any(|d| d.name == "ProcA"));
    assert!(all.iter().any(|d| d.name == "ProcB"));
    assert!(all.iter().any(|d| d.name == "ProcC"));
}

#[test]
fn rewriting_identical_index_is_touchless() {
    let dir = tempfile::tempdir().unwrap();
    let layout = SnapshotLayout::new(dir.path());
    let mut index = SnapshotIndex::empty("test", "1.0.0");
    index.finalize();

    let first = atomic_write_json(&layout.index_path(), &index).unwrap();
    let second = atomic_write_json(&layout.index_path(), &index).unwrap();
    assert!(first.written);
    assert!(!second.written);
}
