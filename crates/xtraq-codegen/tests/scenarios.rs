//! End-to-end scenarios, fixture-driven: hand-built `ProcedureDescriptor`s
//! run through `CodeGenerator` with no live database and no JSON files on
//! disk. Warm-run isn't exercised here -- it's a planner property, covered
//! in `xtraq-plan`.

use std::fs;

use xtraq_codegen::{CodeGenerator, GeneratorOptions};
use xtraq_common::model::{Column, Parameter, ProcedureDescriptor, ResultSet};

fn base_descriptor(schema: &str, name: &str, result_sets: Vec<ResultSet>) -> ProcedureDescriptor {
    ProcedureDescriptor {
        catalog: None,
        schema: schema.to_string(),
        name: name.to_string(),
        operation_name: name.to_string(),
        modified_ticks: 0,
        input_parameters: Vec::new(),
        output_fields: Vec::new(),
        result_sets,
        executed_procedures: Vec::new(),
    }
}

fn options(output_dir: &std::path::Path) -> GeneratorOptions {
    GeneratorOptions {
        output_dir: output_dir.to_path_buf(),
        namespace: "Xtraq.Generated".to_string(),
        enable_minimal_api_extensions: false,
        enable_entity_framework_integration: false,
        template_root: None,
    }
}

#[test]
fn basic_snapshot_emits_input_result_and_context_method() {
    let mut id_column = Column::placeholder("Id", "Id");
    id_column.sql_type_name = "int".to_string();
    id_column.is_nullable = false;
    let mut name_column = Column::placeholder("Name", "Name");
    name_column.sql_type_name = "nvarchar".to_string();
    name_column.is_nullable = true;

    let mut descriptor = base_descriptor(
        "dbo",
        "GetUsers",
        vec![ResultSet {
            index: 0,
            name: "Primary".to_string(),
            returns_json: false,
            returns_json_array: false,
            json_root_property: None,
            has_select_star: false,
            exec_source_schema: None,
            exec_source_procedure: None,
            procedure_ref: None,
            columns: vec![id_column, name_column],
            json_structure: Vec::new(),
        }],
    );
    descriptor.input_parameters.push(Parameter {
        name: "@Id".to_string(),
        sql_type_name: "int".to_string(),
        is_nullable: false,
        max_length: None,
        precision: None,
        scale: None,
        is_output: false,
        has_default: false,
        is_table_type: false,
        user_type_ref: None,
    });

    let dir = tempfile::tempdir().unwrap();
    let generator = CodeGenerator::new(options(dir.path()));
    generator.generate(&[descriptor], &[]).unwrap();

    let procedure_file = fs::read_to_string(dir.path().join("GetUsers.g.cs")).unwrap();
    assert!(procedure_file.contains("public sealed partial record GetUsersInput"));
    assert!(procedure_file.contains("public int Id { get; init; }"));
    assert!(procedure_file.contains("public sealed partial record GetUsersPrimaryResult"));
    assert!(procedure_file.contains("public string? Name { get; init; }"));
    assert!(procedure_file.contains("public sealed partial record GetUsersResult"));
    assert!(procedure_file.contains("public IReadOnlyList<GetUsersPrimaryResult> Primary { get; init; }"));

    let context_file = fs::read_to_string(dir.path().join("XtraqQueries.g.cs")).unwrap();
    assert!(context_file.contains("GetUsersAsync"));
}

#[test]
fn json_array_projection_emits_a_nested_result_type() {
    let mut id_column = Column::placeholder("Id", "Id");
    id_column.sql_type_name = "int".to_string();
    id_column.is_nullable = false;

    let descriptor = base_descriptor(
        "dbo",
        "ListOrders",
        vec![ResultSet {
            index: 0,
            name: "Orders".to_string(),
            returns_json: true,
            returns_json_array: true,
            json_root_property: Some("orders".to_string()),
            has_select_star: false,
            exec_source_schema: None,
            exec_source_procedure: None,
            procedure_ref: None,
            columns: vec![id_column],
            json_structure: Vec::new(),
        }],
    );

    let dir = tempfile::tempdir().unwrap();
    let generator = CodeGenerator::new(options(dir.path()));
    generator.generate(&[descriptor], &[]).unwrap();

    let procedure_file = fs::read_to_string(dir.path().join("ListOrders.g.cs")).unwrap();
    assert!(procedure_file.contains("public sealed partial record ListOrdersOrdersResult"));
    assert!(procedure_file.contains("IReadOnlyList<ListOrdersOrdersResult>"));
    assert!(procedure_file.contains("public string? OrdersRawJson { get; init; }"));
    assert!(procedure_file.contains("UnwrapJsonRoot(json, \"orders\")"));
}

#[test]
fn procedure_with_no_select_synthesizes_a_result_set_from_output_columns() {
    let mut status_column = Column::placeholder("Status", "Status");
    status_column.sql_type_name = "nvarchar".to_string();
    status_column.is_nullable = false;

    let mut descriptor = base_descriptor("dbo", "ArchiveOrder", Vec::new());
    descriptor.output_fields = vec![status_column];

    let dir = tempfile::tempdir().unwrap();
    let generator = CodeGenerator::new(options(dir.path()));
    generator.generate(&[descriptor], &[]).unwrap();

    let procedure_file = fs::read_to_string(dir.path().join("ArchiveOrder.g.cs")).unwrap();
    assert!(procedure_file.contains("public sealed partial record ArchiveOrderOutputResult"));
    assert!(procedure_file.contains("public string Status { get; init; }"));
    assert!(procedure_file.contains("ArchiveOrderOutputAsync"));
}

#[test]
fn exec_wrapper_expands_target_result_sets_with_prefixed_names() {
    let mut id_column = Column::placeholder("Id", "Id");
    id_column.sql_type_name = "int".to_string();
    id_column.is_nullable = false;

    let get_users = base_descriptor(
        "dbo",
        "GetUsers",
        vec![ResultSet {
            index: 0,
            name: "Primary".to_string(),
            returns_json: false,
            returns_json_array: false,
            json_root_property: None,
            has_select_star: false,
            exec_source_schema: None,
            exec_source_procedure: None,
            procedure_ref: None,
            columns: vec![id_column],
            json_structure: Vec::new(),
        }],
    );
    let log_audit = base_descriptor("audit", "Log", Vec::new());
    let run_all = base_descriptor(
        "dbo",
        "RunAll",
        vec![
            ResultSet {
                index: 0,
                name: "Placeholder".to_string(),
                returns_json: false,
                returns_json_array: false,
                json_root_property: None,
                has_select_star: false,
                exec_source_schema: Some("dbo".to_string()),
                exec_source_procedure: Some("GetUsers".to_string()),
                procedure_ref: None,
                columns: Vec::new(),
                json_structure: Vec::new(),
            },
            ResultSet {
                index: 1,
                name: "Placeholder".to_string(),
                returns_json: false,
                returns_json_array: false,
                json_root_property: None,
                has_select_star: false,
                exec_source_schema: Some("audit".to_string()),
                exec_source_procedure: Some("Log".to_string()),
                procedure_ref: None,
                columns: Vec::new(),
                json_structure: Vec::new(),
            },
        ],
    );

    let dir = tempfile::tempdir().unwrap();
    let generator = CodeGenerator::new(options(dir.path()));
    generator.generate(&[get_users, log_audit, run_all], &[]).unwrap();

    let run_all_file = fs::read_to_string(dir.path().join("RunAll.g.cs")).unwrap();
    assert!(run_all_file.contains("public sealed partial record RunAllGetUsersPrimaryResult"));
    assert!(!run_all_file.contains("LogResult"));
}

#[test]
fn naming_collision_prefixes_both_context_methods_with_their_schema() {
    let mut id_column = Column::placeholder("Id", "Id");
    id_column.sql_type_name = "int".to_string();
    id_column.is_nullable = false;

    let result_sets = || {
        vec![ResultSet {
            index: 0,
            name: "Primary".to_string(),
            returns_json: false,
            returns_json_array: false,
            json_root_property: None,
            has_select_star: false,
            exec_source_schema: None,
            exec_source_procedure: None,
            procedure_ref: None,
            columns: vec![id_column.clone()],
            json_structure: Vec::new(),
        }]
    };

    let dbo_get_by_id = base_descriptor("dbo", "GetById", result_sets());
    let audit_get_by_id = base_descriptor("audit", "GetById", result_sets());

    let dir = tempfile::tempdir().unwrap();
    let generator = CodeGenerator::new(options(dir.path()));
    generator.generate(&[dbo_get_by_id, audit_get_by_id], &[]).unwrap();

    let context_file = fs::read_to_string(dir.path().join("XtraqQueries.g.cs")).unwrap();
    assert!(context_file.contains("DboGetByIdAsync"));
    assert!(context_file.contains("AuditGetByIdAsync"));
}

#[test]
fn nested_json_aliases_build_nested_record_types() {
    let columns = vec![
        Column::placeholder("Id", "Id"),
        Column::placeholder("CustomerId", "Customer.Id"),
        Column::placeholder("CustomerName", "Customer.Name"),
        Column::placeholder("CustomerAddressCity", "Customer.Address.City"),
    ];

    let descriptor = base_descriptor(
        "dbo",
        "GetOrderDetail",
        vec![ResultSet {
            index: 0,
            name: "Primary".to_string(),
            returns_json: true,
            returns_json_array: false,
            json_root_property: None,
            has_select_star: false,
            exec_source_schema: None,
            exec_source_procedure: None,
            procedure_ref: None,
            columns,
            json_structure: Vec::new(),
        }],
    );

    let dir = tempfile::tempdir().unwrap();
    let generator = CodeGenerator::new(options(dir.path()));
    generator.generate(&[descriptor], &[]).unwrap();

    let procedure_file = fs::read_to_string(dir.path().join("GetOrderDetail.g.cs")).unwrap();
    assert!(procedure_file.contains("public sealed partial record GetOrderDetailPrimaryResultCustomerResult"));
    assert!(procedure_file.contains("public sealed partial record GetOrderDetailPrimaryResultCustomerAddressResult"));
    assert!(procedure_file.contains("public string? City { get; init; }"));
}
