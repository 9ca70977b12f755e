//! Shared data model for xtraq.
//!
//! These types are produced by the content analyzer, persisted by the
//! snapshot writer, read back by the schema metadata provider, and
//! consumed (never mutated) by the code generator.

use serde::{Deserialize, Serialize};

/// A three-part `catalog?.schema.name` reference, normalized to lowercase
/// for comparison but stored with original casing for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub catalog: Option<String>,
    pub schema: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        ObjectRef {
            catalog: None,
            schema: schema.into(),
            name: name.into(),
        }
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Render as `catalog?.schema.name`, matching the snapshot JSON `TypeRef` format.
    pub fn to_type_ref(&self) -> String {
        match &self.catalog {
            Some(catalog) => format!("{catalog}.{}.{}", self.schema, self.name),
            None => format!("{}.{}", self.schema, self.name),
        }
    }

    /// Parse a `catalog?.schema.name` string back into an `ObjectRef`.
    pub fn parse_type_ref(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [schema, name] => Some(ObjectRef::new(*schema, *name)),
            [catalog, schema, name] => Some(ObjectRef::new(*schema, *name).with_catalog(*catalog)),
            _ => None,
        }
    }

    /// Case-insensitive key for `(catalog, schema, name)` lookups.
    pub fn lookup_key_full(&self) -> (Option<String>, String, String) {
        (
            self.catalog.as_ref().map(|c| c.to_lowercase()),
            self.schema.to_lowercase(),
            self.name.to_lowercase(),
        )
    }

    /// Case-insensitive key for `(schema, name)` lookups.
    pub fn lookup_key_schema(&self) -> (String, String) {
        (self.schema.to_lowercase(), self.name.to_lowercase())
    }

    /// Case-insensitive key for `(name)`-only lookups.
    pub fn lookup_key_name(&self) -> String {
        self.name.to_lowercase()
    }
}

/// A node of the JSON projection hierarchy produced by `FOR JSON` analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonNode {
    /// Dotted path from the result set root, e.g. `"Customer.Address"`.
    pub path: String,
    pub is_array: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<JsonNode>,
}

/// A single procedure input or table-type parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub sql_type_name: String,
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u8>,
    pub is_output: bool,
    pub has_default: bool,
    pub is_table_type: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type_ref: Option<String>,
}

/// A column projected by a result set, or an output field of a procedure
/// with no explicit `SELECT`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub property_name: String,
    pub sql_type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clr_type_hint: Option<String>,
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_column: Option<String>,
    #[serde(default)]
    pub returns_json: bool,
    #[serde(default)]
    pub returns_json_array: bool,
    #[serde(default)]
    pub returns_unknown_json: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_root_property: Option<String>,
    #[serde(default)]
    pub json_include_null_values: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_element_sql_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_ref: Option<String>,
    #[serde(default)]
    pub deferred_json_expansion: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type_schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type_name: Option<String>,
    /// Promoted from an outer-join non-preserved side; kept distinct from
    /// `is_nullable` so the enricher can tell "nullable by binding" from
    /// "nullable by join position" without re-deriving it from the AST.
    #[serde(default)]
    pub forced_nullable: bool,
}

impl Column {
    pub fn placeholder(name: impl Into<String>, property_name: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            property_name: property_name.into(),
            sql_type_name: "nvarchar".to_string(),
            clr_type_hint: None,
            is_nullable: true,
            max_length: Some(-1),
            precision: None,
            scale: None,
            source_schema: None,
            source_table: None,
            source_column: None,
            returns_json: false,
            returns_json_array: false,
            returns_unknown_json: false,
            json_root_property: None,
            json_include_null_values: false,
            json_element_sql_type: None,
            function_ref: None,
            deferred_json_expansion: false,
            attributes: Vec::new(),
            user_type_schema: None,
            user_type_name: None,
            forced_nullable: false,
        }
    }
}

/// One result set of a procedure, position-significant within
/// `ProcedureDescriptor::result_sets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSet {
    pub index: u32,
    pub name: String,
    #[serde(default)]
    pub returns_json: bool,
    #[serde(default)]
    pub returns_json_array: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_root_property: Option<String>,
    #[serde(default)]
    pub has_select_star: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_source_schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_source_procedure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_ref: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub json_structure: Vec<JsonNode>,
}

impl ResultSet {
    /// True when this entry is a reference to an EXEC'd procedure's result
    /// sets, to be expanded lazily by the generator.
    pub fn is_exec_placeholder(&self) -> bool {
        self.exec_source_procedure.is_some() && self.columns.is_empty()
    }
}

/// Immutable once built: reconstructed fresh on every snapshot run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    pub schema: String,
    pub name: String,
    pub operation_name: String,
    pub modified_ticks: i64,
    #[serde(default)]
    pub input_parameters: Vec<Parameter>,
    #[serde(default)]
    pub output_fields: Vec<Column>,
    #[serde(default)]
    pub result_sets: Vec<ResultSet>,
    #[serde(default)]
    pub executed_procedures: Vec<String>,
}

impl ProcedureDescriptor {
    pub fn object_ref(&self) -> ObjectRef {
        let mut r = ObjectRef::new(self.schema.clone(), self.name.clone());
        if let Some(catalog) = &self.catalog {
            r = r.with_catalog(catalog.clone());
        }
        r
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableTypeColumn {
    pub name: String,
    pub sql_type: String,
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i32>,
}

/// A base table or view, as used by the JSON enricher to upgrade
/// `FOR JSON` column types from their bound source table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    pub schema: String,
    pub name: String,
    pub columns: Vec<TableTypeColumn>,
}

impl TableInfo {
    pub fn object_ref(&self) -> ObjectRef {
        let mut r = ObjectRef::new(self.schema.clone(), self.name.clone());
        if let Some(catalog) = &self.catalog {
            r = r.with_catalog(catalog.clone());
        }
        r
    }

    pub fn column(&self, name: &str) -> Option<&TableTypeColumn> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableTypeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    pub schema: String,
    pub name: String,
    pub columns: Vec<TableTypeColumn>,
}

impl TableTypeInfo {
    pub fn object_ref(&self) -> ObjectRef {
        let mut r = ObjectRef::new(self.schema.clone(), self.name.clone());
        if let Some(catalog) = &self.catalog {
            r = r.with_catalog(catalog.clone());
        }
        r
    }
}

/// A user-defined scalar type. A name starting with `_` forces non-null
/// semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDefinedTypeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    pub schema: String,
    pub name: String,
    pub base_sql_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_nullable: Option<bool>,
}

impl UserDefinedTypeInfo {
    pub fn forces_non_null(&self) -> bool {
        self.name.starts_with('_')
    }
}

/// Enables expansion of `JSON_QUERY(dbo.SomeFnAsJson(...))`-style deferred
/// JSON container columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionJsonDescriptor {
    pub schema: String,
    pub name: String,
    pub returns_json: bool,
    pub returns_json_array: bool,
    pub root_type_name: String,
    pub include_null_values: bool,
    pub column_names: Vec<String>,
}

/// Manifest entry for one persisted procedure artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureIndexEntry {
    pub schema: String,
    pub name: String,
    pub file: String,
    pub hash: String,
    pub result_sets: usize,
    /// Snapshot-time `modifiedTicks`, compared against the live value by
    /// the resolution planner to decide staleness.
    pub modified_ticks: i64,
    /// EXEC targets recorded for this procedure at snapshot time, used to
    /// invalidate cross-schema EXEC callers without re-parsing.
    #[serde(default)]
    pub executed_procedures: Vec<String>,
}

/// Top-level snapshot manifest; the source of truth for incremental builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotIndex {
    pub schema_version: String,
    pub fingerprint: String,
    pub parser: ParserVersions,
    pub stats: SnapshotStats,
    #[serde(default)]
    pub procedures: Vec<ProcedureIndexEntry>,
    #[serde(default)]
    pub table_types: Vec<String>,
    #[serde(default)]
    pub user_defined_types: Vec<String>,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserVersions {
    pub tool_version: String,
    pub parser_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub total_procedures: usize,
    pub total_table_types: usize,
    pub total_user_defined_types: usize,
    pub total_tables: usize,
    pub total_functions: usize,
}

impl SnapshotIndex {
    pub const SCHEMA_VERSION: &'static str = "1.0.0";

    pub fn empty(tool_version: impl Into<String>, parser_version: impl Into<String>) -> Self {
        SnapshotIndex {
            schema_version: Self::SCHEMA_VERSION.to_string(),
            fingerprint: String::new(),
            parser: ParserVersions {
                tool_version: tool_version.into(),
                parser_version: parser_version.into(),
            },
            stats: SnapshotStats::default(),
            procedures: Vec::new(),
            table_types: Vec::new(),
            user_defined_types: Vec::new(),
            tables: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Sort all entries into deterministic order (case-insensitive schema,
    /// then name) and recompute the fingerprint. Must be called after every
    /// mutation before the index is written.
    pub fn finalize(&mut self) {
        self.procedures
            .sort_by(|a, b| (a.schema.to_lowercase(), a.name.to_lowercase())
                .cmp(&(b.schema.to_lowercase(), b.name.to_lowercase())));
        self.table_types.sort();
        self.user_defined_types.sort();
        self.tables.sort();
        self.functions.sort();
        self.stats = SnapshotStats {
            total_procedures: self.procedures.len(),
            total_table_types: self.table_types.len(),
            total_user_defined_types: self.user_defined_types.len(),
            total_tables: self.tables.len(),
            total_functions: self.functions.len(),
        };
        self.fingerprint = crate::hash::content_hash(
            serde_json::to_string(&(&self.procedures, &self.table_types, &self.user_defined_types))
                .unwrap_or_default()
                .as_bytes(),
        );
    }
}

/// Output of the resolution planner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionPlan {
    pub effective_schemas: Vec<String>,
    pub invalidation: Invalidation,
    #[serde(default)]
    pub missing_snapshots: Vec<String>,
    pub planner_executed: bool,
    pub warm_run: bool,
    pub reused_existing_result: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_file_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Invalidation {
    /// Objects to refresh, grouped into batches capped by the configured
    /// parallelism.
    pub refresh_plan: Vec<Vec<String>>,
    pub objects_to_refresh: Vec<String>,
}

impl ResolutionPlan {
    pub fn total_refresh_count(&self) -> usize {
        self.invalidation.objects_to_refresh.len()
    }
}
