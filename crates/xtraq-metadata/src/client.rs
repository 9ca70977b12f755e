//! The metadata client contract.
//!
//! `MetadataClient` is purely data-returning: no query here interprets or
//! mutates procedure text, it only surfaces catalog rows. The content
//! analyzer is the only component that reads a procedure *body*.

use async_trait::async_trait;

use xtraq_common::error::Result;

use crate::rows::{
    FunctionReturnRow, ParameterRow, ProcedureRow, SchemaRow, TableColumnRow, TableTypeRow, UserDefinedTypeRow,
};

#[async_trait]
pub trait MetadataClient: Send + Sync {
    async fn list_schemas(&self) -> Result<Vec<SchemaRow>>;

    /// `schema_filter` empty means "all schemas".
    async fn list_procedures(&self, schema_filter: &[String]) -> Result<Vec<ProcedureRow>>;

    /// A narrow single-object probe, used by the planner when only one
    /// object's staleness needs confirming.
    async fn get_object_modify_ticks(&self, schema: &str, name: &str) -> Result<Option<i64>>;

    async fn get_procedure_definition(&self, schema: &str, name: &str) -> Result<Option<String>>;

    async fn list_procedure_inputs(&self, schema: &str, name: &str) -> Result<Vec<ParameterRow>>;

    async fn list_procedure_outputs(&self, schema: &str, name: &str) -> Result<Vec<TableColumnRow>>;

    async fn list_table_types(&self, schemas: &[String]) -> Result<Vec<TableTypeRow>>;

    async fn list_table_type_columns(&self, user_type_id: i32) -> Result<Vec<TableColumnRow>>;

    async fn list_table_columns(&self, schema: &str, table: &str) -> Result<Vec<TableColumnRow>>;

    async fn list_function_returns(&self, schema: &str, function: &str) -> Result<Option<FunctionReturnRow>>;

    /// `listScalarFunctions`: enumerates all
    /// JSON-returning scalar functions in the given schemas, feeding
    /// `FunctionJsonDescriptor` construction for deferred JSON expansion.
    async fn list_scalar_functions(&self, schemas: &[String]) -> Result<Vec<FunctionReturnRow>>;

    /// Used for system views whose first result set shape can only be
    /// discovered by asking the server.
    async fn describe_first_result_set(&self, sql_statement: &str) -> Result<Vec<TableColumnRow>>;

    /// A narrow single-object probe for a user-defined scalar type,
    /// resolved lazily as parameter and column type refs surface it.
    async fn get_user_defined_type(&self, schema: &str, name: &str) -> Result<Option<UserDefinedTypeRow>>;
}
