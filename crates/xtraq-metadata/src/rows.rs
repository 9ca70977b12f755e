//! Raw catalog rows returned by the metadata client, before any resolution
//! or analysis. These are intentionally thinner than `xtraq_common::model`
//! types: they carry only what a single catalog-view query can answer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRow {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureRow {
    pub schema: String,
    pub name: String,
    /// `sys.objects.modify_date` rendered as 64-bit ticks.
    pub modified_ticks: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterRow {
    pub name: String,
    pub sql_type_name: String,
    pub is_nullable: bool,
    pub max_length: Option<i32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub is_output: bool,
    pub has_default: bool,
    pub is_table_type: bool,
    pub user_type_schema: Option<String>,
    pub user_type_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableColumnRow {
    pub name: String,
    pub sql_type_name: String,
    pub is_nullable: bool,
    pub max_length: Option<i32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub ordinal_position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableTypeRow {
    pub schema: String,
    pub name: String,
    pub user_type_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionReturnRow {
    pub schema: String,
    pub name: String,
    pub returns_table: bool,
    pub scalar_sql_type_name: Option<String>,
}

/// A user-defined scalar type (`CREATE TYPE ... FROM ...`), fetched
/// on-demand as parameter/column type refs surface it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDefinedTypeRow {
    pub schema: String,
    pub name: String,
    pub base_sql_type_name: String,
    pub max_length: Option<i32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub is_nullable: Option<bool>,
}
