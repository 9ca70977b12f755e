//! Typed access to SQL Server catalog views.
//!
//! This crate never interprets procedure bodies; it only surfaces rows from
//! `sys.*` views behind the [`MetadataClient`] trait. The content analyzer
//! downstream is the only component that reads T-SQL text.

pub mod client;
pub mod retry;
pub mod rows;
pub mod tiberius_client;

pub use client::MetadataClient;
pub use retry::RetryPolicy;
pub use rows::{
    FunctionReturnRow, ParameterRow, ProcedureRow, SchemaRow, TableColumnRow, TableTypeRow, UserDefinedTypeRow,
};
pub use tiberius_client::SqlServerMetadataClient;
