//! Bridges the I/O-free [`xtraq_analyzer::ResolverContext`] trait to an
//! in-memory [`TypeCatalog`] built once per snapshot run; the analyzer
//! never reaches for a global.

use std::collections::HashMap;

use xtraq_analyzer::resolver::{ColumnTypeInfo, FunctionReturnInfo, ResolverContext, UserTypeInfo};
use xtraq_metadata::rows::FunctionReturnRow;
use xtraq_resolve::TypeCatalog;

pub struct CatalogResolver<'a> {
    catalog: &'a TypeCatalog,
    function_returns: &'a HashMap<(String, String), FunctionReturnRow>,
}

impl<'a> CatalogResolver<'a> {
    pub fn new(catalog: &'a TypeCatalog, function_returns: &'a HashMap<(String, String), FunctionReturnRow>) -> Self {
        CatalogResolver { catalog, function_returns }
    }
}

impl<'a> ResolverContext for CatalogResolver<'a> {
    fn resolve_column(&self, schema: Option<&str>, table: &str, column: &str) -> Option<ColumnTypeInfo> {
        let info = self.catalog.lookup_table(None, schema, table)?;
        let col = info.column(column)?;
        Some(ColumnTypeInfo {
            sql_type_name: col.sql_type.clone(),
            max_length: col.max_length,
            precision: None,
            scale: None,
            is_nullable: col.is_nullable,
        })
    }

    fn resolve_user_type(&self, schema: Option<&str>, name: &str) -> Option<UserTypeInfo> {
        let info = self.catalog.lookup_user_type(None, schema, name)?;
        Some(UserTypeInfo {
            base_sql_type: info.base_sql_type.clone(),
            max_length: info.max_length,
            precision: info.precision,
            scale: info.scale,
            is_nullable: info.is_nullable.unwrap_or(!info.forces_non_null()),
        })
    }

    fn resolve_function_return(&self, schema: Option<&str>, name: &str) -> Option<FunctionReturnInfo> {
        let schema = schema?;
        let row = self.function_returns.get(&(schema.to_lowercase(), name.to_lowercase()))?;
        Some(FunctionReturnInfo {
            sql_type_name: row.scalar_sql_type_name.clone().unwrap_or_else(|| "nvarchar".to_string()),
            returns_table: row.returns_table,
        })
    }

    fn resolve_table_columns(&self, schema: Option<&str>, table: &str) -> Vec<(String, ColumnTypeInfo)> {
        let Some(info) = self.catalog.lookup_table(None, schema, table) else {
            return Vec::new();
        };
        info.columns
            .iter()
            .map(|c| {
                (
                    c.name.clone(),
                    ColumnTypeInfo {
                        sql_type_name: c.sql_type.clone(),
                        max_length: c.max_length,
                        precision: None,
                        scale: None,
                        is_nullable: c.is_nullable,
                    },
                )
            })
            .collect()
    }
}
