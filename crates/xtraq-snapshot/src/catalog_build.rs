//! On-demand catalog population: fetches only the tables, user types, and
//! JSON-returning scalar functions actually referenced by the procedures
//! being snapshotted, rather than bulk-listing every object in the database.

use std::collections::{HashMap, HashSet};

use xtraq_analyzer::resolver::NullResolver;
use xtraq_common::error::Result;
use xtraq_common::model::{FunctionJsonDescriptor, TableInfo, TableTypeColumn, UserDefinedTypeInfo};
use xtraq_metadata::rows::FunctionReturnRow;
use xtraq_metadata::MetadataClient;
use xtraq_resolve::TypeCatalog;

/// Tables discovered by a first, resolver-free pass over a procedure body
/// -- enough to know what to fetch before the real, type-aware pass runs.
/// User-defined scalar type refs don't need this discovery step: they come
/// straight off `sys.parameters` via `ParameterRow`, no parse required.
#[derive(Debug, Default)]
pub struct DiscoveredRefs {
    pub tables: HashSet<(String, String)>,
}

/// Runs a structural (resolver-free) parse purely to discover which tables
/// and user types a procedure body touches.
pub fn discover_refs(sql_text: &str, current_schema: &str) -> DiscoveredRefs {
    let (content, _) = xtraq_analyzer::parse(sql_text, current_schema, &NullResolver);
    let mut refs = DiscoveredRefs::default();
    for rs in &content.result_sets {
        for col in &rs.columns {
            if let (Some(schema), Some(table)) = (&col.source_schema, &col.source_table) {
                refs.tables.insert((schema.to_lowercase(), table.to_lowercase()));
            }
        }
    }
    refs
}

/// Fetches column metadata for `(schema, table)` and inserts it into
/// `catalog` as both a resolvable table (for column/wildcard lookups) --
/// missing tables (views whose columns aren't resolvable, typos) are
/// silently skipped, matching the analyzer's "missing resolution keeps a
/// placeholder" contract.
pub async fn populate_tables(
    client: &dyn MetadataClient,
    catalog: &mut TypeCatalog,
    refs: &HashSet<(String, String)>,
) -> Result<()> {
    for (schema, table) in refs {
        let columns = client.list_table_columns(schema, table).await?;
        if columns.is_empty() {
            continue;
        }
        catalog.insert_table(TableInfo {
            catalog: None,
            schema: schema.clone(),
            name: table.clone(),
            columns: columns
                .into_iter()
                .map(|c| TableTypeColumn {
                    name: c.name,
                    sql_type: c.sql_type_name,
                    is_nullable: c.is_nullable,
                    max_length: c.max_length,
                })
                .collect(),
        });
    }
    Ok(())
}

pub async fn populate_user_types(
    client: &dyn MetadataClient,
    catalog: &mut TypeCatalog,
    refs: &HashSet<(String, String)>,
) -> Result<()> {
    for (schema, name) in refs {
        if let Some(row) = client.get_user_defined_type(schema, name).await? {
            catalog.insert_user_type(UserDefinedTypeInfo {
                catalog: None,
                schema: row.schema,
                name: row.name,
                base_sql_type: row.base_sql_type_name,
                max_length: row.max_length,
                precision: row.precision,
                scale: row.scale,
                is_nullable: row.is_nullable,
            });
        }
    }
    Ok(())
}

/// Builds the `(schema, name) -> FunctionReturnRow` side table the
/// resolver uses for non-JSON scalar function return types.
pub async fn function_return_map(
    client: &dyn MetadataClient,
    schemas: &[String],
) -> Result<HashMap<(String, String), FunctionReturnRow>> {
    let rows = client.list_scalar_functions(schemas).await?;
    Ok(rows
        .into_iter()
        .map(|r| ((r.schema.to_lowercase(), r.name.to_lowercase()), r))
        .collect())
}

/// Detects JSON-returning scalar functions by parsing each one's own body
/// the same way a procedure body is parsed, looking for a top-level
/// `FOR JSON` result set.
pub async fn function_json_descriptors(
    client: &dyn MetadataClient,
    schemas: &[String],
) -> Result<Vec<FunctionJsonDescriptor>> {
    let candidates = client.list_scalar_functions(schemas).await?;
    let mut out = Vec::new();
    for candidate in candidates {
        let Some(body) = client.get_procedure_definition(&candidate.schema, &candidate.name).await? else {
            continue;
        };
        let (content, _) = xtraq_analyzer::parse(&body, &candidate.schema, &NullResolver);
        let Some(rs) = content.result_sets.iter().find(|rs| rs.returns_json) else {
            continue;
        };
        out.push(FunctionJsonDescriptor {
            schema: candidate.schema.clone(),
            name: candidate.name.clone(),
            returns_json: true,
            returns_json_array: rs.returns_json_array,
            root_type_name: candidate.name.clone(),
            include_null_values: rs.columns.iter().any(|c| c.json_include_null_values),
            column_names: rs.columns.iter().map(|c| c.property_name.clone()).collect(),
        });
    }
    Ok(out)
}
