//! JSON type enricher: a second pass over `FOR JSON` result sets.

use tracing::debug;

use xtraq_common::model::{Column, ObjectRef, ProcedureDescriptor};

use crate::catalog::TypeCatalog;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub resolved_columns: u32,
    pub new_concrete: u32,
    pub upgrades: u32,
}

/// Runs the enrichment pass over every `returnsJson` result set of
/// `descriptor`, mutating columns in place, and returns per-procedure stats.
pub fn enrich_procedure(descriptor: &mut ProcedureDescriptor, catalog: &TypeCatalog) -> EnrichmentStats {
    let mut stats = EnrichmentStats::default();
    for result_set in descriptor.result_sets.iter_mut().filter(|rs| rs.returns_json) {
        for column in &mut result_set.columns {
            enrich_column(column, catalog, &mut stats);
        }
    }
    stats
}

fn enrich_column(column: &mut Column, catalog: &TypeCatalog, stats: &mut EnrichmentStats) {
    if column.forced_nullable {
        column.is_nullable = true;
    }

    if let (Some(schema), Some(table)) = (column.source_schema.clone(), column.source_table.clone()) {
        if let Some(table_info) = catalog.lookup_table(None, Some(&schema), &table) {
            if let Some(source_column) = &column.source_column {
                if let Some(bound) = table_info.column(source_column) {
                    let was_missing = is_upgradeable(column, true);
                    let was_nvarchar_max = is_upgradeable(column, false);
                    if was_missing || was_nvarchar_max {
                        column.sql_type_name = bound.sql_type.clone();
                        column.max_length = bound.max_length;
                        column.is_nullable = bound.is_nullable || column.forced_nullable;
                        stats.resolved_columns += 1;
                        if was_missing {
                            stats.new_concrete += 1;
                        } else {
                            stats.upgrades += 1;
                        }
                    }
                }
            }
        }
    }

    if column.deferred_json_expansion {
        if let Some(function_ref) = column.function_ref.clone() {
            if let Some(object_ref) = ObjectRef::parse_type_ref(&function_ref).or_else(|| {
                let mut parts = function_ref.splitn(2, '.');
                let schema = parts.next()?;
                let name = parts.next()?;
                Some(ObjectRef::new(schema, name))
            }) {
                if let Some(descriptor) = catalog.lookup_function_json(&object_ref.schema, &object_ref.name) {
                    column.clr_type_hint = Some(if descriptor.returns_json_array {
                        format!("List<{}>", descriptor.root_type_name)
                    } else {
                        descriptor.root_type_name.clone()
                    });
                    column.returns_json = descriptor.returns_json;
                    column.returns_json_array = descriptor.returns_json_array;
                    column.json_include_null_values = descriptor.include_null_values;
                    column.deferred_json_expansion = false;
                } else {
                    debug!(function_ref = %function_ref, "deferred JSON expansion target not found in catalog");
                }
            }
        }
    }
}

/// `missing` checks for an empty/"unknown" type name; the non-`missing`
/// branch checks for the opaque `nvarchar(max)` sentinel specifically.
fn is_upgradeable(column: &Column, missing: bool) -> bool {
    if missing {
        column.sql_type_name.is_empty() || column.sql_type_name.eq_ignore_ascii_case("unknown")
    } else {
        column.sql_type_name.eq_ignore_ascii_case("nvarchar") && column.max_length == Some(-1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtraq_common::model::{ResultSet, TableInfo, TableTypeColumn};

    fn descriptor_with_json_column() -> ProcedureDescriptor {
        let mut column = Column::placeholder("Name", "Name");
        column.source_schema = Some("dbo".to_string());
        column.source_table = Some("Customers".to_string());
        column.source_column = Some("Name".to_string());
        ProcedureDescriptor {
            catalog: None,
            schema: "dbo".to_string(),
            name: "ListCustomers".to_string(),
            operation_name: "ListCustomers".to_string(),
            modified_ticks: 0,
            input_parameters: Vec::new(),
            output_fields: Vec::new(),
            result_sets: vec![ResultSet {
                index: 0,
                name: "ResultSet0".to_string(),
                returns_json: true,
                returns_json_array: true,
                json_root_property: None,
                has_select_star: false,
                exec_source_schema: None,
                exec_source_procedure: None,
                procedure_ref: None,
                columns: vec![column],
                json_structure: Vec::new(),
            }],
            executed_procedures: Vec::new(),
        }
    }

    #[test]
    fn upgrades_placeholder_column_from_bound_table() {
        let mut catalog = TypeCatalog::new();
        catalog.insert_table(TableInfo {
            catalog: None,
            schema: "dbo".to_string(),
            name: "Customers".to_string(),
            columns: vec![TableTypeColumn {
                name: "Name".to_string(),
                sql_type: "varchar".to_string(),
                is_nullable: false,
                max_length: Some(100),
            }],
        });

        let mut descriptor = descriptor_with_json_column();
        let stats = enrich_procedure(&mut descriptor, &catalog);

        assert_eq!(stats.new_concrete, 1);
        let column = &descriptor.result_sets[0].columns[0];
        assert_eq!(column.sql_type_name, "varchar");
        assert_eq!(column.max_length, Some(100));
        assert!(!column.is_nullable);
    }

    #[test]
    fn forced_nullable_always_wins_even_without_a_bound_table() {
        let mut descriptor = descriptor_with_json_column();
        descriptor.result_sets[0].columns[0].forced_nullable = true;
        descriptor.result_sets[0].columns[0].source_table = None;
        let catalog = TypeCatalog::new();
        enrich_procedure(&mut descriptor, &catalog);
        assert!(descriptor.result_sets[0].columns[0].is_nullable);
    }
}
