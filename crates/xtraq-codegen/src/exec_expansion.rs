//! EXEC-forwarding expansion: a pure, non-destructive projection over snapshot
//! data performed at generation time, never persisted. Cycle-safe via a
//! per-branch visited set, depth-cut at 8.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use xtraq_common::model::{ProcedureDescriptor, ResultSet};

const MAX_EXPANSION_DEPTH: u32 = 8;

#[derive(Debug, Clone)]
pub struct ExpandedResultSet {
    pub display_name: String,
    pub result_set: ResultSet,
}

fn object_key(schema: &str, name: &str) -> String {
    format!("{}.{}", schema.to_lowercase(), name.to_lowercase())
}

/// Expands every EXEC placeholder in `descriptor`'s result sets, flattening
/// recursively into the EXEC target's own non-empty result sets (skipping
/// empty ones, logging missing targets), with names prefixed by the target
/// procedure's name.
pub fn expand_result_sets(
    descriptor: &ProcedureDescriptor,
    all: &HashMap<String, ProcedureDescriptor>,
) -> Vec<ExpandedResultSet> {
    let mut visited = HashSet::new();
    visited.insert(object_key(&descriptor.schema, &descriptor.name));
    let mut out = Vec::new();
    expand_into(&descriptor.result_sets, all, &visited, 0, &mut out);
    out
}

fn expand_into(
    sets: &[ResultSet],
    all: &HashMap<String, ProcedureDescriptor>,
    visited: &HashSet<String>,
    depth: u32,
    out: &mut Vec<ExpandedResultSet>,
) {
    for rs in sets {
        if !rs.is_exec_placeholder() {
            out.push(ExpandedResultSet {
                display_name: rs.name.clone(),
                result_set: rs.clone(),
            });
            continue;
        }

        let (Some(schema), Some(proc_name)) = (&rs.exec_source_schema, &rs.exec_source_procedure) else {
            continue;
        };
        let key = object_key(schema, proc_name);

        if depth >= MAX_EXPANSION_DEPTH {
            warn!(target = %key, depth, "EXEC expansion depth cutoff reached, leaving placeholder unexpanded");
            continue;
        }
        if visited.contains(&key) {
            warn!(target = %key, "EXEC expansion cycle detected, stopping this branch");
            continue;
        }

        let Some(target) = all.get(&key) else {
            warn!(target = %key, "EXEC expansion target not found in snapshot");
            continue;
        };

        let mut child_visited = visited.clone();
        child_visited.insert(key);
        let mut nested = Vec::new();
        expand_into(&target.result_sets, all, &child_visited, depth + 1, &mut nested);
        for mut expanded in nested {
            expanded.display_name = format!("{proc_name}_{}", expanded.display_name);
            out.push(expanded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtraq_common::model::Column;

    fn descriptor(schema: &str, name: &str, result_sets: Vec<ResultSet>) -> ProcedureDescriptor {
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

    fn concrete_set(name: &str) -> ResultSet {
        ResultSet {
            index: 0,
            name: name.to_string(),
            returns_json: false,
            returns_json_array: false,
            json_root_property: None,
            has_select_star: false,
            exec_source_schema: None,
            exec_source_procedure: None,
            procedure_ref: None,
            columns: vec![Column::placeholder("Id", "Id")],
            json_structure: Vec::new(),
        }
    }

    fn placeholder(schema: &str, proc: &str) -> ResultSet {
        ResultSet {
            index: 0,
            name: "Placeholder".to_string(),
            returns_json: false,
            returns_json_array: false,
            json_root_property: None,
            has_select_star: false,
            exec_source_schema: Some(schema.to_string()),
            exec_source_procedure: Some(proc.to_string()),
            procedure_ref: None,
            columns: Vec::new(),
            json_structure: Vec::new(),
        }
    }

    #[test]
    fn expands_exec_placeholder_with_target_prefix() {
        let mut all = HashMap::new();
        all.insert("dbo.getusers".to_string(), descriptor("dbo", "GetUsers", vec![concrete_set("Primary")]));
        let run_all = descriptor("dbo", "RunAll", vec![placeholder("dbo", "GetUsers")]);

        let expanded = expand_result_sets(&run_all, &all);
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].display_name, "GetUsers_Primary");
    }

    #[test]
    fn skips_target_with_no_result_sets_and_missing_target() {
        let mut all = HashMap::new();
        all.insert("audit.log".to_string(), descriptor("audit", "Log", vec![]));
        let run_all = descriptor(
            "dbo",
            "RunAll",
            vec![placeholder("audit", "Log"), placeholder("dbo", "Missing")],
        );

        let expanded = expand_result_sets(&run_all, &all);
        assert!(expanded.is_empty());
    }

    #[test]
    fn cycle_is_detected_and_does_not_infinite_loop() {
        let mut all = HashMap::new();
        all.insert("dbo.a".to_string(), descriptor("dbo", "A", vec![placeholder("dbo", "B")]));
        all.insert("dbo.b".to_string(), descriptor("dbo", "B", vec![placeholder("dbo", "A")]));

        let expanded = expand_result_sets(all.get("dbo.a").unwrap(), &all);
        assert!(expanded.is_empty());
    }
}
