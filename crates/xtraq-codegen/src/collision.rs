//! Aggregating-context method naming with cross-schema collision
//! resolution: on collision,
//! the schema's Pascal prefix is prepended to *every* colliding occurrence,
//! not only the duplicates.

use std::collections::HashMap;

use crate::naming::procedure_type_name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMethod {
    pub schema: String,
    pub procedure: String,
    pub method_name: String,
}

/// Resolves a collision-free `<Proc>Async` method name for every
/// `(schema, procedure)` pair.
pub fn resolve_context_method_names<'a>(procedures: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<ContextMethod> {
    let procedures: Vec<(String, String)> = procedures.into_iter().map(|(s, n)| (s.to_string(), n.to_string())).collect();

    let base_names: Vec<String> = procedures
        .iter()
        .map(|(_, name)| format!("{}Async", procedure_type_name(name)))
        .collect();

    let mut counts: HashMap<String, u32> = HashMap::new();
    for base in &base_names {
        *counts.entry(base.to_lowercase()).or_insert(0) += 1;
    }

    procedures
        .into_iter()
        .zip(base_names)
        .map(|((schema, procedure), base)| {
            let collides = counts[&base.to_lowercase()] > 1;
            let method_name = if collides {
                format!("{}{}", procedure_type_name(&schema), base)
            } else {
                base
            };
            ContextMethod { schema, procedure, method_name }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_names_pass_through_unprefixed() {
        let resolved = resolve_context_method_names([("dbo", "GetUsers")]);
        assert_eq!(resolved[0].method_name, "GetUsersAsync");
    }

    #[test]
    fn cross_schema_collision_prefixes_every_occurrence() {
        let resolved = resolve_context_method_names([("dbo", "GetById"), ("audit", "GetById")]);
        let names: Vec<&str> = resolved.iter().map(|m| m.method_name.as_str()).collect();
        assert_eq!(names, vec!["DboGetByIdAsync", "AuditGetByIdAsync"]);
    }

    #[test]
    fn non_colliding_procedures_stay_untouched_alongside_colliding_ones() {
        let resolved = resolve_context_method_names([("dbo", "GetById"), ("audit", "GetById"), ("dbo", "ListOrders")]);
        assert_eq!(resolved[2].method_name, "ListOrdersAsync");
    }
}
