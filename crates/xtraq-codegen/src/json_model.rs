//! Nested record synthesis from dotted JSON aliases: `Customer.Id`, `Customer.Name`, `Customer.Address.City`
//! build a tree of records, each level its own named type. Underscores in
//! aliases remain literal -- only `.` denotes hierarchy.

use xtraq_common::model::Column;

use crate::naming::{pascal_case_identifier, sanitize_json_alias};

#[derive(Debug, Clone)]
pub struct FieldNode {
    pub property_name: String,
    pub path_segments: Vec<String>,
    pub column: Option<Column>,
    pub children: Vec<FieldNode>,
}

impl FieldNode {
    pub fn is_leaf(&self) -> bool {
        self.column.is_some()
    }
}

/// Groups `columns` by their dotted alias into a tree of `FieldNode`s. A
/// column whose alias is `Customer.Address.City` becomes a leaf three
/// levels deep under synthesized `Customer` and `Customer.Address` nodes.
pub fn build_json_tree(columns: &[Column]) -> Vec<FieldNode> {
    let mut roots: Vec<FieldNode> = Vec::new();
    for column in columns {
        let segments: Vec<&str> = column.property_name.split('.').collect();
        insert_path(&mut roots, &segments, &[], column);
    }
    roots
}

fn insert_path(siblings: &mut Vec<FieldNode>, remaining: &[&str], prefix: &[String], column: &Column) {
    let (head, rest) = match remaining.split_first() {
        Some(pair) => pair,
        None => return,
    };
    let property_name = sanitize_json_alias(head);
    let mut path_segments = prefix.to_vec();
    path_segments.push(pascal_case_identifier(head));

    let existing = siblings.iter_mut().find(|n| n.property_name == property_name);
    let node = match existing {
        Some(n) => n,
        None => {
            siblings.push(FieldNode {
                property_name: property_name.clone(),
                path_segments: path_segments.clone(),
                column: None,
                children: Vec::new(),
            });
            siblings.last_mut().unwrap()
        }
    };

    if rest.is_empty() {
        node.column = Some(column.clone());
    } else {
        insert_path(&mut node.children, rest, &path_segments, column);
    }
}

/// Type name for a record at `path_segments` beneath `stem` (the
/// procedure+result-set base, e.g. `ListOrdersOrdersResult` for the root).
pub fn nested_record_type_name(stem: &str, path_segments: &[String]) -> String {
    let mut name = stem.to_string();
    for segment in path_segments {
        name.push_str(segment);
    }
    name.push_str("Result");
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtraq_common::model::Column;

    fn column(alias: &str) -> Column {
        Column::placeholder(alias, alias)
    }

    #[test]
    fn flat_aliases_with_underscores_stay_flat() {
        let columns = vec![column("Customer_Id"), column("Customer_Name")];
        let tree = build_json_tree(&columns);
        assert_eq!(tree.len(), 2);
        assert!(tree.iter().all(|n| n.is_leaf()));
    }

    #[test]
    fn dotted_aliases_build_nested_tree() {
        let columns = vec![column("Id"), column("Customer.Id"), column("Customer.Name"), column("Customer.Address.City")];
        let tree = build_json_tree(&columns);
        assert_eq!(tree.len(), 2);
        let customer = tree.iter().find(|n| n.property_name == "Customer").unwrap();
        assert!(!customer.is_leaf());
        assert_eq!(customer.children.len(), 3);
        let address = customer.children.iter().find(|n| n.property_name == "Address").unwrap();
        assert_eq!(address.children.len(), 1);
        assert_eq!(address.children[0].property_name, "City");
    }

    #[test]
    fn nested_type_names_accumulate_pascal_cased_path() {
        let name = nested_record_type_name("ListOrdersOrdersResult", &["Customer".to_string(), "Address".to_string()]);
        assert_eq!(name, "ListOrdersOrdersResultCustomerAddressResult");
    }
}
