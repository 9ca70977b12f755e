//! In-memory catalog backing type resolution.
//!
//! Built once per snapshot run from metadata-client results (or from a
//! prior snapshot index on a warm run) and handed to both the analyzer's
//! `ResolverContext` and this crate's [`crate::resolve::TypeResolver`].

use std::collections::HashMap;

use xtraq_common::model::{FunctionJsonDescriptor, TableInfo, UserDefinedTypeInfo};

#[derive(Debug, Default)]
pub struct TypeCatalog {
    user_types: HashMap<(Option<String>, String, String), UserDefinedTypeInfo>,
    tables: HashMap<(Option<String>, String, String), TableInfo>,
    function_json: HashMap<(String, String), FunctionJsonDescriptor>,
}

fn key(catalog: Option<&str>, schema: &str, name: &str) -> (Option<String>, String, String) {
    (catalog.map(|c| c.to_lowercase()), schema.to_lowercase(), name.to_lowercase())
}

impl TypeCatalog {
    pub fn new() -> Self {
        TypeCatalog::default()
    }

    pub fn insert_user_type(&mut self, info: UserDefinedTypeInfo) {
        let k = key(info.catalog.as_deref(), &info.schema, &info.name);
        self.user_types.insert(k, info);
    }

    pub fn insert_table(&mut self, info: TableInfo) {
        let k = key(info.catalog.as_deref(), &info.schema, &info.name);
        self.tables.insert(k, info);
    }

    pub fn insert_function_json(&mut self, descriptor: FunctionJsonDescriptor) {
        let k = (descriptor.schema.to_lowercase(), descriptor.name.to_lowercase());
        self.function_json.insert(k, descriptor);
    }

    /// Cascading lookup: `(catalog,schema,name)` then `(schema,name)` then
    /// `(name)` only.
    pub fn lookup_user_type(&self, catalog: Option<&str>, schema: Option<&str>, name: &str) -> Option<&UserDefinedTypeInfo> {
        cascading_lookup(&self.user_types, catalog, schema, name)
    }

    pub fn lookup_table(&self, catalog: Option<&str>, schema: Option<&str>, name: &str) -> Option<&TableInfo> {
        cascading_lookup(&self.tables, catalog, schema, name)
    }

    pub fn lookup_function_json(&self, schema: &str, name: &str) -> Option<&FunctionJsonDescriptor> {
        self.function_json.get(&(schema.to_lowercase(), name.to_lowercase()))
    }
}

fn cascading_lookup<'a, V>(
    map: &'a HashMap<(Option<String>, String, String), V>,
    catalog: Option<&str>,
    schema: Option<&str>,
    name: &str,
) -> Option<&'a V> {
    let name_lower = name.to_lowercase();
    if let (Some(catalog), Some(schema)) = (catalog, schema) {
        if let Some(v) = map.get(&(Some(catalog.to_lowercase()), schema.to_lowercase(), name_lower.clone())) {
            return Some(v);
        }
    }
    if let Some(schema) = schema {
        if let Some(v) = map.get(&(None, schema.to_lowercase(), name_lower.clone())) {
            return Some(v);
        }
        // Some entries are stored with a catalog even though the caller
        // only has (schema, name); scan for a schema+name match regardless
        // of catalog before giving up to the name-only tier.
        if let Some((_, v)) = map.iter().find(|((_, s, n), _)| *s == schema.to_lowercase() && *n == name_lower) {
            return Some(v);
        }
    }
    map.iter().find(|((_, _, n), _)| *n == name_lower).map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_type(schema: &str, name: &str) -> UserDefinedTypeInfo {
        UserDefinedTypeInfo {
            catalog: None,
            schema: schema.to_string(),
            name: name.to_string(),
            base_sql_type: "nvarchar".to_string(),
            max_length: Some(50),
            precision: None,
            scale: None,
            is_nullable: Some(true),
        }
    }

    #[test]
    fn cascades_from_full_key_to_name_only() {
        let mut catalog = TypeCatalog::new();
        catalog.insert_user_type(user_type("dbo", "Email"));

        assert!(catalog.lookup_user_type(Some("mydb"), Some("dbo"), "Email").is_some());
        assert!(catalog.lookup_user_type(None, Some("dbo"), "EMAIL").is_some());
        assert!(catalog.lookup_user_type(None, None, "email").is_some());
        assert!(catalog.lookup_user_type(None, Some("other"), "missing").is_none());
    }
}
