//! Stateless type resolution given a snapshot.

use xtraq_common::model::ObjectRef;
use xtraq_common::sqltype::normalize_type_ref;

use crate::catalog::TypeCatalog;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedType {
    pub sql_type: String,
    pub base_sql_type: Option<String>,
    pub max_length: Option<i32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub is_nullable: Option<bool>,
}

/// `(typeRef, length?, precision?, scale?) -> (sqlType, baseSqlType?, maxLength?, isNullable?)`.
///
/// `sys`-schema refs pass through unmodified. User-defined scalar types
/// expand to their base type plus length/precision. A user type name
/// prefixed with `_` forces `isNullable=false`.
pub fn resolve_type_ref(
    catalog: &TypeCatalog,
    type_ref: &ObjectRef,
    length: Option<i32>,
    precision: Option<u8>,
    scale: Option<u8>,
) -> ResolvedType {
    if type_ref.schema.eq_ignore_ascii_case("sys") {
        return ResolvedType {
            sql_type: normalize_type_ref(&type_ref.schema, &type_ref.name),
            base_sql_type: None,
            max_length: length,
            precision,
            scale,
            is_nullable: None,
        };
    }

    let forces_non_null = type_ref.name.starts_with('_');

    match catalog.lookup_user_type(type_ref.catalog.as_deref(), Some(&type_ref.schema), &type_ref.name) {
        Some(info) => ResolvedType {
            sql_type: type_ref.name.clone(),
            base_sql_type: Some(info.base_sql_type.clone()),
            max_length: info.max_length.or(length),
            precision: info.precision.or(precision),
            scale: info.scale.or(scale),
            is_nullable: if forces_non_null { Some(false) } else { info.is_nullable },
        },
        None => ResolvedType {
            sql_type: type_ref.name.clone(),
            base_sql_type: None,
            max_length: length,
            precision,
            scale,
            is_nullable: if forces_non_null { Some(false) } else { None },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtraq_common::model::UserDefinedTypeInfo;

    #[test]
    fn sys_schema_passes_through() {
        let catalog = TypeCatalog::new();
        let resolved = resolve_type_ref(&catalog, &ObjectRef::new("sys", "INT"), None, None, None);
        assert_eq!(resolved.sql_type, "sys.int");
        assert_eq!(resolved.base_sql_type, None);
    }

    #[test]
    fn user_type_expands_to_base_type() {
        let mut catalog = TypeCatalog::new();
        catalog.insert_user_type(UserDefinedTypeInfo {
            catalog: None,
            schema: "dbo".to_string(),
            name: "Email".to_string(),
            base_sql_type: "nvarchar".to_string(),
            max_length: Some(320),
            precision: None,
            scale: None,
            is_nullable: Some(true),
        });
        let resolved = resolve_type_ref(&catalog, &ObjectRef::new("dbo", "Email"), None, None, None);
        assert_eq!(resolved.base_sql_type.as_deref(), Some("nvarchar"));
        assert_eq!(resolved.max_length, Some(320));
        assert_eq!(resolved.is_nullable, Some(true));
    }

    #[test]
    fn underscore_prefixed_type_forces_non_null() {
        let mut catalog = TypeCatalog::new();
        catalog.insert_user_type(UserDefinedTypeInfo {
            catalog: None,
            schema: "dbo".to_string(),
            name: "_Code".to_string(),
            base_sql_type: "varchar".to_string(),
            max_length: Some(10),
            precision: None,
            scale: None,
            is_nullable: Some(true),
        });
        let resolved = resolve_type_ref(&catalog, &ObjectRef::new("dbo", "_Code"), None, None, None);
        assert_eq!(resolved.is_nullable, Some(false));
    }

    #[test]
    fn unknown_type_keeps_placeholder_but_still_honors_underscore_rule() {
        let catalog = TypeCatalog::new();
        let resolved = resolve_type_ref(&catalog, &ObjectRef::new("dbo", "_Missing"), Some(10), None, None);
        assert_eq!(resolved.base_sql_type, None);
        assert_eq!(resolved.is_nullable, Some(false));
        assert_eq!(resolved.max_length, Some(10));
    }
}
