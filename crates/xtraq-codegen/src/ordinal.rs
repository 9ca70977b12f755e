//! Ordinal-read materialization: each field's
//! column ordinal is looked up once, cached by position, and read through
//! a typed accessor with an `IsDBNull` guard when nullable.

use xtraq_common::model::Column;

use crate::sql_types::{clr_type_for_sql_type, render_clr_type};

/// A single field of a materialized result-set record, carrying the
/// pre-computed read expression the generator emits verbatim.
#[derive(Debug, Clone)]
pub struct OrdinalField {
    pub ordinal: usize,
    pub property_name: String,
    pub clr_type: String,
    pub is_nullable: bool,
    pub read_expr: String,
}

fn reader_accessor(clr_type: &str) -> &'static str {
    match clr_type {
        "bool" => "GetBoolean",
        "byte" => "GetByte",
        "short" => "GetInt16",
        "int" => "GetInt32",
        "long" => "GetInt64",
        "decimal" => "GetDecimal",
        "double" => "GetDouble",
        "float" => "GetFloat",
        "DateTime" => "GetDateTime",
        "DateTimeOffset" => "GetFieldValue<DateTimeOffset>",
        "TimeSpan" => "GetFieldValue<TimeSpan>",
        "Guid" => "GetGuid",
        "string" => "GetString",
        "byte[]" => "GetFieldValue<byte[]>",
        _ => "GetString",
    }
}

/// Computes ordinal fields for a non-JSON result set's columns, in
/// declaration order, caching each field's ordinal against its position in
/// `columns` (the generator looks the ordinal up once per field name).
pub fn compute_ordinal_fields(columns: &[Column]) -> Vec<OrdinalField> {
    columns
        .iter()
        .enumerate()
        .map(|(ordinal, column)| {
            let clr_type = clr_type_for_sql_type(&column.sql_type_name);
            let rendered_type = render_clr_type(&column.sql_type_name, column.is_nullable);
            let accessor = reader_accessor(clr_type);
            let read_expr = if column.is_nullable {
                format!("reader.IsDBNull({ordinal}) ? null : reader.{accessor}({ordinal})")
            } else {
                format!("reader.{accessor}({ordinal})")
            };
            OrdinalField {
                ordinal,
                property_name: column.property_name.clone(),
                clr_type: rendered_type,
                is_nullable: column.is_nullable,
                read_expr,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtraq_common::model::Column;

    fn column(name: &str, sql_type: &str, nullable: bool) -> Column {
        let mut c = Column::placeholder(name, name);
        c.sql_type_name = sql_type.to_string();
        c.is_nullable = nullable;
        c
    }

    #[test]
    fn non_nullable_field_reads_directly() {
        let fields = compute_ordinal_fields(&[column("Id", "int", false)]);
        assert_eq!(fields[0].read_expr, "reader.GetInt32(0)");
        assert_eq!(fields[0].clr_type, "int");
    }

    #[test]
    fn nullable_field_gets_is_db_null_guard() {
        let fields = compute_ordinal_fields(&[column("Name", "nvarchar", true)]);
        assert_eq!(fields[0].read_expr, "reader.IsDBNull(0) ? null : reader.GetString(0)");
        assert_eq!(fields[0].clr_type, "string?");
    }

    #[test]
    fn ordinals_are_positional() {
        let fields = compute_ordinal_fields(&[
            column("Id", "int", false),
            column("Name", "nvarchar", true),
        ]);
        assert_eq!(fields[0].ordinal, 0);
        assert_eq!(fields[1].ordinal, 1);
    }
}
