//! SQL type → target-language type mapping.
//!
//! The target language is C#: `int?`-style nullable markers for value
//! types, a plain `?` suffix for reference types (`string?`).

fn base_name(sql_type_name: &str) -> &str {
    sql_type_name.rsplit('.').next().unwrap_or(sql_type_name).trim()
}

/// Maps a SQL Server scalar type name to its CLR type, per a fixed table.
pub fn clr_type_for_sql_type(sql_type_name: &str) -> &'static str {
    match base_name(sql_type_name).to_lowercase().as_str() {
        "bit" => "bool",
        "tinyint" => "byte",
        "smallint" => "short",
        "int" => "int",
        "bigint" => "long",
        "decimal" | "numeric" | "money" | "smallmoney" => "decimal",
        "float" => "double",
        "real" => "float",
        "date" | "datetime" | "datetime2" | "smalldatetime" => "DateTime",
        "datetimeoffset" => "DateTimeOffset",
        "time" => "TimeSpan",
        "uniqueidentifier" => "Guid",
        "varbinary" | "binary" | "image" | "rowversion" | "timestamp" => "byte[]",
        "char" | "varchar" | "nchar" | "nvarchar" | "text" | "ntext" | "xml" | "sql_variant" => "string",
        _ => "string",
    }
}

/// Renders a CLR type with the correct nullable marker for `is_nullable`.
pub fn render_clr_type(sql_type_name: &str, is_nullable: bool) -> String {
    let clr = clr_type_for_sql_type(sql_type_name);
    if is_nullable {
        format!("{clr}?")
    } else {
        clr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_numeric_families() {
        assert_eq!(clr_type_for_sql_type("int"), "int");
        assert_eq!(clr_type_for_sql_type("BIGINT"), "long");
        assert_eq!(clr_type_for_sql_type("decimal"), "decimal");
        assert_eq!(clr_type_for_sql_type("money"), "decimal");
    }

    #[test]
    fn maps_temporal_and_identifier_types() {
        assert_eq!(clr_type_for_sql_type("datetime2"), "DateTime");
        assert_eq!(clr_type_for_sql_type("uniqueidentifier"), "Guid");
    }

    #[test]
    fn maps_binary_and_string_families() {
        assert_eq!(clr_type_for_sql_type("varbinary"), "byte[]");
        assert_eq!(clr_type_for_sql_type("nvarchar"), "string");
    }

    #[test]
    fn nullable_value_types_get_question_mark_reference_types_too() {
        assert_eq!(render_clr_type("int", true), "int?");
        assert_eq!(render_clr_type("int", false), "int");
        assert_eq!(render_clr_type("nvarchar", true), "string?");
        assert_eq!(render_clr_type("nvarchar", false), "string");
    }

    #[test]
    fn sys_prefixed_type_refs_strip_to_base_name() {
        assert_eq!(clr_type_for_sql_type("sys.int"), "int");
    }
}
