//! Shared SQL type-name normalization rules.
//!
//! Used by the type resolver (when turning a `TypeRef` into a concrete SQL
//! type) and by the snapshot writer/codegen (when deciding which of
//! `MaxLength`/`Precision`/`Scale` are meaningful enough to serialize).

/// SQL types whose `MaxLength` is meaningful (variable-length strings and
/// binaries).
const VARIABLE_LENGTH_TYPES: &[&str] = &[
    "varchar", "nvarchar", "varbinary", "char", "nchar", "binary",
];

/// SQL types whose `Precision`/`Scale` are meaningful.
const PRECISION_SCALE_TYPES: &[&str] = &["decimal", "numeric"];

/// SQL types whose `Precision` alone is meaningful (fractional-seconds
/// precision on temporal types).
const TEMPORAL_PRECISION_TYPES: &[&str] = &["datetime2", "datetimeoffset", "time"];

fn base_name(sql_type_name: &str) -> &str {
    sql_type_name
        .rsplit('.')
        .next()
        .unwrap_or(sql_type_name)
        .trim()
}

pub fn max_length_meaningful(sql_type_name: &str) -> bool {
    VARIABLE_LENGTH_TYPES.contains(&base_name(sql_type_name).to_lowercase().as_str())
}

pub fn precision_scale_meaningful(sql_type_name: &str) -> bool {
    PRECISION_SCALE_TYPES.contains(&base_name(sql_type_name).to_lowercase().as_str())
}

pub fn temporal_precision_meaningful(sql_type_name: &str) -> bool {
    TEMPORAL_PRECISION_TYPES.contains(&base_name(sql_type_name).to_lowercase().as_str())
}

pub fn precision_meaningful(sql_type_name: &str) -> bool {
    precision_scale_meaningful(sql_type_name) || temporal_precision_meaningful(sql_type_name)
}

/// `sys`-schema types serialize bare as `sys.<basename>`; anything else
/// keeps its own schema.
pub fn normalize_type_ref(schema: &str, name: &str) -> String {
    if schema.eq_ignore_ascii_case("sys") {
        format!("sys.{}", name.to_lowercase())
    } else {
        format!("{schema}.{name}")
    }
}
