//! Deterministic, collision-free naming policy.

use heck::ToPascalCase;

/// Pascal-case a raw SQL identifier part, replacing characters that aren't
/// valid in a target-language identifier with `_` and prefixing a leading
/// digit with `N`.
pub fn pascal_case_identifier(raw: &str) -> String {
    let sanitized: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let cased = sanitized.to_pascal_case();
    let cased = if cased.is_empty() { "Item".to_string() } else { cased };
    if cased.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("N{cased}")
    } else {
        cased
    }
}

/// `<Proc>` base type name for a procedure.
pub fn procedure_type_name(name: &str) -> String {
    pascal_case_identifier(name)
}

pub fn result_type_name(proc: &str) -> String {
    format!("{}Result", procedure_type_name(proc))
}

pub fn per_set_result_type_name(proc: &str, set_name: &str) -> String {
    format!("{}{}Result", procedure_type_name(proc), pascal_case_identifier(set_name))
}

pub fn input_type_name(proc: &str) -> String {
    format!("{}Input", procedure_type_name(proc))
}

pub fn output_type_name(proc: &str) -> String {
    format!("{}Output", procedure_type_name(proc))
}

/// Sanitizes a JSON alias into a target-language property identifier:
/// preserves case, replaces non-identifier characters with `_`, prefixes a
/// leading digit with `_`, and escapes reserved keywords with an
/// unambiguous `@` prefix.
pub fn sanitize_json_alias(raw: &str) -> String {
    let sanitized: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let sanitized = if sanitized.is_empty() { "_".to_string() } else { sanitized };
    let sanitized = if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("_{sanitized}")
    } else {
        sanitized
    };
    if is_reserved_keyword(&sanitized) {
        format!("@{sanitized}")
    } else {
        sanitized
    }
}

const RESERVED_KEYWORDS: &[&str] = &[
    "class", "namespace", "interface", "string", "int", "object", "params", "event", "lock",
    "base", "override", "this", "new", "static", "public", "private", "protected", "internal",
    "return", "void", "using", "bool", "decimal", "double", "float", "long", "struct", "enum",
];

fn is_reserved_keyword(ident: &str) -> bool {
    RESERVED_KEYWORDS.contains(&ident.to_lowercase().as_str())
}
