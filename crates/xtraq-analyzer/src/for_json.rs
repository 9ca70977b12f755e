//! Lexical `FOR JSON` suffix handling.
//!
//! `sqlparser`'s T-SQL dialect has no grammar for the trailing
//! `FOR JSON PATH|AUTO [, ROOT(...)] [, ...]` clause, so it is stripped
//! before the remainder is handed to the AST parser, and its options are
//! recovered from the stripped text directly.

#[derive(Debug, Clone, Default)]
pub struct JsonClause {
    pub returns_json_array: bool,
    pub root_property: Option<String>,
    pub include_null_values: bool,
    pub without_array_wrapper: bool,
}

/// Splits `sql` into `(body_without_for_json, clause)` by locating a
/// top-level (paren-depth zero, outside string literals) `FOR JSON`
/// keyword pair and everything after it.
pub fn strip_for_json(sql: &str) -> (String, Option<JsonClause>) {
    match find_top_level_for_json(sql) {
        Some(start) => {
            let body = sql[..start].trim_end().to_string();
            let suffix = &sql[start..];
            (body, Some(parse_clause(suffix)))
        }
        None => (sql.to_string(), None),
    }
}

fn find_top_level_for_json(sql: &str) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut depth: i32 = 0;
    let mut in_single_quote = false;
    let mut in_bracket = false;
    let mut i = 0;
    let mut last_match = None;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_single_quote {
            if c == '\'' {
                in_single_quote = false;
            }
            i += 1;
            continue;
        }
        if in_bracket {
            if c == ']' {
                in_bracket = false;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' => in_single_quote = true,
            '[' => in_bracket = true,
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth == 0 && c.is_ascii_alphabetic() && word_at(sql, i, "for") {
            let after_for = i + 3;
            let ws = skip_ws(bytes, after_for);
            if word_at(sql, ws, "json") {
                last_match = Some(i);
                i = ws + 4;
                continue;
            }
        }
        i += 1;
    }
    last_match
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i] as char).is_whitespace() {
        i += 1;
    }
    i
}

fn word_at(sql: &str, pos: usize, word: &str) -> bool {
    let bytes = sql.as_bytes();
    if pos + word.len() > bytes.len() {
        return false;
    }
    let slice = &sql[pos..pos + word.len()];
    if !slice.eq_ignore_ascii_case(word) {
        return false;
    }
    let before_ok = pos == 0 || !(bytes[pos - 1] as char).is_alphanumeric();
    let after = pos + word.len();
    let after_ok = after >= bytes.len() || !(bytes[after] as char).is_alphanumeric();
    before_ok && after_ok
}

fn parse_clause(suffix: &str) -> JsonClause {
    let upper = suffix.to_uppercase();
    let mut clause = JsonClause::default();
    clause.returns_json_array = true;
    if upper.contains("WITHOUT_ARRAY_WRAPPER") {
        clause.without_array_wrapper = true;
        clause.returns_json_array = false;
    }
    if upper.contains("INCLUDE_NULL_VALUES") {
        clause.include_null_values = true;
    }
    if let Some(root_pos) = upper.find("ROOT(") {
        let after = root_pos + "ROOT(".len();
        if let Some(close) = suffix[after..].find(')') {
            let inner = suffix[after..after + close].trim();
            let name = inner.trim_matches(|c| c == '\'' || c == '"');
            if !name.is_empty() {
                clause.root_property = Some(name.to_string());
            }
        }
    }
    clause
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_for_json_path_with_root() {
        let sql = "SELECT Id, Name FROM Orders FOR JSON PATH, ROOT('orders')";
        let (body, clause) = strip_for_json(sql);
        assert_eq!(body, "SELECT Id, Name FROM Orders");
        let clause = clause.unwrap();
        assert!(clause.returns_json_array);
        assert_eq!(clause.root_property.as_deref(), Some("orders"));
    }

    #[test]
    fn without_array_wrapper_disables_array_flag() {
        let (_, clause) = strip_for_json("SELECT 1 FOR JSON PATH, WITHOUT_ARRAY_WRAPPER");
        assert!(!clause.unwrap().returns_json_array);
    }

    #[test]
    fn ignores_for_json_inside_nested_parens() {
        let sql = "SELECT (SELECT 1 FOR JSON PATH) AS sub, Id FROM Orders";
        let (_, clause) = strip_for_json(sql);
        assert!(clause.is_none());
    }

    #[test]
    fn no_clause_when_absent() {
        let (body, clause) = strip_for_json("SELECT Id FROM Orders");
        assert_eq!(body, "SELECT Id FROM Orders");
        assert!(clause.is_none());
    }
}
