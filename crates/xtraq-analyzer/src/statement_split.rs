//! Lexical top-level statement splitting.
//!
//! Real procedure bodies mix control flow (`IF`, `BEGIN...END`, `DECLARE`)
//! that `sqlparser` has no T-SQL grammar for, so the body is first split
//! into top-level statements here; only statements that look like plain
//! DML are handed to the AST parser at all.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawKind {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Exec,
    Other,
}

#[derive(Debug, Clone)]
pub struct RawStatement {
    pub kind: RawKind,
    pub text: String,
}

/// Splits on top-level `;` and on `GO` batch separators, skipping
/// whitespace-only and pure control-flow fragments (`BEGIN`, `END`,
/// `IF`, `ELSE`) which carry no DML of their own.
pub fn split_statements(body: &str) -> Vec<RawStatement> {
    let mut out = Vec::new();
    for chunk in split_top_level(body) {
        let trimmed = chunk.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_pure_control_flow(trimmed) {
            continue;
        }
        let kind = classify(trimmed);
        out.push(RawStatement {
            kind,
            text: trimmed.to_string(),
        });
    }
    out
}

fn split_top_level(body: &str) -> Vec<String> {
    let bytes = body.as_bytes();
    let mut depth: i32 = 0;
    let mut in_single_quote = false;
    let mut in_bracket = false;
    let mut start = 0usize;
    let mut out = Vec::new();
    let mut i = 0usize;
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
            ')' => depth = (depth - 1).max(0),
            ';' if depth == 0 => {
                out.push(body[start..i].to_string());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < bytes.len() {
        out.push(body[start..].to_string());
    }
    out
}

fn is_pure_control_flow(trimmed: &str) -> bool {
    let upper = trimmed.to_uppercase();
    upper == "BEGIN"
        || upper == "END"
        || upper.starts_with("DECLARE ")
        || upper.starts_with("SET NOCOUNT")
        || upper.starts_with("SET XACT_ABORT")
        || upper.starts_with("IF ")
        || upper.starts_with("ELSE")
        || upper.starts_with("RETURN")
        || upper.starts_with("PRINT ")
        || upper.starts_with("THROW")
        || upper.starts_with("GO")
}

fn classify(trimmed: &str) -> RawKind {
    let upper = trimmed.trim_start_matches(|c: char| c.is_whitespace()).to_uppercase();
    let upper = strip_leading_with_cte(&upper);
    if upper.starts_with("SELECT") {
        RawKind::Select
    } else if upper.starts_with("INSERT") {
        RawKind::Insert
    } else if upper.starts_with("UPDATE") {
        RawKind::Update
    } else if upper.starts_with("DELETE") {
        RawKind::Delete
    } else if upper.starts_with("MERGE") {
        RawKind::Merge
    } else if upper.starts_with("EXEC") {
        RawKind::Exec
    } else {
        RawKind::Other
    }
}

/// `WITH cte AS (...) SELECT ...` is still a select for our purposes.
fn strip_leading_with_cte(upper: &str) -> &str {
    if upper.starts_with("WITH") {
        upper.trim_start_matches("WITH").trim_start()
    } else {
        upper
    }
}

pub fn contains_open_json(body: &str) -> bool {
    let upper = body.to_uppercase();
    let mut idx = 0;
    while let Some(pos) = upper[idx..].find("OPENJSON") {
        let abs = idx + pos;
        let before_ok = abs == 0 || !upper.as_bytes()[abs - 1].is_ascii_alphanumeric();
        let after = abs + "OPENJSON".len();
        let after_ok = upper[after..].trim_start().starts_with('(');
        if before_ok && after_ok {
            return true;
        }
        idx = abs + "OPENJSON".len();
    }
    false
}
