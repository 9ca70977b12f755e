//! `EXEC schema.proc` reference extraction.

use crate::content::ExecutedProcedure;

/// Parses the target of an `EXEC`/`EXECUTE` statement, tolerating an
/// optional return-value capture (`EXEC @rc = dbo.Foo`) and an optional
/// leading `EXECUTE` spelling.
pub fn extract_exec_target(statement_text: &str) -> Option<ExecutedProcedure> {
    let trimmed = statement_text.trim();
    let upper = trimmed.to_uppercase();
    let rest = if upper.starts_with("EXECUTE") {
        &trimmed[7..]
    } else if upper.starts_with("EXEC") {
        &trimmed[4..]
    } else {
        return None;
    };
    let rest = rest.trim_start();

    // Skip `@returnvalue =` capture, if present.
    let rest = match rest.find('=') {
        Some(eq) if rest[..eq].trim().starts_with('@') => rest[eq + 1..].trim_start(),
        _ => rest,
    };

    let name_part: String = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '.' || *c == '[' || *c == ']')
        .collect();
    let name_part = name_part.trim_matches(|c| c == '[' || c == ']');
    if name_part.is_empty() {
        return None;
    }

    let parts: Vec<&str> = name_part.split('.').map(|p| p.trim_matches(|c| c == '[' || c == ']')).collect();
    match parts.as_slice() {
        [name] => Some(ExecutedProcedure {
            schema: None,
            name: name.to_string(),
        }),
        [schema, name] => Some(ExecutedProcedure {
            schema: Some(schema.to_string()),
            name: name.to_string(),
        }),
        [_catalog, schema, name] => Some(ExecutedProcedure {
            schema: Some(schema.to_string()),
            name: name.to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_exec() {
        let target = extract_exec_target("EXEC dbo.GetUsers").unwrap();
        assert_eq!(target.schema.as_deref(), Some("dbo"));
        assert_eq!(target.name, "GetUsers");
    }

    #[test]
    fn exec_with_return_capture() {
        let target = extract_exec_target("EXEC @rc = audit.Log").unwrap();
        assert_eq!(target.schema.as_deref(), Some("audit"));
        assert_eq!(target.name, "Log");
    }

    #[test]
    fn execute_spelling_and_brackets() {
        let target = extract_exec_target("EXECUTE [dbo].[DoThing]").unwrap();
        assert_eq!(target.schema.as_deref(), Some("dbo"));
        assert_eq!(target.name, "DoThing");
    }

    #[test]
    fn unqualified_name() {
        let target = extract_exec_target("EXEC LocalProc").unwrap();
        assert_eq!(target.schema, None);
        assert_eq!(target.name, "LocalProc");
    }
}
