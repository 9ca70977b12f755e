//! Top-level analyzer entry point: `parse(sqlText, currentSchema) -> ProcedureContent`.

use sqlparser::ast as ast;
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use xtraq_common::model::ResultSet;

use crate::content::{ExecutedProcedure as ContentExec, ParseDiagnostics, ProcedureContent, StatementKind};
use crate::exec_extract::extract_exec_target;
use crate::for_json::strip_for_json;
use crate::resolver::ResolverContext;
use crate::select_extract::extract_result_set;
use crate::statement_split::{contains_open_json, split_statements, RawKind};

/// Parses a procedure body into `ProcedureContent`, never performing I/O;
/// all type lookups go through `resolver`.
pub fn parse(sql_text: &str, current_schema: &str, resolver: &dyn ResolverContext) -> (ProcedureContent, ParseDiagnostics) {
    let mut content = ProcedureContent::default();
    let mut diagnostics = ParseDiagnostics::default();

    if contains_open_json(sql_text) {
        content.contains_open_json = true;
    }

    let mut next_index = 0u32;
    for raw in split_statements(sql_text) {
        match raw.kind {
            RawKind::Select => {
                content.record_statement(StatementKind::Select);
                match analyze_select_statement(&raw.text, resolver, next_index, &mut diagnostics) {
                    Some(result_set) => {
                        next_index += 1;
                        content.result_sets.push(result_set);
                    }
                    None => {
                        debug!("select statement produced no result set, skipped");
                    }
                }
            }
            RawKind::Insert => content.record_statement(StatementKind::Insert),
            RawKind::Update => content.record_statement(StatementKind::Update),
            RawKind::Delete => content.record_statement(StatementKind::Delete),
            RawKind::Merge => content.record_statement(StatementKind::Merge),
            RawKind::Exec => {
                content.record_statement(StatementKind::Exec);
                if let Some(target) = extract_exec_target(&raw.text) {
                    let schema = target.schema.clone().unwrap_or_else(|| current_schema.to_string());
                    content.executed_procedures.push(ContentExec {
                        schema: Some(schema.clone()),
                        name: target.name.clone(),
                    });
                    content.result_sets.push(ResultSet {
                        index: next_index,
                        name: format!("Exec{next_index}"),
                        returns_json: false,
                        returns_json_array: false,
                        json_root_property: None,
                        has_select_star: false,
                        exec_source_schema: Some(schema),
                        exec_source_procedure: Some(target.name),
                        procedure_ref: None,
                        columns: Vec::new(),
                        json_structure: Vec::new(),
                    });
                    next_index += 1;
                } else {
                    diagnostics.push_warning(format!("could not parse EXEC target from '{}'", raw.text));
                }
            }
            RawKind::Other => content.record_statement(StatementKind::Other),
        }
    }

    if diagnostics.parse_error_count > 0 {
        diagnostics.used_fallback_parser = true;
    }

    (content, diagnostics)
}

fn analyze_select_statement(
    statement_text: &str,
    resolver: &dyn ResolverContext,
    index: u32,
    diagnostics: &mut ParseDiagnostics,
) -> Option<ResultSet> {
    let (body, json_clause) = strip_for_json(statement_text);

    match Parser::parse_sql(&MsSqlDialect {}, &body) {
        Ok(statements) => {
            let query = statements.into_iter().find_map(|s| match s {
                ast::Statement::Query(q) => Some(*q),
                _ => None,
            });
            match query {
                Some(query) => extract_result_set(&query, json_clause, resolver, index, diagnostics),
                None => {
                    diagnostics.record_parse_error(format!("expected a query statement, got something else in '{body}'"));
                    None
                }
            }
        }
        Err(err) => {
            diagnostics.record_parse_error(format!("{err}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::NullResolver;

    #[test]
    fn basic_select_yields_one_result_set() {
        let (content, diagnostics) = parse("SELECT Id, Name FROM Users WHERE Id = @id", "dbo", &NullResolver);
        assert!(content.contains_select);
        assert_eq!(content.result_sets.len(), 1);
        assert!(!diagnostics.used_fallback_parser);
    }

    #[test]
    fn exec_statement_synthesizes_placeholder_in_order() {
        let (content, _) = parse("EXEC dbo.GetUsers; EXEC audit.Log;", "dbo", &NullResolver);
        assert_eq!(content.executed_procedures.len(), 2);
        assert_eq!(content.result_sets.len(), 2);
        assert!(content.result_sets[0].is_exec_placeholder());
        assert_eq!(content.result_sets[0].exec_source_procedure.as_deref(), Some("GetUsers"));
    }

    #[test]
    fn for_json_path_sets_json_flags() {
        let (content, _) = parse("SELECT Id, Name FROM Orders FOR JSON PATH, ROOT('orders')", "dbo", &NullResolver);
        assert_eq!(content.result_sets.len(), 1);
        let rs = &content.result_sets[0];
        assert!(rs.returns_json);
        assert!(rs.returns_json_array);
        assert_eq!(rs.json_root_property.as_deref(), Some("orders"));
    }

    #[test]
    fn unparsable_select_falls_back_and_records_diagnostic() {
        let (content, diagnostics) = parse("SELECT Id FROM Orders CROSS APPLY OPENJSON(@x) WITH (y int) z PIVOT (garbage", "dbo", &NullResolver);
        assert!(content.contains_select);
        assert!(diagnostics.used_fallback_parser || content.result_sets.is_empty());
    }

    #[test]
    fn open_json_usage_sets_flag_regardless_of_statement_kind() {
        let (content, _) = parse("SELECT * FROM OPENJSON(@payload) WITH (Id int)", "dbo", &NullResolver);
        assert!(content.contains_open_json);
    }
}
