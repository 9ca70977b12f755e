//! `ProcedureContent`: the analyzer's output IR.

use xtraq_common::model::ResultSet;

/// Diagnostics surfaced alongside `ProcedureContent`, always populated
/// (empty on a clean AST parse) rather than only constructed on the
/// fallback path.
#[derive(Debug, Clone, Default)]
pub struct ParseDiagnostics {
    pub used_fallback_parser: bool,
    pub parse_error_count: u32,
    pub first_parse_error: Option<String>,
    pub warnings: Vec<String>,
}

impl ParseDiagnostics {
    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn record_parse_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.first_parse_error.is_none() {
            self.first_parse_error = Some(message.clone());
        }
        self.parse_error_count += 1;
    }
}

/// One `EXEC schema.proc` reference found in a procedure body.
#[derive(Debug, Clone)]
pub struct ExecutedProcedure {
    pub schema: Option<String>,
    pub name: String,
}

/// A lightweight statement-kind tag, body order preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Exec,
    OpenJson,
    Other,
}

#[derive(Debug, Clone, Default)]
pub struct ProcedureContent {
    pub contains_select: bool,
    pub contains_insert: bool,
    pub contains_update: bool,
    pub contains_delete: bool,
    pub contains_merge: bool,
    pub contains_open_json: bool,
    pub statements: Vec<StatementKind>,
    pub result_sets: Vec<ResultSet>,
    pub executed_procedures: Vec<ExecutedProcedure>,
}

impl ProcedureContent {
    pub fn record_statement(&mut self, kind: StatementKind) {
        match kind {
            StatementKind::Select => self.contains_select = true,
            StatementKind::Insert => self.contains_insert = true,
            StatementKind::Update => self.contains_update = true,
            StatementKind::Delete => self.contains_delete = true,
            StatementKind::Merge => self.contains_merge = true,
            StatementKind::OpenJson => self.contains_open_json = true,
            StatementKind::Exec | StatementKind::Other => {}
        }
        self.statements.push(kind);
    }
}
