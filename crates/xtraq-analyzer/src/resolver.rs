//! Resolver callbacks passed into the analyzer.
//!
//! The analyzer performs no I/O of its own. Callers build a `ResolverContext`
//! from an in-memory snapshot/cache scoped to one run and pass it in; it is
//! never a static or global.

/// What's known about a base-table (or view, or CTE) column.
#[derive(Debug, Clone, Default)]
pub struct ColumnTypeInfo {
    pub sql_type_name: String,
    pub max_length: Option<i32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub is_nullable: bool,
}

/// What's known about a user-defined scalar type.
#[derive(Debug, Clone)]
pub struct UserTypeInfo {
    pub base_sql_type: String,
    pub max_length: Option<i32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub is_nullable: bool,
}

/// What's known about a scalar function's return type.
#[derive(Debug, Clone)]
pub struct FunctionReturnInfo {
    pub sql_type_name: String,
    pub returns_table: bool,
}

/// Pluggable, I/O-free lookups the analyzer consults while walking the AST.
/// Missing resolution yields `None` and the caller keeps a placeholder type.
pub trait ResolverContext {
    fn resolve_column(&self, schema: Option<&str>, table: &str, column: &str) -> Option<ColumnTypeInfo>;

    fn resolve_user_type(&self, schema: Option<&str>, name: &str) -> Option<UserTypeInfo>;

    fn resolve_function_return(&self, schema: Option<&str>, name: &str) -> Option<FunctionReturnInfo>;

    /// Column list for a base table, consulted only to expand `SELECT *`.
    /// Empty means "unknown", in which case the result set keeps
    /// `has_select_star=true` with no synthesized columns.
    fn resolve_table_columns(&self, schema: Option<&str>, table: &str) -> Vec<(String, ColumnTypeInfo)>;
}

/// A resolver that never resolves anything; useful for the fallback path
/// and for tests that only exercise structural parsing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl ResolverContext for NullResolver {
    fn resolve_column(&self, _schema: Option<&str>, _table: &str, _column: &str) -> Option<ColumnTypeInfo> {
        None
    }

    fn resolve_user_type(&self, _schema: Option<&str>, _name: &str) -> Option<UserTypeInfo> {
        None
    }

    fn resolve_function_return(&self, _schema: Option<&str>, _name: &str) -> Option<FunctionReturnInfo> {
        None
    }

    fn resolve_table_columns(&self, _schema: Option<&str>, _table: &str) -> Vec<(String, ColumnTypeInfo)> {
        Vec::new()
    }
}
