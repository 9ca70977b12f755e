//! AST-driven extraction of one `ResultSet` from a parsed `SELECT`.

use std::collections::HashMap;

use sqlparser::ast as ast;

use xtraq_common::model::{Column, JsonNode, ResultSet};

use crate::content::ParseDiagnostics;
use crate::for_json::JsonClause;
use crate::resolver::ResolverContext;

struct TableBinding {
    schema: Option<String>,
    name: String,
    forced_nullable: bool,
}

/// Builds a `ResultSet` from an already-parsed `SELECT` query, applying the
/// join-nullability and JSON-projection rules.
pub fn extract_result_set(
    query: &ast::Query,
    json_clause: Option<JsonClause>,
    resolver: &dyn ResolverContext,
    index: u32,
    diagnostics: &mut ParseDiagnostics,
) -> Option<ResultSet> {
    let select = match query.body.as_ref() {
        ast::SetExpr::Select(select) => select,
        _ => {
            diagnostics.push_warning("top-level query body is not a simple SELECT; skipped");
            return None;
        }
    };

    let bindings = build_table_bindings(select, diagnostics);
    let single_table = if bindings.len() == 1 { bindings.keys().next().cloned() } else { None };

    let mut columns = Vec::new();
    let mut has_select_star = false;
    let mut nested_array_paths: Vec<String> = Vec::new();

    for (ordinal, item) in select.projection.iter().enumerate() {
        match item {
            ast::SelectItem::Wildcard(_) => {
                has_select_star = true;
                if let Some(key) = &single_table {
                    let binding = &bindings[key];
                    expand_wildcard(binding, resolver, &mut columns);
                } else {
                    diagnostics.push_warning("unqualified SELECT * with multiple FROM tables could not be expanded");
                }
            }
            ast::SelectItem::QualifiedWildcard(name, _) => {
                has_select_star = true;
                let qualifier = object_name_last(name).to_lowercase();
                if let Some(binding) = bindings.get(&qualifier) {
                    expand_wildcard(binding, resolver, &mut columns);
                } else {
                    diagnostics.push_warning(format!("qualified wildcard for unknown table '{qualifier}'"));
                }
            }
            ast::SelectItem::UnnamedExpr(expr) => {
                let name = default_property_name(expr, ordinal);
                if let Some(path) = nested_json_path(expr, &name) {
                    nested_array_paths.push(path);
                }
                columns.push(build_column(&name, expr, &bindings, single_table.as_deref(), resolver, diagnostics));
            }
            ast::SelectItem::ExprWithAlias { expr, alias } => {
                let name = alias.value.clone();
                if let Some(path) = nested_json_path(expr, &name) {
                    nested_array_paths.push(path);
                }
                columns.push(build_column(&name, expr, &bindings, single_table.as_deref(), resolver, diagnostics));
            }
        }
    }

    let mut result_set = ResultSet {
        index,
        name: format!("ResultSet{index}"),
        returns_json: json_clause.is_some(),
        returns_json_array: json_clause.as_ref().map(|c| c.returns_json_array).unwrap_or(false),
        json_root_property: json_clause.as_ref().and_then(|c| c.root_property.clone()),
        has_select_star,
        exec_source_schema: None,
        exec_source_procedure: None,
        procedure_ref: None,
        columns,
        json_structure: Vec::new(),
    };

    if result_set.returns_json {
        result_set.json_structure = build_json_structure(&result_set.columns, &nested_array_paths);
        if let Some(clause) = &json_clause {
            if clause.include_null_values {
                for column in &mut result_set.columns {
                    column.json_include_null_values = true;
                }
            }
        }
    }

    Some(result_set)
}

fn build_table_bindings(select: &ast::Select, diagnostics: &mut ParseDiagnostics) -> HashMap<String, TableBinding> {
    let mut bindings = HashMap::new();
    for twj in &select.from {
        if let Some((key, binding)) = table_binding_from_factor(&twj.relation, false) {
            bindings.insert(key, binding);
        }
        let mut preserved_keys: Vec<String> = bindings.keys().cloned().collect();
        for join in &twj.joins {
            let forced_new = matches!(join.join_operator, ast::JoinOperator::Left(_) | ast::JoinOperator::FullOuter(_) | ast::JoinOperator::LeftOuter(_));
            let forced_existing = matches!(join.join_operator, ast::JoinOperator::Right(_) | ast::JoinOperator::FullOuter(_) | ast::JoinOperator::RightOuter(_));

            if forced_existing {
                for key in &preserved_keys {
                    if let Some(binding) = bindings.get_mut(key) {
                        binding.forced_nullable = true;
                    }
                }
            }

            match table_binding_from_factor(&join.relation, forced_new) {
                Some((key, binding)) => {
                    preserved_keys.push(key.clone());
                    bindings.insert(key, binding);
                }
                None => diagnostics.push_warning("could not bind a joined table factor"),
            }
        }
    }
    bindings
}

fn table_binding_from_factor(factor: &ast::TableFactor, forced_nullable: bool) -> Option<(String, TableBinding)> {
    match factor {
        ast::TableFactor::Table { name, alias, .. } => {
            let parts: Vec<String> = name.0.iter().map(|i| i.to_string()).collect();
            let (schema, table_name) = match parts.as_slice() {
                [n] => (None, n.clone()),
                [s, n] => (Some(s.clone()), n.clone()),
                [_, s, n] => (Some(s.clone()), n.clone()),
                _ => return None,
            };
            let key = alias
                .as_ref()
                .map(|a| a.name.value.to_lowercase())
                .unwrap_or_else(|| table_name.to_lowercase());
            Some((
                key,
                TableBinding {
                    schema,
                    name: table_name,
                    forced_nullable,
                },
            ))
        }
        ast::TableFactor::Derived { alias, .. } => {
            let key = alias.as_ref().map(|a| a.name.value.to_lowercase()).unwrap_or_default();
            if key.is_empty() {
                None
            } else {
                Some((
                    key,
                    TableBinding {
                        schema: None,
                        name: String::new(),
                        forced_nullable,
                    },
                ))
            }
        }
        _ => None,
    }
}

fn object_name_last(name: &ast::ObjectName) -> String {
    name.0.last().map(|i| i.to_string()).unwrap_or_default()
}

fn expand_wildcard(binding: &TableBinding, resolver: &dyn ResolverContext, out: &mut Vec<Column>) {
    if binding.name.is_empty() {
        return;
    }
    for (col_name, info) in resolver.resolve_table_columns(binding.schema.as_deref(), &binding.name) {
        let mut column = Column::placeholder(col_name.clone(), col_name.clone());
        column.sql_type_name = info.sql_type_name;
        column.max_length = info.max_length;
        column.precision = info.precision;
        column.scale = info.scale;
        column.is_nullable = info.is_nullable || binding.forced_nullable;
        column.forced_nullable = binding.forced_nullable;
        column.source_schema = binding.schema.clone();
        column.source_table = Some(binding.name.clone());
        column.source_column = Some(column.name.clone());
        out.push(column);
    }
}

fn default_property_name(expr: &ast::Expr, ordinal: usize) -> String {
    match expr {
        ast::Expr::Identifier(ident) => ident.value.clone(),
        ast::Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.clone()).unwrap_or_else(|| format!("Column{ordinal}")),
        _ => format!("Column{ordinal}"),
    }
}

const JSON_BUILTINS: &[&str] = &["json_query", "json_value", "json_modify"];

fn build_column(
    property_name: &str,
    expr: &ast::Expr,
    bindings: &HashMap<String, TableBinding>,
    single_table: Option<&str>,
    resolver: &dyn ResolverContext,
    diagnostics: &mut ParseDiagnostics,
) -> Column {
    match expr {
        ast::Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
            let table_key = parts[parts.len() - 2].value.to_lowercase();
            let column_name = parts[parts.len() - 1].value.clone();
            bind_from_table(property_name, &column_name, bindings.get(&table_key), resolver)
        }
        ast::Expr::Identifier(ident) => {
            let column_name = ident.value.clone();
            let binding = single_table.and_then(|key| bindings.get(key));
            bind_from_table(property_name, &column_name, binding, resolver)
        }
        ast::Expr::Cast { expr: inner, data_type, .. } => {
            let (sql_type, max_length, precision, scale) = data_type_to_parts(data_type);
            let mut column = Column::placeholder(property_name, property_name);
            column.sql_type_name = sql_type;
            column.max_length = max_length;
            column.precision = precision;
            column.scale = scale;
            column.is_nullable = matches!(inner.as_ref(), ast::Expr::Value(ast::Value::Null)) || column.is_nullable;
            column
        }
        ast::Expr::Value(ast::Value::Null) => {
            let mut column = Column::placeholder(property_name, property_name);
            column.is_nullable = true;
            column
        }
        ast::Expr::Function(func) => build_function_column(property_name, func, resolver, diagnostics),
        ast::Expr::Subquery(_) => Column::placeholder(property_name, property_name),
        _ => {
            diagnostics.push_warning(format!("unclassified expression for column '{property_name}', using placeholder type"));
            Column::placeholder(property_name, property_name)
        }
    }
}

fn bind_from_table(property_name: &str, column_name: &str, binding: Option<&TableBinding>, resolver: &dyn ResolverContext) -> Column {
    let mut column = Column::placeholder(property_name, property_name);
    let Some(binding) = binding else {
        return column;
    };
    if binding.name.is_empty() {
        return column;
    }
    column.source_schema = binding.schema.clone();
    column.source_table = Some(binding.name.clone());
    column.source_column = Some(column_name.to_string());
    if let Some(info) = resolver.resolve_column(binding.schema.as_deref(), &binding.name, column_name) {
        column.sql_type_name = info.sql_type_name;
        column.max_length = info.max_length;
        column.precision = info.precision;
        column.scale = info.scale;
        column.is_nullable = info.is_nullable;
    }
    column.forced_nullable = binding.forced_nullable;
    if binding.forced_nullable {
        column.is_nullable = true;
    }
    column
}

fn build_function_column(property_name: &str, func: &ast::Function, resolver: &dyn ResolverContext, diagnostics: &mut ParseDiagnostics) -> Column {
    let fn_name = func.name.0.last().map(|i| i.value.to_lowercase()).unwrap_or_default();
    let mut column = Column::placeholder(property_name, property_name);

    if JSON_BUILTINS.contains(&fn_name.as_str()) {
        column.sql_type_name = if fn_name == "json_value" {
            "nvarchar".to_string()
        } else {
            "nvarchar".to_string()
        };
        column.max_length = Some(-1);
        if fn_name == "json_query" {
            if let Some((schema, name)) = nested_scalar_function_call(func) {
                if let Some(info) = resolver.resolve_function_return(schema.as_deref(), &name) {
                    if !info.returns_table {
                        column.deferred_json_expansion = true;
                        column.function_ref = Some(match &schema {
                            Some(s) => format!("{s}.{name}"),
                            None => name.clone(),
                        });
                    }
                }
            }
        }
        return column;
    }

    match resolver.resolve_function_return(None, &fn_name) {
        Some(info) if !info.returns_table => {
            column.sql_type_name = info.sql_type_name;
        }
        _ => {
            diagnostics.push_warning(format!("unresolved function return type for '{fn_name}'"));
        }
    }
    column
}

/// Looks one level into `JSON_QUERY(dbo.SomeFnAsJson(...))`-shaped calls for
/// the inner scalar-function reference.
fn nested_scalar_function_call(func: &ast::Function) -> Option<(Option<String>, String)> {
    let args = match &func.args {
        ast::FunctionArguments::List(list) => &list.args,
        _ => return None,
    };
    for arg in args {
        let expr = match arg {
            ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Expr(e)) => e,
            ast::FunctionArg::Named { arg: ast::FunctionArgExpr::Expr(e), .. } => e,
            _ => continue,
        };
        if let ast::Expr::Function(inner) = expr {
            let parts: Vec<String> = inner.name.0.iter().map(|i| i.to_string()).collect();
            return match parts.as_slice() {
                [name] => Some((None, name.clone())),
                [schema, name] => Some((Some(schema.clone()), name.clone())),
                [_, schema, name] => Some((Some(schema.clone()), name.clone())),
                _ => None,
            };
        }
    }
    None
}

fn data_type_to_parts(data_type: &ast::DataType) -> (String, Option<i32>, Option<u8>, Option<u8>) {
    use ast::{CharacterLength, DataType, ExactNumberInfo};
    match data_type {
        DataType::Decimal(ExactNumberInfo::PrecisionAndScale(p, s)) | DataType::Numeric(ExactNumberInfo::PrecisionAndScale(p, s)) => {
            ("decimal".to_string(), None, Some(*p as u8), Some(*s as u8))
        }
        DataType::Decimal(ExactNumberInfo::Precision(p)) | DataType::Numeric(ExactNumberInfo::Precision(p)) => {
            ("decimal".to_string(), None, Some(*p as u8), Some(0))
        }
        DataType::Varchar(Some(CharacterLength::IntegerLength { length, .. })) => ("varchar".to_string(), Some(*length as i32), None, None),
        DataType::Nvarchar(Some(CharacterLength::IntegerLength { length, .. })) => ("nvarchar".to_string(), Some(*length as i32), None, None),
        DataType::Varchar(_) | DataType::Nvarchar(_) => (data_type.to_string().to_lowercase(), Some(-1), None, None),
        DataType::Int(_) | DataType::Integer(_) => ("int".to_string(), None, None, None),
        DataType::BigInt(_) => ("bigint".to_string(), None, None, None),
        DataType::SmallInt(_) => ("smallint".to_string(), None, None, None),
        DataType::TinyInt(_) => ("tinyint".to_string(), None, None, None),
        DataType::Bit => ("bit".to_string(), None, None, None),
        DataType::Float(_) | DataType::Double(_) | DataType::DoublePrecision => ("float".to_string(), None, None, None),
        DataType::Date => ("date".to_string(), None, None, None),
        DataType::Datetime(_) => ("datetime".to_string(), None, None, None),
        DataType::Uuid => ("uniqueidentifier".to_string(), None, None, None),
        other => (other.to_string().to_lowercase(), None, None, None),
    }
}

/// When a `FOR JSON`-enclosing column alias contains `.`, the remainder is
/// reported as a nested array path if its value expression is itself a
/// `FOR JSON`-emitting subquery.
fn nested_json_path(expr: &ast::Expr, alias: &str) -> Option<String> {
    if !alias.contains('.') {
        return None;
    }
    if let ast::Expr::Subquery(query) = expr {
        let rendered = query.to_string().to_uppercase();
        if rendered.contains("FOR JSON") {
            return Some(alias.to_string());
        }
    }
    None
}

fn build_json_structure(columns: &[Column], array_paths: &[String]) -> Vec<JsonNode> {
    let mut roots: Vec<JsonNode> = Vec::new();
    for column in columns {
        if !column.property_name.contains('.') {
            continue;
        }
        insert_path(&mut roots, &column.property_name, array_paths);
    }
    roots
}

fn insert_path(nodes: &mut Vec<JsonNode>, full_path: &str, array_paths: &[String]) {
    let segments: Vec<&str> = full_path.split('.').collect();
    let mut current = nodes;
    let mut prefix = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            prefix.push('.');
        }
        prefix.push_str(segment);
        let is_last = i == segments.len() - 1;
        let is_array = !is_last && array_paths.iter().any(|p| p == &prefix);
        let pos = current.iter().position(|n| n.path == prefix);
        let idx = match pos {
            Some(idx) => idx,
            None => {
                current.push(JsonNode {
                    path: prefix.clone(),
                    is_array,
                    children: Vec::new(),
                });
                current.len() - 1
            }
        };
        if is_last {
            break;
        }
        current = &mut current[idx].children;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::NullResolver;
    use sqlparser::dialect::MsSqlDialect;
    use sqlparser::parser::Parser;

    fn parse_one(sql: &str) -> ast::Query {
        let stmts = Parser::parse_sql(&MsSqlDialect {}, sql).expect("parses");
        match stmts.into_iter().next().unwrap() {
            ast::Statement::Query(q) => *q,
            other => panic!("expected query, got {other:?}"),
        }
    }

    #[test]
    fn simple_select_produces_columns_in_order() {
        let query = parse_one("SELECT Id, Name FROM Users");
        let mut diagnostics = ParseDiagnostics::default();
        let rs = extract_result_set(&query, None, &NullResolver, 0, &mut diagnostics).unwrap();
        assert_eq!(rs.columns.len(), 2);
        assert_eq!(rs.columns[0].property_name, "Id");
        assert_eq!(rs.columns[1].property_name, "Name");
        assert!(!rs.returns_json);
    }

    #[test]
    fn left_join_forces_nullable_on_joined_side() {
        let query = parse_one("SELECT o.Id, c.Name FROM Orders o LEFT JOIN Customers c ON c.Id = o.CustomerId");
        let mut diagnostics = ParseDiagnostics::default();
        let rs = extract_result_set(&query, None, &NullResolver, 0, &mut diagnostics).unwrap();
        let name_col = rs.columns.iter().find(|c| c.property_name == "Name").unwrap();
        assert!(name_col.forced_nullable);
        assert!(name_col.is_nullable);
    }
}
