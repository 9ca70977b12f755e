//! Per-procedure code emission:
//! one extension method per (expanded) result set, returning one record
//! type per set, materialized through ordinal reads or, for `FOR JSON`
//! result sets, a single `JsonSerializer.Deserialize` call against the
//! nested record tree, plus one aggregate extension method and record type
//! wrapping every set for the procedure.

use std::path::PathBuf;

use xtraq_common::error::Result;

use crate::emit::Emit;
use crate::json_model::{nested_record_type_name, FieldNode};
use crate::model::ProcedureCodeModel;
use crate::naming::pascal_case_identifier;
use crate::sql_types::render_clr_type;
use crate::templates::{FileModel, TemplateCoordinator};

pub struct ProcedureEmitter<'a> {
    pub coordinator: &'a TemplateCoordinator,
    pub namespace: String,
}

impl<'a> Emit for ProcedureEmitter<'a> {
    type Model = ProcedureCodeModel;

    fn target_path(&self, model: &Self::Model) -> PathBuf {
        PathBuf::from(format!("{}.g.cs", model.procedure))
    }

    fn emit(&self, model: &Self::Model) -> Result<String> {
        let mut body = String::new();

        if !model.input_fields.is_empty() {
            body.push_str(&format!("    public sealed partial record {}\n    {{\n", model.input_type_name));
            for field in &model.input_fields {
                body.push_str(&format!("        public {} {} {{ get; init; }}\n", field.clr_type, field.property_name));
            }
            body.push_str("    }\n\n");
        }

        for result_set in &model.result_sets {
            if result_set.returns_json {
                render_json_record_tree(&result_set.type_name, &result_set.type_name, &result_set.json_tree, &mut body);
            } else {
                render_flat_record(&result_set.type_name, &result_set.fields, &mut body);
            }
        }
        render_aggregate_record(model, &mut body);

        body.push_str(&format!("    public static partial class {}Extensions\n    {{\n", model.procedure));
        for result_set in &model.result_sets {
            render_method(model, result_set, &mut body);
        }
        render_aggregate_method(model, &mut body);
        if model.result_sets.iter().any(|rs| rs.returns_json) {
            render_json_root_unwrap_helper(&mut body);
        }
        body.push_str("    }\n");

        let file_model = FileModel {
            namespace: self.namespace.clone(),
            usings: vec!["System".to_string(), "System.Collections.Generic".to_string(), "System.Threading.Tasks".to_string()],
            body,
        };
        self.coordinator.render_file("file", &file_model)
    }
}

fn render_flat_record(type_name: &str, fields: &[crate::ordinal::OrdinalField], out: &mut String) {
    out.push_str(&format!("    public sealed partial record {type_name}\n    {{\n"));
    for field in fields {
        out.push_str(&format!("        public {} {} {{ get; init; }}\n", field.clr_type, field.property_name));
    }
    out.push_str("    }\n\n");
}

/// Renders `type_name` and, recursively, every nested record beneath it.
/// `root_stem` is the result set's own type name and never changes across
/// recursion -- each node's `path_segments` is already absolute from the
/// root, so nested names are always derived from `root_stem`, not from the
/// enclosing record's (already-suffixed) name.
fn render_json_record_tree(root_stem: &str, type_name: &str, nodes: &[FieldNode], out: &mut String) {
    out.push_str(&format!("    public sealed partial record {type_name}\n    {{\n"));
    for node in nodes {
        if node.is_leaf() {
            let column = node.column.as_ref().expect("leaf node carries a column");
            let clr_type = render_clr_type(&column.sql_type_name, column.is_nullable);
            out.push_str(&format!("        public {clr_type} {} {{ get; init; }}\n", node.property_name));
        } else {
            let nested_type = nested_record_type_name(root_stem, &node.path_segments);
            out.push_str(&format!("        public {nested_type} {} {{ get; init; }}\n", node.property_name));
        }
    }
    out.push_str("    }\n\n");

    for node in nodes {
        if !node.is_leaf() {
            let nested_type = nested_record_type_name(root_stem, &node.path_segments);
            render_json_record_tree(root_stem, &nested_type, &node.children, out);
        }
    }
}

/// The C# return type of a result set's accessor: a list for row sets and
/// JSON arrays, a nullable scalar for a non-array JSON projection.
fn result_set_return_type(result_set: &crate::model::ResultSetCodeModel) -> String {
    if result_set.returns_json_array {
        format!("IReadOnlyList<{}>", result_set.type_name)
    } else if result_set.returns_json {
        format!("{}?", result_set.type_name)
    } else {
        format!("IReadOnlyList<{}>", result_set.type_name)
    }
}

/// Renders a `json_root_property` as the second argument to `UnwrapJsonRoot`.
fn root_property_argument(root_property: &Option<String>) -> String {
    match root_property {
        Some(name) => format!("\"{name}\""),
        None => "null".to_string(),
    }
}

fn render_method(model: &ProcedureCodeModel, result_set: &crate::model::ResultSetCodeModel, out: &mut String) {
    let method_name = format!("{}{}Async", model.procedure, pascal_case_identifier(&result_set.display_name));
    let return_type = result_set_return_type(result_set);

    out.push_str(&format!("        public static async Task<{return_type}> {method_name}("));
    out.push_str("this Microsoft.Data.SqlClient.SqlConnection connection");
    if !model.input_fields.is_empty() {
        out.push_str(&format!(", {} input", model.input_type_name));
    }
    out.push_str(")\n        {\n");

    if result_set.returns_json {
        out.push_str(&format!(
            "            var json = await connection.ExecuteJsonScalarAsync(\"{}\", BuildParameters(input));\n",
            model.procedure
        ));
        out.push_str(&format!(
            "            var unwrapped = UnwrapJsonRoot(json, {});\n",
            root_property_argument(&result_set.json_root_property)
        ));
        out.push_str(&format!(
            "            return unwrapped is null ? default : System.Text.Json.JsonSerializer.Deserialize<{return_type}>(unwrapped);\n"
        ));
    } else {
        out.push_str(&format!(
            "            var results = new List<{}>();\n",
            result_set.type_name
        ));
        out.push_str(&format!(
            "            await using var reader = await connection.ExecuteReaderAsync(\"{}\", BuildParameters(input));\n",
            model.procedure
        ));
        out.push_str("            while (await reader.ReadAsync())\n            {\n");
        out.push_str(&format!("                results.Add(new {}\n                {{\n", result_set.type_name));
        for field in &result_set.fields {
            out.push_str(&format!("                    {} = {},\n", field.property_name, field.read_expr));
        }
        out.push_str("                });\n            }\n");
        out.push_str("            return results;\n");
    }
    out.push_str("        }\n\n");
}

/// The `<Proc>Result` record wrapping every (expanded) result set under a
/// property named for its display name, with a sibling `<Prop>RawJson`
/// capturing the untouched JSON text for any `FOR JSON` set.
fn render_aggregate_record(model: &ProcedureCodeModel, out: &mut String) {
    out.push_str(&format!("    public sealed partial record {}\n    {{\n", model.result_type_name));
    for result_set in &model.result_sets {
        let property_name = pascal_case_identifier(&result_set.display_name);
        let property_type = result_set_return_type(result_set);
        out.push_str(&format!("        public {property_type} {property_name} {{ get; init; }}\n"));
        if result_set.returns_json {
            out.push_str(&format!("        public string? {property_name}RawJson {{ get; init; }}\n"));
        }
    }
    out.push_str("    }\n\n");
}

/// Fetches every result set and assembles the procedure's aggregate result,
/// capturing raw JSON text ahead of deserialization for `FOR JSON` sets.
fn render_aggregate_method(model: &ProcedureCodeModel, out: &mut String) {
    let method_name = format!("{}Async", model.procedure);
    out.push_str(&format!("        public static async Task<{}> {method_name}(", model.result_type_name));
    out.push_str("this Microsoft.Data.SqlClient.SqlConnection connection");
    if !model.input_fields.is_empty() {
        out.push_str(&format!(", {} input", model.input_type_name));
    }
    out.push_str(")\n        {\n");

    for result_set in &model.result_sets {
        let property_name = pascal_case_identifier(&result_set.display_name);
        let local = property_name.to_lowercase();
        if result_set.returns_json {
            let return_type = result_set_return_type(result_set);
            out.push_str(&format!(
                "            var {local}RawJson = await connection.ExecuteJsonScalarAsync(\"{}\", BuildParameters(input));\n",
                model.procedure
            ));
            out.push_str(&format!(
                "            var {local}Unwrapped = UnwrapJsonRoot({local}RawJson, {});\n",
                root_property_argument(&result_set.json_root_property)
            ));
            out.push_str(&format!(
                "            var {local}Value = {local}Unwrapped is null ? default : System.Text.Json.JsonSerializer.Deserialize<{return_type}>({local}Unwrapped);\n"
            ));
        } else {
            let set_method = format!("{}{}Async", model.procedure, property_name);
            let arg = if model.input_fields.is_empty() { "" } else { "input" };
            out.push_str(&format!("            var {local}Value = await connection.{set_method}({arg});\n"));
        }
    }

    out.push_str(&format!("            return new {}\n            {{\n", model.result_type_name));
    for result_set in &model.result_sets {
        let property_name = pascal_case_identifier(&result_set.display_name);
        let local = property_name.to_lowercase();
        out.push_str(&format!("                {property_name} = {local}Value,\n"));
        if result_set.returns_json {
            out.push_str(&format!("                {property_name}RawJson = {local}RawJson,\n"));
        }
    }
    out.push_str("            };\n");
    out.push_str("        }\n\n");
}

/// Unwraps a `FOR JSON ... ROOT('name')` envelope, returning the inner
/// element's raw text, or the original text unchanged when there is no root
/// property to unwrap.
fn render_json_root_unwrap_helper(out: &mut String) {
    out.push_str("        private static string? UnwrapJsonRoot(string? json, string? rootProperty)\n        {\n");
    out.push_str("            if (json is null)\n            {\n                return null;\n            }\n");
    out.push_str("            if (rootProperty is null)\n            {\n                return json;\n            }\n");
    out.push_str("            using var document = System.Text.Json.JsonDocument.Parse(json);\n");
    out.push_str("            return document.RootElement.TryGetProperty(rootProperty, out var inner) ? inner.GetRawText() : json;\n");
    out.push_str("        }\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InputField, ResultSetCodeModel};
    use crate::ordinal::OrdinalField;

    fn flat_model() -> ProcedureCodeModel {
        ProcedureCodeModel {
            schema: "dbo".to_string(),
            procedure: "GetUsers".to_string(),
            input_type_name: "GetUsersInput".to_string(),
            input_fields: vec![InputField {
                property_name: "ActiveOnly".to_string(),
                clr_type: "bool".to_string(),
                sql_param_name: "@ActiveOnly".to_string(),
                is_output: false,
            }],
            result_type_name: "GetUsersResult".to_string(),
            result_sets: vec![ResultSetCodeModel {
                display_name: "Primary".to_string(),
                type_name: "GetUsersPrimaryResult".to_string(),
                returns_json: false,
                returns_json_array: false,
                json_root_property: None,
                fields: vec![OrdinalField {
                    ordinal: 0,
                    property_name: "Id".to_string(),
                    clr_type: "int".to_string(),
                    is_nullable: false,
                    read_expr: "reader.GetInt32(0)".to_string(),
                }],
                json_tree: Vec::new(),
            }],
        }
    }

    #[test]
    fn emits_flat_record_and_async_method() {
        let coordinator = TemplateCoordinator::new(None);
        let emitter = ProcedureEmitter { coordinator: &coordinator, namespace: "Xtraq.Dbo".to_string() };
        let model = flat_model();

        let rendered = emitter.emit(&model).unwrap();
        assert!(rendered.contains("public sealed partial record GetUsersInput"));
        assert!(rendered.contains("public sealed partial record GetUsersPrimaryResult"));
        assert!(rendered.contains("GetUsersPrimaryAsync"));
        assert!(rendered.contains("Id = reader.GetInt32(0)"));
    }

    #[test]
    fn emits_aggregate_result_wrapping_the_single_set() {
        let coordinator = TemplateCoordinator::new(None);
        let emitter = ProcedureEmitter { coordinator: &coordinator, namespace: "Xtraq.Dbo".to_string() };
        let model = flat_model();

        let rendered = emitter.emit(&model).unwrap();
        assert!(rendered.contains("public sealed partial record GetUsersResult"));
        assert!(rendered.contains("public IReadOnlyList<GetUsersPrimaryResult> Primary { get; init; }"));
        assert!(rendered.contains("Task<GetUsersResult> GetUsersAsync("));
        assert!(rendered.contains("Primary = await connection.GetUsersPrimaryAsync(input);"));
    }

    #[test]
    fn json_result_set_unwraps_root_and_captures_raw_json() {
        let coordinator = TemplateCoordinator::new(None);
        let emitter = ProcedureEmitter { coordinator: &coordinator, namespace: "Xtraq.Dbo".to_string() };
        let model = ProcedureCodeModel {
            schema: "dbo".to_string(),
            procedure: "ListOrders".to_string(),
            input_type_name: "ListOrdersInput".to_string(),
            input_fields: Vec::new(),
            result_type_name: "ListOrdersResult".to_string(),
            result_sets: vec![ResultSetCodeModel {
                display_name: "Orders".to_string(),
                type_name: "ListOrdersOrdersResult".to_string(),
                returns_json: true,
                returns_json_array: true,
                json_root_property: Some("orders".to_string()),
                fields: Vec::new(),
                json_tree: Vec::new(),
            }],
        };

        let rendered = emitter.emit(&model).unwrap();
        assert!(rendered.contains("private static string? UnwrapJsonRoot(string? json, string? rootProperty)"));
        assert!(rendered.contains("var unwrapped = UnwrapJsonRoot(json, \"orders\");"));
        assert!(rendered.contains("public string? OrdersRawJson { get; init; }"));
        assert!(rendered.contains("var ordersRawJson = await connection.ExecuteJsonScalarAsync(\"ListOrders\", BuildParameters(input));"));
        assert!(rendered.contains("var ordersUnwrapped = UnwrapJsonRoot(ordersRawJson, \"orders\");"));
        assert!(rendered.contains("OrdersRawJson = ordersRawJson,"));
    }
}
