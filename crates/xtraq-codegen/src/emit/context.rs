//! Aggregating context emission:
//! a single partial class exposing one collision-resolved `...Async`
//! method per procedure, forwarding to the per-result-set extension
//! methods `procedure.rs` emits.

use std::path::PathBuf;

use xtraq_common::error::Result;

use crate::emit::Emit;
use crate::templates::{FileModel, TemplateCoordinator};

#[derive(Debug, Clone)]
pub struct ContextProcedureModel {
    /// Collision-resolved public method name (`collision::resolve_context_method_names`).
    pub method_name: String,
    /// The per-result-set extension method this forwards to.
    pub extension_method_name: String,
    pub input_type_name: Option<String>,
    pub return_type: String,
}

#[derive(Debug, Clone)]
pub struct ContextModel {
    pub class_name: String,
    pub procedures: Vec<ContextProcedureModel>,
}

pub struct ContextEmitter<'a> {
    pub coordinator: &'a TemplateCoordinator,
    pub namespace: String,
}

impl<'a> Emit for ContextEmitter<'a> {
    type Model = ContextModel;

    fn target_path(&self, model: &Self::Model) -> PathBuf {
        PathBuf::from(format!("{}.g.cs", model.class_name))
    }

    fn emit(&self, model: &Self::Model) -> Result<String> {
        let mut body = String::new();
        body.push_str(&format!("    public static partial class {}\n    {{\n", model.class_name));
        for procedure in &model.procedures {
            let params = match &procedure.input_type_name {
                Some(input_type) => format!("this Microsoft.Data.SqlClient.SqlConnection connection, {input_type} input"),
                None => "this Microsoft.Data.SqlClient.SqlConnection connection".to_string(),
            };
            let args = if procedure.input_type_name.is_some() { "input" } else { "" };
            body.push_str(&format!(
                "        public static Task<{}> {}({params})\n            => connection.{}({args});\n\n",
                procedure.return_type, procedure.method_name, procedure.extension_method_name
            ));
        }
        body.push_str("    }\n");

        let file_model = FileModel {
            namespace: self.namespace.clone(),
            usings: vec!["System.Threading.Tasks".to_string()],
            body,
        };
        self.coordinator.render_file("file", &file_model)
    }
}
