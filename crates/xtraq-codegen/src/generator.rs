//! Top-level orchestrator: emits the three artifact families, normalizes
//! whitespace, and tracks optional-emission idempotence.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use xtraq_common::error::Result;
use xtraq_common::model::{ProcedureDescriptor, TableTypeInfo};

use crate::collision::resolve_context_method_names;
use crate::emit::context::{ContextEmitter, ContextModel, ContextProcedureModel};
use crate::emit::procedure::ProcedureEmitter;
use crate::emit::table_type::TableTypeEmitter;
use crate::emit::Emit;
use crate::model::build_procedure_code_model;
use crate::naming::pascal_case_identifier;
use crate::templates::TemplateCoordinator;
use crate::whitespace::normalize_whitespace;

const OPTIONAL_MANIFEST_FILE: &str = ".xtraq-optional-manifest.json";

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub output_dir: PathBuf,
    pub namespace: String,
    pub enable_minimal_api_extensions: bool,
    pub enable_entity_framework_integration: bool,
    pub template_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationSummary {
    pub written: usize,
    pub unchanged: usize,
    pub deleted_optional: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OptionalManifest {
    files: Vec<String>,
}

pub struct CodeGenerator {
    coordinator: TemplateCoordinator,
    options: GeneratorOptions,
}

impl CodeGenerator {
    pub fn new(options: GeneratorOptions) -> Self {
        let coordinator = TemplateCoordinator::new(options.template_root.clone());
        CodeGenerator { coordinator, options }
    }

    pub fn generate(
        &self,
        procedures: &[ProcedureDescriptor],
        table_types: &[TableTypeInfo],
    ) -> Result<GenerationSummary> {
        let mut summary = GenerationSummary::default();

        let all: HashMap<String, ProcedureDescriptor> = procedures
            .iter()
            .map(|p| (format!("{}.{}", p.schema.to_lowercase(), p.name.to_lowercase()), p.clone()))
            .collect();

        let table_type_emitter = TableTypeEmitter { coordinator: &self.coordinator, namespace: self.options.namespace.clone() };
        for table_type in table_types {
            let rendered = normalize_whitespace(&table_type_emitter.emit(table_type)?);
            self.write_required(&table_type_emitter.target_path(table_type), &rendered, &mut summary)?;
        }

        let procedure_emitter = ProcedureEmitter { coordinator: &self.coordinator, namespace: self.options.namespace.clone() };
        let mut code_models = Vec::with_capacity(procedures.len());
        for descriptor in procedures {
            let model = build_procedure_code_model(descriptor, &all);
            let rendered = normalize_whitespace(&procedure_emitter.emit(&model)?);
            self.write_required(&procedure_emitter.target_path(&model), &rendered, &mut summary)?;
            code_models.push(model);
        }

        self.emit_context(&code_models, &mut summary)?;
        self.reconcile_optional_emissions(&code_models, &mut summary)?;

        Ok(summary)
    }

    fn emit_context(&self, code_models: &[crate::model::ProcedureCodeModel], summary: &mut GenerationSummary) -> Result<()> {
        let pairs: Vec<(&str, &str)> = code_models.iter().map(|m| (m.schema.as_str(), m.procedure.as_str())).collect();
        let resolved = resolve_context_method_names(pairs);

        let procedures = code_models
            .iter()
            .zip(resolved)
            .flat_map(|(model, resolved)| {
                model.result_sets.iter().map(move |result_set| {
                    let extension_method_name = format!("{}{}Async", model.procedure, pascal_case_identifier(&result_set.display_name));
                    let return_type = if result_set.returns_json && !result_set.returns_json_array {
                        format!("{}?", result_set.type_name)
                    } else {
                        format!("IReadOnlyList<{}>", result_set.type_name)
                    };
                    let method_name = if model.result_sets.len() == 1 {
                        resolved.method_name.clone()
                    } else {
                        format!(
                            "{}{}Async",
                            resolved.method_name.trim_end_matches("Async"),
                            pascal_case_identifier(&result_set.display_name)
                        )
                    };
                    ContextProcedureModel {
                        method_name,
                        extension_method_name,
                        input_type_name: if model.input_fields.is_empty() { None } else { Some(model.input_type_name.clone()) },
                        return_type,
                    }
                })
            })
            .collect();

        let model = ContextModel { class_name: "XtraqQueries".to_string(), procedures };
        let context_emitter = ContextEmitter { coordinator: &self.coordinator, namespace: self.options.namespace.clone() };
        let rendered = normalize_whitespace(&context_emitter.emit(&model)?);
        self.write_required(&context_emitter.target_path(&model), &rendered, summary)
    }

    fn write_required(&self, relative: &Path, content: &str, summary: &mut GenerationSummary) -> Result<()> {
        let path = self.options.output_dir.join(relative);
        let outcome = crate::output::atomic_write_text(&path, content)?;
        if outcome {
            summary.written += 1;
        } else {
            summary.unchanged += 1;
        }
        Ok(())
    }

    fn reconcile_optional_emissions(&self, code_models: &[crate::model::ProcedureCodeModel], summary: &mut GenerationSummary) -> Result<()> {
        let manifest_path = self.options.output_dir.join(OPTIONAL_MANIFEST_FILE);
        let previous: OptionalManifest = fs::read(&manifest_path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();

        let mut desired: HashSet<String> = HashSet::new();
        if self.options.enable_minimal_api_extensions {
            let relative = "MinimalApiExtensions.g.cs";
            let content = normalize_whitespace(&render_minimal_api_extensions(&self.options.namespace, code_models));
            self.write_required(Path::new(relative), &content, summary)?;
            desired.insert(relative.to_string());
        }
        if self.options.enable_entity_framework_integration {
            let relative = "EntityFrameworkRegistration.g.cs";
            let content = normalize_whitespace(&render_ef_registration(&self.options.namespace, code_models));
            self.write_required(Path::new(relative), &content, summary)?;
            desired.insert(relative.to_string());
        }

        for stale in previous.files.iter().filter(|f| !desired.contains(f.as_str())) {
            let path = self.options.output_dir.join(stale);
            if path.exists() {
                fs::remove_file(&path)?;
                summary.deleted_optional += 1;
                info!(path = %path.display(), "removed optional artifact disabled by config");
            }
        }

        let mut files: Vec<String> = desired.into_iter().collect();
        files.sort();
        let manifest = OptionalManifest { files };
        xtraq_snapshot::atomic_write_json(&manifest_path, &manifest)?;
        Ok(())
    }
}

fn render_minimal_api_extensions(namespace: &str, code_models: &[crate::model::ProcedureCodeModel]) -> String {
    let mut body = String::new();
    body.push_str("    public static partial class XtraqMinimalApiExtensions\n    {\n");
    body.push_str("        public static void MapXtraqEndpoints(this Microsoft.AspNetCore.Routing.IEndpointRouteBuilder app)\n        {\n");
    for model in code_models {
        if let Some(result_set) = model.result_sets.first() {
            let route = format!("/{}/{}", model.schema.to_lowercase(), model.procedure.to_lowercase());
            let extension_method_name = format!("{}{}Async", model.procedure, pascal_case_identifier(&result_set.display_name));
            body.push_str(&format!(
                "            app.MapGet(\"{route}\", (Microsoft.Data.SqlClient.SqlConnection connection) => connection.{extension_method_name}());\n"
            ));
        }
    }
    body.push_str("        }\n    }\n");
    format!("// <auto-generated/>\n#nullable enable\n\nnamespace {namespace}\n{{\n{body}\n}}\n")
}

fn render_ef_registration(namespace: &str, code_models: &[crate::model::ProcedureCodeModel]) -> String {
    let mut body = String::new();
    body.push_str("    public static partial class XtraqEntityFrameworkRegistration\n    {\n");
    body.push_str("        public static void ConfigureXtraqResultTypes(this Microsoft.EntityFrameworkCore.ModelBuilder builder)\n        {\n");
    for model in code_models {
        for result_set in &model.result_sets {
            body.push_str(&format!("            builder.Entity<{}>().HasNoKey();\n", result_set.type_name));
        }
    }
    body.push_str("        }\n    }\n");
    format!("// <auto-generated/>\n#nullable enable\n\nnamespace {namespace}\n{{\n{body}\n}}\n")
}
