//! Transient per-procedure code model: ties `naming`, `sql_types`,
//! `exec_expansion`, `ordinal`, and `json_model` together into the shape
//! the `emit` implementations consume. Never persisted -- rebuilt fresh
//! from snapshot data on every `build` run.

use std::collections::HashMap;

use xtraq_common::model::ProcedureDescriptor;

use crate::exec_expansion::expand_result_sets;
use crate::json_model::{build_json_tree, FieldNode};
use crate::naming::{input_type_name, per_set_result_type_name, pascal_case_identifier, result_type_name};
use crate::ordinal::{compute_ordinal_fields, OrdinalField};
use crate::sql_types::render_clr_type;

/// Display name given to the result set synthesized from a procedure's
/// `output_fields` when it has no AST-derived `SELECT` of its own.
const SYNTHESIZED_OUTPUT_DISPLAY_NAME: &str = "Output";

#[derive(Debug, Clone)]
pub struct InputField {
    pub property_name: String,
    pub clr_type: String,
    pub sql_param_name: String,
    pub is_output: bool,
}

#[derive(Debug, Clone)]
pub struct ResultSetCodeModel {
    pub display_name: String,
    pub type_name: String,
    pub returns_json: bool,
    pub returns_json_array: bool,
    /// Set when the underlying `SELECT ... FOR JSON` carried a `ROOT('name')`
    /// clause; the emitted deserializer unwraps this property before reading
    /// the value, and its raw text is captured verbatim on the aggregate
    /// result.
    pub json_root_property: Option<String>,
    pub fields: Vec<OrdinalField>,
    pub json_tree: Vec<FieldNode>,
}

#[derive(Debug, Clone)]
pub struct ProcedureCodeModel {
    pub schema: String,
    pub procedure: String,
    pub input_type_name: String,
    pub input_fields: Vec<InputField>,
    /// `<Proc>Result`, the aggregate type wrapping every result set below.
    pub result_type_name: String,
    pub result_sets: Vec<ResultSetCodeModel>,
}

/// Builds the transient code model for one procedure, expanding any EXEC
/// placeholders against the full snapshot's procedure set first.
pub fn build_procedure_code_model(
    descriptor: &ProcedureDescriptor,
    all: &HashMap<String, ProcedureDescriptor>,
) -> ProcedureCodeModel {
    let input_fields = descriptor
        .input_parameters
        .iter()
        .filter(|p| !p.is_table_type)
        .map(|p| InputField {
            property_name: pascal_case_identifier(p.name.trim_start_matches('@')),
            clr_type: render_clr_type(&p.sql_type_name, p.is_nullable),
            sql_param_name: p.name.clone(),
            is_output: p.is_output,
        })
        .collect();

    let expanded = expand_result_sets(descriptor, all);
    let result_sets = if expanded.is_empty() && !descriptor.output_fields.is_empty() {
        // No AST-derived SELECT: the only shape on record is the output
        // column list probed from the live procedure signature. Synthesize
        // a single non-JSON result set from it rather than emitting an
        // extensions class with no accessor at all.
        vec![ResultSetCodeModel {
            display_name: SYNTHESIZED_OUTPUT_DISPLAY_NAME.to_string(),
            type_name: per_set_result_type_name(&descriptor.name, SYNTHESIZED_OUTPUT_DISPLAY_NAME),
            returns_json: false,
            returns_json_array: false,
            json_root_property: None,
            fields: compute_ordinal_fields(&descriptor.output_fields),
            json_tree: Vec::new(),
        }]
    } else {
        expanded
            .into_iter()
            .map(|expanded| {
                let type_name = per_set_result_type_name(&descriptor.name, &expanded.display_name);
                let fields = compute_ordinal_fields(&expanded.result_set.columns);
                let json_tree = if expanded.result_set.returns_json {
                    build_json_tree(&expanded.result_set.columns)
                } else {
                    Vec::new()
                };
                ResultSetCodeModel {
                    display_name: expanded.display_name,
                    type_name,
                    returns_json: expanded.result_set.returns_json,
                    returns_json_array: expanded.result_set.returns_json_array,
                    json_root_property: expanded.result_set.json_root_property,
                    fields,
                    json_tree,
                }
            })
            .collect()
    };

    ProcedureCodeModel {
        schema: descriptor.schema.clone(),
        procedure: descriptor.name.clone(),
        input_type_name: input_type_name(&descriptor.name),
        input_fields,
        result_type_name: result_type_name(&descriptor.name),
        result_sets,
    }
}
