pub mod collision;
pub mod emit;
pub mod exec_expansion;
pub mod generator;
pub mod json_model;
pub mod model;
pub mod naming;
pub mod ordinal;
pub mod output;
pub mod sql_types;
pub mod templates;
pub mod whitespace;

pub use generator::{CodeGenerator, GenerationSummary, GeneratorOptions};
pub use model::{build_procedure_code_model, ProcedureCodeModel};
pub use templates::TemplateCoordinator;
