//! Generators as traits, not inheritance: each artifact
//! family -- table-type DTOs, per-procedure code, the aggregating context
//! -- is its own struct implementing `Emit` over its own model type,
//! composed by the top-level generator rather than sharing a base class.

pub mod context;
pub mod procedure;
pub mod table_type;

use std::path::PathBuf;

use xtraq_common::error::Result;

/// One rendered artifact: a client-relative output path and its full
/// source text.
pub trait Emit {
    type Model;

    fn target_path(&self, model: &Self::Model) -> PathBuf;

    fn emit(&self, model: &Self::Model) -> Result<String>;
}
