//! Unified error type for xtraq.
//!
//! Errors are grouped into six kinds. Each carries a stable numeric code so
//! automation can branch on `Error::code()` without string-matching
//! messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error categories, one per recovery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Config,
    Database,
    Parse,
    Resolution,
    Io,
    Contract,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Config => "config",
            ErrorCategory::Database => "database",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Resolution => "resolution",
            ErrorCategory::Io => "io",
            ErrorCategory::Contract => "contract",
        };
        write!(f, "{s}")
    }
}

/// Unified error type for xtraq.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19) -- never retried, operator must fix.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing required configuration key: {0}")]
    MissingConfig(String),

    // Database errors (20-29) -- retried only for connection-open faults.
    #[error("database connection failed: {0}")]
    Connection(String),

    #[error("database query failed: {0}")]
    Query(String),

    #[error("database authentication failed: {0}")]
    Authentication(String),

    // Parse errors (30-39) -- never fatal; analyzer falls back to lexical mode.
    #[error("procedure body parse failed for {schema}.{name}: {detail}")]
    Parse {
        schema: String,
        name: String,
        detail: String,
    },

    // Resolution errors (40-49) -- non-fatal; column keeps a placeholder type.
    #[error("unresolved type reference: {0}")]
    UnresolvedType(String),

    // I/O errors (50-59) -- current command aborts with non-zero exit.
    #[error("artifact write failed at {path}: {detail}")]
    ArtifactWrite { path: String, detail: String },

    #[error("artifact read failed at {path}: {detail}")]
    ArtifactRead { path: String, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    // Contract errors (60-69) -- impossible invariant violations; must terminate.
    #[error("contract violation: {0}")]
    Contract(String),
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::MissingConfig(_) => ErrorCategory::Config,
            Error::Connection(_) | Error::Query(_) | Error::Authentication(_) => {
                ErrorCategory::Database
            }
            Error::Parse { .. } => ErrorCategory::Parse,
            Error::UnresolvedType(_) => ErrorCategory::Resolution,
            Error::ArtifactWrite { .. } | Error::ArtifactRead { .. } | Error::Io(_) => {
                ErrorCategory::Io
            }
            Error::Json(_) => ErrorCategory::Io,
            Error::Contract(_) => ErrorCategory::Contract,
        }
    }

    /// Stable numeric code for automation, grouped by category range.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::MissingConfig(_) => 11,
            Error::Connection(_) => 20,
            Error::Query(_) => 21,
            Error::Authentication(_) => 22,
            Error::Parse { .. } => 30,
            Error::UnresolvedType(_) => 40,
            Error::ArtifactWrite { .. } => 50,
            Error::ArtifactRead { .. } => 51,
            Error::Io(_) => 52,
            Error::Json(_) => 53,
            Error::Contract(_) => 60,
        }
    }

    /// Whether a transient retry is ever appropriate for this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

/// Final outcome of a top-level command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecuteResult {
    Succeeded,
    Error { code: u32, category: ErrorCategory, message: String },
    Cancelled,
}

impl From<&Error> for ExecuteResult {
    fn from(err: &Error) -> Self {
        ExecuteResult::Error {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
        }
    }
}
