//! Run-scoped diagnostics handle.
//!
//! Replaces any global log-level/env-flag state: every component that needs
//! to buffer a non-fatal warning is handed a `Diagnostics` clone explicitly,
//! never reaches for a static.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// A single buffered warning, flushed as a summary at the end of a command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    /// Short machine-stable tag, e.g. `"json-type-miss"`, `"parse-fallback"`,
    /// `"exec-target-missing"`.
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Thread-safe warning buffer, cheaply cloneable (shares the underlying
/// storage), passed down through the snapshot and generation pipelines.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Arc<Mutex<Vec<Warning>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn warn(&self, code: impl Into<String>, message: impl Into<String>) {
        self.warnings.lock().unwrap().push(Warning {
            code: code.into(),
            message: message.into(),
            context: None,
        });
    }

    pub fn warn_with_context(
        &self,
        code: impl Into<String>,
        message: impl Into<String>,
        context: impl Into<String>,
    ) {
        self.warnings.lock().unwrap().push(Warning {
            code: code.into(),
            message: message.into(),
            context: Some(context.into()),
        });
    }

    /// Drain all buffered warnings, leaving the buffer empty.
    pub fn flush(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.warnings.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.warnings.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_drains_and_clears() {
        let diag = Diagnostics::new();
        diag.warn("json-type-miss", "could not resolve Customer.Id");
        diag.warn("exec-target-missing", "audit.Log not found");
        assert_eq!(diag.len(), 2);
        let flushed = diag.flush();
        assert_eq!(flushed.len(), 2);
        assert!(diag.is_empty());
    }

    #[test]
    fn clone_shares_storage() {
        let diag = Diagnostics::new();
        let clone = diag.clone();
        clone.warn("x", "y");
        assert_eq!(diag.len(), 1);
    }
}
