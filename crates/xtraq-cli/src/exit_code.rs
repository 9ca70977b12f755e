//! Process exit codes for the `xtraq` binary.
//!
//! Ranges mirror the error-kind grouping the orchestrator reports: a narrow
//! operational band below 10, then one code per error class so automation
//! can branch without parsing stderr.

use xtraq_common::error::{Error, ErrorCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Cancelled = 5,
    ConfigError = 10,
    DatabaseError = 11,
    GenerationError = 12,
    IoError = 13,
    InternalError = 20,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Database => ExitCode::DatabaseError,
            ErrorCategory::Parse | ErrorCategory::Resolution => ExitCode::GenerationError,
            ErrorCategory::Io => ExitCode::IoError,
            ErrorCategory::Contract => ExitCode::InternalError,
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_maps_to_10() {
        let err = Error::MissingConfig("OutputDir".to_string());
        assert_eq!(ExitCode::from(&err), ExitCode::ConfigError);
    }

    #[test]
    fn contract_error_maps_to_internal() {
        let err = Error::Contract("duplicate result set name".to_string());
        assert_eq!(ExitCode::from(&err), ExitCode::InternalError);
    }
}
