//! xtraq command-line library: the binary entry point in `main.rs` is a
//! thin wrapper over these modules.

pub mod cli;
pub mod exit_code;
pub mod logging;
pub mod orchestrator;
