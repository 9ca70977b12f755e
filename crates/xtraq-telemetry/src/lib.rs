//! Per-run telemetry: a single JSON document per `snapshot`/`build`
//! invocation -- one document, not a batched table store.

pub mod model;
pub mod timer;
pub mod writer;

pub use model::{ObjectCounts, PhaseTiming, RunTelemetry};
pub use timer::PhaseTimer;
pub use writer::TelemetryWriter;
