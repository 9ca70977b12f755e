//! xtraq configuration loading, resolution, and validation.
//!
//! Layered resolution order and the full set of recognized keys are
//! documented on [`resolve::load_config`] and [`model::Config`].

pub mod model;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use model::{Config, JsonTypeLogLevel};
pub use resolve::{load_config, ConfigOverrides};
pub use snapshot::{ConfigSnapshot, ConfigSource};
pub use validate::{validate, ConfigPurpose};
