//! Snapshot phase: reads live SQL Server metadata, persists it as
//! content-addressed JSON, and reads it back for the build phase.

pub mod atomic;
pub mod builder;
pub mod catalog_build;
pub mod dependency_graph;
pub mod layout;
pub mod reader;
pub mod resolver_adapter;

pub use atomic::{atomic_write_json, WriteOutcome};
pub use builder::{BuildOptions, BuildSummary, SnapshotWriter};
pub use dependency_graph::RequiredRefs;
pub use layout::SnapshotLayout;
pub use reader::SchemaMetadataProvider;
pub use resolver_adapter::CatalogResolver;
