//! On-disk layout shared by the writer and the reader: one subdirectory per
//! artifact family plus a top-level `index.json`.

use std::path::{Path, PathBuf};

pub struct SnapshotLayout {
    root: PathBuf,
}

impl SnapshotLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SnapshotLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    pub fn procedures_dir(&self) -> PathBuf {
        self.root.join("procedures")
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.root.join("tables")
    }

    pub fn table_types_dir(&self) -> PathBuf {
        self.root.join("table_types")
    }

    pub fn user_defined_types_dir(&self) -> PathBuf {
        self.root.join("user_defined_types")
    }

    pub fn functions_dir(&self) -> PathBuf {
        self.root.join("functions")
    }
}
