//! Schema metadata provider: the read side of the snapshot contract
//!. Reconstructs `ProcedureDescriptor`s and schema objects
//! straight from persisted JSON, with no re-derivation of type rules --
//! whatever the writer resolved is what a warm build sees.

use xtraq_common::error::{Error, Result};
use xtraq_common::model::{
    FunctionJsonDescriptor, ProcedureDescriptor, ProcedureIndexEntry, SnapshotIndex, TableInfo, TableTypeInfo,
    UserDefinedTypeInfo,
};

use crate::layout::SnapshotLayout;

pub struct SchemaMetadataProvider {
    layout: SnapshotLayout,
}

impl SchemaMetadataProvider {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        SchemaMetadataProvider {
            layout: SnapshotLayout::new(root),
        }
    }

    pub fn load_index(&self) -> Result<SnapshotIndex> {
        read_json(&self.layout.index_path())
    }

    /// Hydrates every procedure listed in `index`, including ones untouched
    /// by the current run.
    pub fn load_all_procedures(&self, index: &SnapshotIndex) -> Result<Vec<ProcedureDescriptor>> {
        index.procedures.iter().map(|e| self.load_procedure(e)).collect()
    }

    pub fn load_procedure(&self, entry: &ProcedureIndexEntry) -> Result<ProcedureDescriptor> {
        read_json(&self.layout.procedures_dir().join(&entry.file))
    }

    pub fn find_procedure(&self, index: &SnapshotIndex, schema: &str, name: &str) -> Result<Option<ProcedureDescriptor>> {
        match index
            .procedures
            .iter()
            .find(|e| e.schema.eq_ignore_ascii_case(schema) && e.name.eq_ignore_ascii_case(name))
        {
            Some(entry) => Ok(Some(self.load_procedure(entry)?)),
            None => Ok(None),
        }
    }

    pub fn load_table(&self, file: &str) -> Result<TableInfo> {
        read_json(&self.layout.tables_dir().join(file))
    }

    pub fn load_table_type(&self, file: &str) -> Result<TableTypeInfo> {
        read_json(&self.layout.table_types_dir().join(file))
    }

    pub fn load_user_defined_type(&self, file: &str) -> Result<UserDefinedTypeInfo> {
        read_json(&self.layout.user_defined_types_dir().join(file))
    }

    pub fn load_function_json(&self, file: &str) -> Result<FunctionJsonDescriptor> {
        read_json(&self.layout.functions_dir().join(file))
    }

    /// `tryGetFunctionJsonDescriptor(schema, name)`, used by
    /// the generator to expand `JSON_QUERY(fn(...))`-style deferred columns
    /// without re-parsing the function's body.
    pub fn try_get_function_json_descriptor(
        &self,
        index: &SnapshotIndex,
        schema: &str,
        name: &str,
    ) -> Result<Option<FunctionJsonDescriptor>> {
        for file in &index.functions {
            let descriptor = self.load_function_json(file)?;
            if descriptor.schema.eq_ignore_ascii_case(schema) && descriptor.name.eq_ignore_ascii_case(name) {
                return Ok(Some(descriptor));
            }
        }
        Ok(None)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<T> {
    let bytes = std::fs::read(path).map_err(|e| Error::ArtifactRead {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtraq_common::hash::artifact_file_name;
    use xtraq_common::model::{ParserVersions, SnapshotStats};

    #[test]
    fn missing_function_json_lookup_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SchemaMetadataProvider::new(dir.path());
        let index = SnapshotIndex {
            schema_version: "1.0.0".to_string(),
            fingerprint: String::new(),
            parser: ParserVersions { tool_version: "0".to_string(), parser_version: "0".to_string() },
            stats: SnapshotStats::default(),
            procedures: Vec::new(),
            table_types: Vec::new(),
            user_defined_types: Vec::new(),
            tables: Vec::new(),
            functions: vec![artifact_file_name(None, "dbo", "NotThere")],
        };
        let result = provider.try_get_function_json_descriptor(&index, "dbo", "NotThere");
        assert!(result.is_err());
    }
}
