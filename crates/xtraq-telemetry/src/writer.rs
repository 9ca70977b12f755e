//! Writes one `RunTelemetry` document to `<root>/.xtraq/telemetry/<run-id>.json`
//!, temp-file-then-rename like every other artifact in this
//! system so a crash mid-write never leaves a half-written telemetry file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

use xtraq_common::error::{Error, Result};

use crate::model::RunTelemetry;

pub struct TelemetryWriter {
    dir: PathBuf,
}

impl TelemetryWriter {
    pub fn new(root: impl AsRef<Path>) -> Self {
        TelemetryWriter {
            dir: root.as_ref().join(".xtraq").join("telemetry"),
        }
    }

    pub fn write(&self, telemetry: &RunTelemetry) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(telemetry.file_name());
        let bytes = serde_json::to_vec_pretty(telemetry)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".xtraq-telemetry-")
            .tempfile_in(&self.dir)
            .map_err(|e| Error::ArtifactWrite {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;
        tmp.write_all(&bytes).map_err(|e| Error::ArtifactWrite {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        tmp.persist(&path).map_err(|e| Error::ArtifactWrite {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

        if !telemetry.succeeded {
            warn!(run_id = %telemetry.run_id, "run completed with a non-success outcome");
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectCounts;
    use chrono::Utc;
    use xtraq_common::id::RunId;

    fn sample() -> RunTelemetry {
        RunTelemetry {
            run_id: RunId::new(),
            command: "snapshot".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            phases: Vec::new(),
            query_count: 0,
            warm_run: true,
            object_counts: ObjectCounts::default(),
            warnings: Vec::new(),
            succeeded: true,
        }
    }

    #[test]
    fn writes_under_dot_xtraq_telemetry() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TelemetryWriter::new(dir.path());
        let telemetry = sample();
        let path = writer.write(&telemetry).unwrap();
        assert!(path.exists());
        assert!(path.starts_with(dir.path().join(".xtraq").join("telemetry")));
    }

    #[test]
    fn file_name_matches_run_id() {
        let telemetry = sample();
        assert_eq!(telemetry.file_name(), format!("{}.json", telemetry.run_id));
    }
}
