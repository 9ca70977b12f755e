//! Atomic, content-addressed JSON artifact writes.
//!
//! Every artifact is serialized to a temp file in the target directory,
//! hash-compared against whatever is already on disk, and only renamed into
//! place when the content actually changed -- the "touchless-when-unchanged"
//! property tests in `tests/roundtrip.rs` exercise directly.

use std::fs;
use std::path::Path;

use serde::Serialize;

use xtraq_common::error::{Error, Result};
use xtraq_common::hash::content_hash;

/// Result of one atomic write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// False when the existing file already matched and the write was
    /// skipped entirely.
    pub written: bool,
    pub hash: String,
}

/// Serialize `value` as pretty JSON and write it to `path` iff its content
/// hash differs from what's already there.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<WriteOutcome> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let hash = content_hash(&bytes);

    if let Ok(existing) = fs::read(path) {
        if content_hash(&existing) == hash {
            return Ok(WriteOutcome { written: false, hash });
        }
    }

    let dir = path.parent().ok_or_else(|| {
        Error::ArtifactWrite {
            path: path.display().to_string(),
            detail: "artifact path has no parent directory".to_string(),
        }
    })?;
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".xtraq-tmp-")
        .tempfile_in(dir)
        .map_err(|e| Error::ArtifactWrite {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
    use std::io::Write;
    tmp.write_all(&bytes).map_err(|e| Error::ArtifactWrite {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;
    tmp.persist(path).map_err(|e| Error::ArtifactWrite {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;

    Ok(WriteOutcome { written: true, hash })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_new_file_and_reports_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dbo.GetUsers.json");
        let outcome = atomic_write_json(&path, &json!({"a": 1})).unwrap();
        assert!(outcome.written);
        assert!(path.exists());
    }

    #[test]
    fn identical_content_skips_second_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dbo.GetUsers.json");
        let first = atomic_write_json(&path, &json!({"a": 1})).unwrap();
        let second = atomic_write_json(&path, &json!({"a": 1})).unwrap();
        assert!(first.written);
        assert!(!second.written);
        assert_eq!(first.hash, second.hash);
    }

    #[test]
    fn changed_content_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dbo.GetUsers.json");
        let first = atomic_write_json(&path, &json!({"a": 1})).unwrap();
        let second = atomic_write_json(&path, &json!({"a": 2})).unwrap();
        assert!(second.written);
        assert_ne!(first.hash, second.hash);
    }
}
