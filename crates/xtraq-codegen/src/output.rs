//! Atomic text-artifact writes, mirroring the snapshot writer's
//! touchless-when-unchanged temp-file-then-rename pattern, but for
//! already-rendered source text rather than serialized JSON.

use std::fs;
use std::path::Path;

use xtraq_common::error::{Error, Result};
use xtraq_common::hash::content_hash;

/// Writes `content` to `path` iff its content hash differs from what's
/// already there. Returns `true` when the file was actually (re)written.
pub fn atomic_write_text(path: &Path, content: &str) -> Result<bool> {
    let bytes = content.as_bytes();
    let hash = content_hash(bytes);

    if let Ok(existing) = fs::read(path) {
        if content_hash(&existing) == hash {
            return Ok(false);
        }
    }

    let dir = path.parent().ok_or_else(|| Error::ArtifactWrite {
        path: path.display().to_string(),
        detail: "artifact path has no parent directory".to_string(),
    })?;
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".xtraq-tmp-")
        .tempfile_in(dir)
        .map_err(|e| Error::ArtifactWrite { path: path.display().to_string(), detail: e.to_string() })?;
    use std::io::Write;
    tmp.write_all(bytes).map_err(|e| Error::ArtifactWrite { path: path.display().to_string(), detail: e.to_string() })?;
    tmp.persist(path).map_err(|e| Error::ArtifactWrite { path: path.display().to_string(), detail: e.to_string() })?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Foo.g.cs");
        assert!(atomic_write_text(&path, "class Foo {}").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "class Foo {}");
    }

    #[test]
    fn identical_content_is_touchless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Foo.g.cs");
        assert!(atomic_write_text(&path, "class Foo {}").unwrap());
        assert!(!atomic_write_text(&path, "class Foo {}").unwrap());
    }
}
