//! Content-addressing helpers shared by the snapshot writer and reader.

use sha2::{Digest, Sha256};

/// 16 hex characters of SHA-256, used as the short content-hash for artifacts.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let full = hex::encode(hasher.finalize());
    full[..16].to_string()
}

/// Sanitize a schema/object name part for safe use in a file name: strips
/// path separators and characters disallowed on any common file system,
/// falling back to `"artifact"` for an empty result.
pub fn sanitize_name_part(part: &str) -> String {
    let cleaned: String = part
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "artifact".to_string()
    } else {
        cleaned
    }
}

/// Deterministic artifact file name for `(catalog?, schema, name)`.
pub fn artifact_file_name(catalog: Option<&str>, schema: &str, name: &str) -> String {
    let schema = sanitize_name_part(schema);
    let name = sanitize_name_part(name);
    match catalog {
        Some(catalog) => format!("{}.{}.{}.json", sanitize_name_part(catalog), schema, name),
        None => format!("{schema}.{name}.json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_16_hex_chars() {
        let h = content_hash(b"hello world");
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(content_hash(b"same input"), content_hash(b"same input"));
    }

    #[test]
    fn sanitize_strips_path_separators() {
        assert_eq!(sanitize_name_part("../../etc/passwd"), "______etc_passwd");
    }

    #[test]
    fn sanitize_empty_falls_back() {
        assert_eq!(sanitize_name_part(""), "artifact");
        assert_eq!(sanitize_name_part("///"), "artifact");
    }

    #[test]
    fn artifact_file_name_no_catalog() {
        assert_eq!(artifact_file_name(None, "dbo", "GetUsers"), "dbo.GetUsers.json");
    }

    #[test]
    fn artifact_file_name_with_catalog() {
        assert_eq!(
            artifact_file_name(Some("MyDb"), "dbo", "GetUsers"),
            "MyDb.dbo.GetUsers.json"
        );
    }
}
