pub mod ingest;
pub mod merge;
pub mod types;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::StoreError;
use types::{Collection, SummaryStore};

/// Read a URL-keyed JSON object, validating every entry as `T`.
///
/// File-level problems are returned as errors. Entries that fail to
/// deserialize are logged as schema violations and dropped; their siblings
/// survive.
pub fn read_map<T: DeserializeOwned>(path: &Path) -> Result<BTreeMap<String, T>, StoreError> {
    let bytes = std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::MissingArtifact(path.to_path_buf())
        } else {
            StoreError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    let serde_json::Value::Object(entries) = value else {
        return Err(StoreError::NotAnObject(path.to_path_buf()));
    };

    let mut map = BTreeMap::new();
    for (key, entry) in entries {
        match serde_json::from_value::<T>(entry) {
            Ok(parsed) => {
                map.insert(key, parsed);
            }
            Err(e) => {
                let err = StoreError::SchemaViolation {
                    path: path.to_path_buf(),
                    key,
                    reason: e.to_string(),
                };
                warn!("{}", err);
            }
        }
    }

    debug!(path = %path.display(), entries = map.len(), "artifact loaded");
    Ok(map)
}

/// Like [`read_map`], but any failure yields an empty map and a warning.
pub fn load_or_empty<T: DeserializeOwned>(path: &Path) -> BTreeMap<String, T> {
    match read_map(path) {
        Ok(map) => map,
        Err(StoreError::MissingArtifact(_)) => {
            warn!(path = %path.display(), "artifact not found, starting empty");
            BTreeMap::new()
        }
        Err(e) => {
            warn!("{}; treating as empty", e);
            BTreeMap::new()
        }
    }
}

/// Load a document collection. Each document's `url` is reset to its key.
pub fn load_collection(path: &Path) -> Collection {
    let mut docs: Collection = load_or_empty(path);
    for (url, doc) in docs.iter_mut() {
        if doc.url != *url {
            doc.url = url.clone();
        }
    }
    docs
}

pub fn load_summaries(path: &Path) -> SummaryStore {
    load_or_empty(path)
}

/// Rewrite `path` as pretty JSON. The data goes to a sibling temp file that
/// is then renamed over the target.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = tmp_path(path);
    std::fs::write(&tmp, &bytes).map_err(|source| StoreError::Io {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), size = bytes.len(), "artifact written");
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::types::Document;

    #[test]
    fn test_missing_file_is_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_map::<Document>(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, StoreError::MissingArtifact(_)));
        assert!(load_collection(&dir.path().join("nope.json")).is_empty());
    }

    #[test]
    fn test_malformed_json_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            read_map::<Document>(&path),
            Err(StoreError::Malformed { .. })
        ));
        assert!(load_collection(&path).is_empty());
    }

    #[test]
    fn test_non_object_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.json");
        std::fs::write(&path, r#"[{"link": "https://a"}]"#).unwrap();
        assert!(matches!(
            read_map::<Document>(&path),
            Err(StoreError::NotAnObject(_))
        ));
        assert!(load_collection(&path).is_empty());
    }

    #[test]
    fn test_schema_violation_drops_only_bad_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.json");
        std::fs::write(
            &path,
            r#"{
                "https://good": {"title": "ok", "content": "text"},
                "https://bad": {"title": 42},
                "https://worse": "just a string"
            }"#,
        )
        .unwrap();

        let docs = load_collection(&path);
        assert_eq!(docs.len(), 1);
        let good = &docs["https://good"];
        assert_eq!(good.url, "https://good");
        assert_eq!(good.title, "ok");
    }

    #[test]
    fn test_write_json_creates_parent_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("ioc_index.json");

        let mut map = BTreeMap::new();
        map.insert("b".to_string(), 2);
        map.insert("a".to_string(), 1);
        write_json(&path, &map).unwrap();
        write_json(&path, &map).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"a\": 1,\n  \"b\": 2\n}");
        assert!(!tmp_path(&path).exists());
    }
}
