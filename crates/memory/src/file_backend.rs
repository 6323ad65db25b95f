//! File persistence for the memory store as one pretty-printed JSON document.
//!
//! The whole tree is written and read in one go; there is no partial
//! persistence. Where the file lives is up to the caller.

use llmpu_core::error::{Error, MemoryError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::store::MemoryStore;

impl MemoryStore {
    /// Load a store from `path`.
    ///
    /// A missing file is not an error: it yields an empty store and an info
    /// notice. A file that exists but does not parse is an error.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Memory file not found, starting empty");
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(MemoryError::Storage(format!(
                    "Failed to read memory file {}: {e}",
                    path.display()
                ))
                .into());
            }
        };

        let store: Self = serde_json::from_str(&content)?;
        info!(path = %path.display(), leaves = store.leaf_paths().len(), "Loaded memory");
        Ok(store)
    }

    /// Write the whole store to `path`.
    ///
    /// The document goes to a sibling temporary file first and is renamed
    /// into place, so readers only ever see a complete file.
    pub fn save_to(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        std::fs::write(&tmp_path, json)
            .map_err(|e| MemoryError::Storage(format!("Failed to write memory file: {e}")))?;
        std::fs::rename(&tmp_path, path)
            .map_err(|e| MemoryError::Storage(format!("Failed to replace memory file: {e}")))?;

        debug!(path = %path.display(), "Saved memory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::MemoryPath;
    use llmpu_core::Turn;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");

        let mut store = MemoryStore::new();
        store.push(&"chat".into(), [Turn::user("hi"), Turn::assistant("hello")]).unwrap();
        store.push(&"archive/2024/0".into(), [Turn::system("be brief")]).unwrap();
        store.push(&"archive/empty".into(), Vec::<Turn>::new()).unwrap();

        store.save_to(&path).unwrap();
        let loaded = MemoryStore::load_from(&path).unwrap();

        assert_eq!(loaded, store);
        assert_eq!(
            loaded.leaf(&MemoryPath::from("archive/empty")).unwrap(),
            &[] as &[Turn]
        );
    }

    #[test]
    fn empty_interior_node_roundtrips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");

        let mut store = MemoryStore::new();
        store.push(&"a/x".into(), [Turn::user("gone")]).unwrap();
        store.clear(&"a/x".into()).unwrap();

        store.save_to(&path).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "a": {} }));

        let loaded = MemoryStore::load_from(&path).unwrap();
        assert_eq!(loaded, store);
        assert!(loaded.leaf_paths().is_empty());
        assert!(matches!(
            loaded.leaf(&"a".into()),
            Err(MemoryError::InvalidLocation { .. })
        ));
    }

    #[test]
    fn varied_depths_and_lengths_roundtrip() {
        let cases: &[&[(&str, usize)]] = &[
            &[("only", 0)],
            &[("only", 1)],
            &[("a/b/c/d/e", 3)],
            &[("chat", 2), ("chat2", 0), ("x/y", 5)],
            &[("a/0", 1), ("a/1", 2), ("a/10", 0), ("a/b/c", 4)],
            &[("deep/er/and/deeper/still", 7), ("deep/sibling", 1)],
        ];

        let dir = TempDir::new().unwrap();
        for (i, leaves) in cases.iter().enumerate() {
            let mut store = MemoryStore::new();
            for (path, len) in leaves.iter() {
                let turns: Vec<Turn> = (0..*len)
                    .map(|n| {
                        if n % 2 == 0 {
                            Turn::user(format!("{path} #{n}"))
                        } else {
                            Turn::assistant(format!("{path} #{n}"))
                        }
                    })
                    .collect();
                store.push(&MemoryPath::from(*path), turns).unwrap();
            }

            let file = dir.path().join(format!("case{i}.json"));
            store.save_to(&file).unwrap();
            let loaded = MemoryStore::load_from(&file).unwrap();

            assert_eq!(loaded, store, "case {i} did not round-trip");
            for (path, len) in leaves.iter() {
                assert_eq!(
                    loaded.leaf(&MemoryPath::from(*path)).unwrap().len(),
                    *len,
                    "case {i}: {path}"
                );
            }
        }
    }

    #[test]
    fn empty_store_roundtrips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");

        MemoryStore::new().save_to(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), "{}");
        assert!(MemoryStore::load_from(&path).unwrap().is_empty());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("memory.json");

        let mut store = MemoryStore::new();
        store.push(&"a".into(), [Turn::user("x")]).unwrap();
        store.save_to(&path).unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("nested/deeper/memory.json.tmp").exists());
    }

    #[test]
    fn handles_missing_file_gracefully() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::load_from(&dir.path().join("nope.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "this is not json").unwrap();

        let err = MemoryStore::load_from(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn turn_outside_a_sequence_is_rejected() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, r#"{{"chat": {{"role": "user", "content": "hi"}}}}"#).unwrap();

        assert!(MemoryStore::load_from(tmp.path()).is_err());
    }

    #[test]
    fn reads_hand_written_documents() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            r#"{{"ChatTranscript0": [
                {{"role": "user", "content": "hi"}},
                {{"role": "assistant", "content": "hello"}}
            ]}}"#
        )
        .unwrap();

        let store = MemoryStore::load_from(tmp.path()).unwrap();
        let turns = store.leaf(&"ChatTranscript0".into()).unwrap();
        assert_eq!(turns, [Turn::user("hi"), Turn::assistant("hello")]);
    }
}
