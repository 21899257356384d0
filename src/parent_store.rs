//! File-backed parent chunk store.
//!
//! Parents are held in memory keyed by [`ChunkId`] and the whole set is
//! rewritten to a single JSON array on every save. The store is opened once
//! at startup and passed by reference to whoever needs lookups.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::chunk::{read_chunks, write_chunks, Chunk, ChunkId, ChunkStoreError};
use crate::expander::ParentLookup;

/// Default location of the parent store file.
pub const DEFAULT_PARENT_STORE: &str = "data/parents.json";

/// In-memory parent cache with write-through persistence.
#[derive(Debug)]
pub struct ParentStore {
    path: PathBuf,
    parents: BTreeMap<ChunkId, Chunk>,
}

impl ParentStore {
    /// Loads the store at `path`, starting empty when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ChunkStoreError> {
        let path = path.into();
        let mut parents = BTreeMap::new();
        if path.exists() {
            for parent in read_chunks(&path)? {
                parents.insert(parent.id.clone(), parent);
            }
            info!(path = %path.display(), parents = parents.len(), "loaded parent store");
        } else {
            info!(path = %path.display(), "parent store not found, starting fresh");
        }
        Ok(Self { path, parents })
    }

    /// Adds or replaces `parents` and rewrites the backing file.
    pub fn save(&mut self, parents: &[Chunk]) -> Result<(), ChunkStoreError> {
        for parent in parents {
            self.parents.insert(parent.id.clone(), parent.clone());
        }
        let all: Vec<Chunk> = self.parents.values().cloned().collect();
        write_chunks(&self.path, &all)?;
        info!(
            saved = parents.len(),
            total = all.len(),
            path = %self.path.display(),
            "saved parents"
        );
        Ok(())
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored parents.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

impl ParentLookup for ParentStore {
    fn get(&self, id: &ChunkId) -> Option<&Chunk> {
        self.parents.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkKind, ChunkStrategy};
    use pretty_assertions::assert_eq;

    fn parent(id: &str, content: &str) -> Chunk {
        Chunk {
            id: ChunkId::new(id),
            content: content.to_string(),
            parent_id: None,
            source_file: "docs/concepts/pods.md".to_string(),
            section_path: vec!["concepts".to_string()],
            kind: ChunkKind::Parent,
            strategy: ChunkStrategy::Recursive,
        }
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParentStore::open(dir.path().join("parents.json")).unwrap();
        assert!(store.is_empty());
        assert!(store.get(&ChunkId::new("pods-p0")).is_none());
    }

    #[test]
    fn save_writes_through_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/parents.json");
        let mut store = ParentStore::open(&path).unwrap();
        store
            .save(&[parent("pods-p0", "## A\na."), parent("pods-p1", "## B\nb.")])
            .unwrap();
        store.save(&[parent("pods-p0", "## A\nreplaced.")]).unwrap();
        assert_eq!(store.len(), 2);

        let reopened = ParentStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(
            reopened.get(&ChunkId::new("pods-p0")),
            Some(&parent("pods-p0", "## A\nreplaced."))
        );
    }

    #[test]
    fn numeric_ids_on_disk_resolve_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parents.json");
        std::fs::write(
            &path,
            r#"[{"id": 12, "content": "c", "parentId": null, "sourceFile": "a.md",
                "sectionPath": [], "kind": "parent", "strategy": "recursive"}]"#,
        )
        .unwrap();
        let store = ParentStore::open(&path).unwrap();
        let found = store.get_many(&[ChunkId::new("12"), ChunkId::new("12")]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "12");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parents.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = ParentStore::open(&path).unwrap_err();
        assert!(matches!(err, ChunkStoreError::Json { .. }));
    }
}
