//! Chunk records shared by ingestion, indexing and retrieval.

use std::borrow::Borrow;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Canonical chunk identifier.
///
/// Identifiers may come back from JSON files or vector payloads as strings or
/// as numbers. Every decode path goes through the same normalization so a
/// lookup never misses because of a type mismatch: strings are trimmed,
/// integral numbers are rendered in decimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    /// Builds an identifier from already-textual input.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    /// Normalizes an identifier decoded from an arbitrary JSON value.
    ///
    /// Returns `None` for null, empty strings and non-scalar values.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        RawChunkId::deserialize(value).ok()?.normalize()
    }

    /// Borrowed string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ChunkId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChunkId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ChunkId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl<'de> Deserialize<'de> for ChunkId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawChunkId::deserialize(deserializer)?
            .normalize()
            .ok_or_else(|| D::Error::custom("chunk id must be a non-empty string or number"))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChunkId {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl RawChunkId {
    fn normalize(self) -> Option<ChunkId> {
        let text = match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Unsigned(value) => value.to_string(),
            Self::Signed(value) => value.to_string(),
            Self::Float(value) if value.is_finite() && value.fract() == 0.0 => {
                format!("{value:.0}")
            }
            Self::Float(value) => value.to_string(),
        };
        (!text.is_empty()).then_some(ChunkId(text))
    }
}

/// Position of a chunk in the parent/child hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// Full level-2 section handed to the generator as context.
    Parent,
    /// Size-bounded slice of a parent that is embedded and searched.
    Child,
}

/// Splitting algorithm that produced a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// Section split on level-2 headers, then greedy sentence packing.
    #[default]
    Recursive,
}

/// Persisted retrievable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Corpus-unique identifier (`<doc>-p<i>` or `<parent>-c<j>`).
    pub id: ChunkId,
    /// Chunk text.
    pub content: String,
    /// Owning parent for child chunks; `None` for parents.
    pub parent_id: Option<ChunkId>,
    /// Path of the source document.
    pub source_file: String,
    /// Folder breadcrumb of the source document.
    pub section_path: Vec<String>,
    /// Parent or child.
    pub kind: ChunkKind,
    /// Splitter tag.
    pub strategy: ChunkStrategy,
}

impl Chunk {
    /// Returns true for parent-kind chunks.
    pub fn is_parent(&self) -> bool {
        self.kind == ChunkKind::Parent
    }

    /// Returns true for child-kind chunks.
    pub fn is_child(&self) -> bool {
        self.kind == ChunkKind::Child
    }
}

/// Parent/child totals for a chunk collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkCounts {
    /// Number of parent chunks.
    pub parents: usize,
    /// Number of child chunks.
    pub children: usize,
}

impl ChunkCounts {
    /// Tallies chunk kinds.
    pub fn of(chunks: &[Chunk]) -> Self {
        chunks.iter().fold(Self::default(), |mut counts, chunk| {
            match chunk.kind {
                ChunkKind::Parent => counts.parents += 1,
                ChunkKind::Child => counts.children += 1,
            }
            counts
        })
    }

    /// Total chunk count.
    pub fn total(&self) -> usize {
        self.parents + self.children
    }
}

/// Errors raised while reading or writing chunk files.
#[derive(Debug, Error)]
pub enum ChunkStoreError {
    /// Filesystem failure.
    #[error("chunk file I/O failed for {path:?}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid chunk array.
    #[error("malformed chunk file {path:?}: {source}")]
    Json {
        /// File being decoded or encoded.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Writes chunks as a pretty-printed JSON array, creating parent directories.
pub fn write_chunks(path: &Path, chunks: &[Chunk]) -> Result<(), ChunkStoreError> {
    let io_err = |source| ChunkStoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, chunks).map_err(|source| ChunkStoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.write_all(b"\n").map_err(io_err)?;
    writer.flush().map_err(io_err)
}

/// Reads a JSON chunk array written by [`write_chunks`].
pub fn read_chunks(path: &Path) -> Result<Vec<Chunk>, ChunkStoreError> {
    let file = File::open(path).map_err(|source| ChunkStoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ChunkStoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn serializes_with_camel_case_fields() {
        let chunk = Chunk {
            id: ChunkId::new("pods-p0-c0"),
            content: "Pods are ephemeral.".to_string(),
            parent_id: Some(ChunkId::new("pods-p0")),
            source_file: "docs/concepts/pods.md".to_string(),
            section_path: vec!["concepts".to_string()],
            kind: ChunkKind::Child,
            strategy: ChunkStrategy::Recursive,
        };
        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "pods-p0-c0",
                "content": "Pods are ephemeral.",
                "parentId": "pods-p0",
                "sourceFile": "docs/concepts/pods.md",
                "sectionPath": ["concepts"],
                "kind": "child",
                "strategy": "recursive"
            })
        );
    }

    #[test]
    fn numeric_ids_normalize_to_decimal_text() {
        let chunk: Chunk = serde_json::from_value(json!({
            "id": 42,
            "content": "x",
            "parentId": null,
            "sourceFile": "a.md",
            "sectionPath": [],
            "kind": "parent",
            "strategy": "recursive"
        }))
        .unwrap();
        assert_eq!(chunk.id.as_str(), "42");
        assert_eq!(chunk.parent_id, None);
        assert!(chunk.is_parent());
    }

    #[test]
    fn from_value_handles_every_scalar_shape() {
        assert_eq!(ChunkId::from_value(&json!(" pods-p1 ")), Some(ChunkId::new("pods-p1")));
        assert_eq!(ChunkId::from_value(&json!(7)), Some(ChunkId::new("7")));
        assert_eq!(ChunkId::from_value(&json!(-3)), Some(ChunkId::new("-3")));
        assert_eq!(ChunkId::from_value(&json!(7.0)), Some(ChunkId::new("7")));
        assert_eq!(ChunkId::from_value(&json!("")), None);
        assert_eq!(ChunkId::from_value(&json!(null)), None);
        assert_eq!(ChunkId::from_value(&json!(["a"])), None);
    }

    #[test]
    fn empty_id_is_rejected_on_load() {
        let result: Result<ChunkId, _> = serde_json::from_value(json!("  "));
        assert!(result.is_err());
    }

    #[test]
    fn counts_kinds() {
        let parent = Chunk {
            id: ChunkId::new("a-p0"),
            content: String::new(),
            parent_id: None,
            source_file: "a.md".to_string(),
            section_path: Vec::new(),
            kind: ChunkKind::Parent,
            strategy: ChunkStrategy::Recursive,
        };
        let child = Chunk {
            id: ChunkId::new("a-p0-c0"),
            parent_id: Some(parent.id.clone()),
            kind: ChunkKind::Child,
            ..parent.clone()
        };
        let counts = ChunkCounts::of(&[parent, child.clone(), child]);
        assert_eq!(counts, ChunkCounts { parents: 1, children: 2 });
        assert_eq!(counts.total(), 3);
    }
}
