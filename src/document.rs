//! Parsed documents: body text, headers and folder-derived section path.

use std::path::{Component, Path};

use md_meta::{parse_markdown, MetaError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use md_meta::Header;

/// Directory whose descendants form the section path.
pub const DEFAULT_ANCHOR_DIR: &str = "docs";

/// Raw file contents paired with the path they were read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Path the document was loaded from.
    pub path: String,
    /// Unmodified file contents.
    pub content: String,
}

/// Metadata resolved for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Front-matter title, first H1, or `Untitled`.
    pub title: String,
    /// Path the document was loaded from.
    pub source_path: String,
    /// Folder names between the anchor directory and the file.
    pub section_path: Vec<String>,
    /// All headers in the body, ordered by position.
    pub headers: Vec<Header>,
}

/// Document body ready for chunking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Path the document was loaded from.
    pub path: String,
    /// Body with front matter removed; header positions index into it.
    pub content: String,
    /// Resolved metadata.
    pub metadata: DocumentMetadata,
}

/// Errors that make a single document unusable.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The anchor directory does not appear in the document path.
    #[error("{anchor:?} directory not found in path: {path}")]
    MissingAnchor {
        /// Offending document path.
        path: String,
        /// Directory name that was expected.
        anchor: String,
    },
    /// Front matter could not be parsed.
    #[error("failed to read metadata for {path}: {source}")]
    Metadata {
        /// Offending document path.
        path: String,
        /// Underlying parse error.
        #[source]
        source: MetaError,
    },
}

/// Parses a raw document using `anchor` to derive the section path.
pub fn parse_document(raw: &RawDocument, anchor: &str) -> Result<ParsedDocument, DocumentError> {
    let section_path = section_path_for(&raw.path, anchor)?;
    let meta = parse_markdown(&raw.content).map_err(|source| DocumentError::Metadata {
        path: raw.path.clone(),
        source,
    })?;

    Ok(ParsedDocument {
        path: raw.path.clone(),
        content: meta.content,
        metadata: DocumentMetadata {
            title: meta.title,
            source_path: raw.path.clone(),
            section_path,
            headers: meta.headers,
        },
    })
}

/// Returns the directories after the first `anchor` component, excluding the file name.
///
/// `.` segments are dropped and `..` segments are resolved lexically first.
///
/// `docs/concepts/workloads/pods.md` with anchor `docs` yields
/// `["concepts", "workloads"]`.
pub fn section_path_for(path: &str, anchor: &str) -> Result<Vec<String>, DocumentError> {
    let normalized = path.replace('\\', "/");
    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir if parts.last().is_some_and(|last| last != "..") => {
                parts.pop();
            }
            Component::ParentDir => parts.push("..".to_string()),
            _ => {}
        }
    }

    let Some(anchor_idx) = parts.iter().position(|part| part == anchor) else {
        return Err(DocumentError::MissingAnchor {
            path: path.to_string(),
            anchor: anchor.to_string(),
        });
    };

    let mut section_path = parts[anchor_idx + 1..].to_vec();
    section_path.pop();
    Ok(section_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn section_path_skips_anchor_and_file() {
        let path = section_path_for("/repo/docs/concepts/workloads/pods.md", "docs").unwrap();
        assert_eq!(path, vec!["concepts".to_string(), "workloads".to_string()]);
    }

    #[test]
    fn section_path_normalizes_dot_segments_and_backslashes() {
        let path = section_path_for("./docs/./concepts\\pods.md", "docs").unwrap();
        assert_eq!(path, vec!["concepts".to_string()]);
    }

    #[test]
    fn section_path_resolves_parent_segments() {
        let path = section_path_for("docs/concepts/../workloads/pods.md", "docs").unwrap();
        assert_eq!(path, vec!["workloads".to_string()]);

        let path = section_path_for("/repo/docs/a/../b/x.md", "docs").unwrap();
        assert_eq!(path, vec!["b".to_string()]);

        let path = section_path_for("../docs/concepts/pods.md", "docs").unwrap();
        assert_eq!(path, vec!["concepts".to_string()]);

        assert!(section_path_for("docs/../concepts/pods.md", "docs").is_err());
    }

    #[test]
    fn file_directly_under_anchor_has_empty_path() {
        let path = section_path_for("docs/index.md", "docs").unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn missing_anchor_is_fatal() {
        let err = section_path_for("/tmp/notes/pods.md", "docs").unwrap_err();
        assert!(matches!(err, DocumentError::MissingAnchor { .. }));
        assert!(err.to_string().contains("/tmp/notes/pods.md"));
    }

    #[test]
    fn parses_document_metadata() {
        let raw = RawDocument {
            path: "docs/concepts/pods.md".to_string(),
            content: "---\ntitle: Pods\n---\n## Phase\nPending first.".to_string(),
        };
        let doc = parse_document(&raw, DEFAULT_ANCHOR_DIR).unwrap();
        assert_eq!(doc.content, "## Phase\nPending first.");
        assert_eq!(doc.metadata.title, "Pods");
        assert_eq!(doc.metadata.section_path, vec!["concepts".to_string()]);
        assert_eq!(doc.metadata.headers.len(), 1);
        assert_eq!(doc.metadata.headers[0].position, 0);
    }
}
