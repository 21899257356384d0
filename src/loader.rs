//! Recursive Markdown loader.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::document::RawDocument;

/// Errors raised while collecting source documents.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The directory tree could not be traversed.
    #[error("failed to walk {root:?}: {source}")]
    Walk {
        /// Root being walked.
        root: PathBuf,
        /// Underlying error.
        #[source]
        source: walkdir::Error,
    },
    /// A Markdown file could not be read as UTF-8 text.
    #[error("failed to read {path:?}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Loads every `.md` file under `root`, sorted by path.
pub fn load_documents(root: &Path) -> Result<Vec<RawDocument>, LoaderError> {
    let mut documents = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| LoaderError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() || !is_markdown(entry.path()) {
            continue;
        }
        let path = entry.path();
        let content = fs::read_to_string(path).map_err(|source| LoaderError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = content.len(), "loaded document");
        documents.push(RawDocument {
            path: path.to_string_lossy().into_owned(),
            content,
        });
    }
    documents.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(documents)
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "md")
}
