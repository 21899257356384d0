//! Load, parse and chunk a Markdown tree into a persisted chunk file.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::chunk::{write_chunks, Chunk, ChunkCounts, ChunkStoreError};
use crate::chunker::HierarchicalChunker;
use crate::document::{parse_document, DocumentError, RawDocument};
use crate::loader::{load_documents, LoaderError};

/// File name written into the output directory.
pub const CHUNKS_FILE: &str = "chunks.json";

/// Failures that stop an ingest run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Source tree could not be read.
    #[error(transparent)]
    Load(#[from] LoaderError),
    /// A document could not be parsed.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// The chunk file could not be written.
    #[error(transparent)]
    Store(#[from] ChunkStoreError),
}

/// Totals reported after an ingest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    /// Markdown files read.
    pub documents: usize,
    /// Parent and child totals.
    pub counts: ChunkCounts,
    /// Where the chunk file was written.
    pub output: PathBuf,
}

/// Chunks every document in order, failing on the first unparsable one.
pub fn chunk_documents(
    documents: &[RawDocument],
    anchor: &str,
    chunker: &HierarchicalChunker,
) -> Result<Vec<Chunk>, DocumentError> {
    let mut chunks = Vec::new();
    for raw in documents {
        let parsed = parse_document(raw, anchor)?;
        chunks.extend(chunker.chunk_document(&parsed));
    }
    Ok(chunks)
}

/// Reads `source`, chunks it and writes `<output_dir>/chunks.json`.
pub fn run_ingest(
    source: &Path,
    output_dir: &Path,
    anchor: &str,
    chunker: &HierarchicalChunker,
) -> Result<IngestSummary, IngestError> {
    let documents = load_documents(source)?;
    info!(source = %source.display(), documents = documents.len(), "loaded markdown files");

    let chunks = chunk_documents(&documents, anchor, chunker)?;
    let output = output_dir.join(CHUNKS_FILE);
    write_chunks(&output, &chunks)?;

    let counts = ChunkCounts::of(&chunks);
    info!(
        chunks = counts.total(),
        parents = counts.parents,
        children = counts.children,
        output = %output.display(),
        "wrote chunk file"
    );
    Ok(IngestSummary {
        documents: documents.len(),
        counts,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::read_chunks;
    use std::fs;

    #[test]
    fn writes_chunk_file_for_tree() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs/concepts");
        fs::create_dir_all(&docs).unwrap();
        fs::write(
            docs.join("pods.md"),
            "---\ntitle: Pods\n---\n# Pods\n## Phase\nPending. Running.\n## Probes\nLiveness.",
        )
        .unwrap();
        let out = dir.path().join("out");

        let summary = run_ingest(
            &dir.path().join("docs"),
            &out,
            "docs",
            &HierarchicalChunker::default(),
        )
        .unwrap();
        assert_eq!(summary.documents, 1);
        assert_eq!(summary.counts, ChunkCounts { parents: 2, children: 2 });

        let chunks = read_chunks(&out.join(CHUNKS_FILE)).unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].id.as_str(), "pods-p0");
        assert_eq!(chunks[0].section_path, vec!["concepts".to_string()]);
    }

    #[test]
    fn document_outside_anchor_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes");
        fs::create_dir_all(&notes).unwrap();
        fs::write(notes.join("a.md"), "## A\nx.").unwrap();

        let chunker = HierarchicalChunker::default();
        let err = run_ingest(&notes, &dir.path().join("out"), "docs", &chunker).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Document(DocumentError::MissingAnchor { .. })
        ));
    }
}
