//! Two-level hierarchical chunking.
//!
//! A document is cut into parent sections at level-2 headers
//! ([`sections`]), each parent is packed into sentence-bounded child
//! fragments ([`fragments`]), and both levels are flattened into uniform
//! [`Chunk`] records: every parent is followed immediately by its children.
//! Output depends only on the document, so re-chunking an unchanged file
//! yields identical ids, contents and order.

pub mod fragments;
pub mod sections;

use tracing::debug;

use crate::chunk::{Chunk, ChunkKind, ChunkStrategy};
use crate::document::ParsedDocument;

pub use fragments::{ChildFragment, FragmentSplitter};
pub use sections::{document_stem, split_sections, ParentSection};

/// Default character ceiling for child fragments.
pub const DEFAULT_CHILD_MAX_CHARS: usize = 200;

/// Chunking tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Character ceiling applied while packing sentences into a child.
    pub child_max_chars: usize,
    /// Strategy tag written onto every chunk.
    pub strategy: ChunkStrategy,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            child_max_chars: DEFAULT_CHILD_MAX_CHARS,
            strategy: ChunkStrategy::Recursive,
        }
    }
}

/// Stateless parent/child chunker.
#[derive(Debug, Clone)]
pub struct HierarchicalChunker {
    config: ChunkerConfig,
    fragments: FragmentSplitter,
}

impl HierarchicalChunker {
    /// Builds a chunker with the provided configuration.
    pub fn new(config: ChunkerConfig) -> Self {
        Self {
            config,
            fragments: FragmentSplitter::new(config.child_max_chars),
        }
    }

    /// Returns the underlying config reference.
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Splits one document into its ordered parent and child chunks.
    pub fn chunk_document(&self, doc: &ParsedDocument) -> Vec<Chunk> {
        let parents = split_sections(doc);
        let children: Vec<Vec<ChildFragment>> = parents
            .iter()
            .map(|parent| self.fragments.split(parent))
            .collect();
        let chunks = assemble_chunks(doc, &parents, &children, self.config.strategy);
        debug!(
            path = %doc.path,
            parents = parents.len(),
            chunks = chunks.len(),
            "chunked document"
        );
        chunks
    }
}

impl Default for HierarchicalChunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

/// Flattens parents and their fragments into chunk records.
///
/// `fragments_per_parent[i]` holds the children of `parents[i]`; a parent
/// without an entry is emitted with no children.
pub fn assemble_chunks(
    doc: &ParsedDocument,
    parents: &[ParentSection],
    fragments_per_parent: &[Vec<ChildFragment>],
    strategy: ChunkStrategy,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for (idx, parent) in parents.iter().enumerate() {
        chunks.push(Chunk {
            id: parent.id.clone(),
            content: parent.content.clone(),
            parent_id: None,
            source_file: doc.path.clone(),
            section_path: doc.metadata.section_path.clone(),
            kind: ChunkKind::Parent,
            strategy,
        });

        let children = fragments_per_parent
            .get(idx)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for child in children {
            chunks.push(Chunk {
                id: child.id.clone(),
                content: child.content.clone(),
                parent_id: Some(child.parent_id.clone()),
                source_file: doc.path.clone(),
                section_path: doc.metadata.section_path.clone(),
                kind: ChunkKind::Child,
                strategy,
            });
        }
    }
    chunks
}
