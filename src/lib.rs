#![warn(missing_docs)]
//! Core library for the documind retrieval pipeline.
//!
//! Markdown documents are split into parent sections and sentence-packed
//! child fragments ([`chunker`]). Children are embedded and indexed
//! ([`indexer`]) while parents live in a [`ParentStore`]. At query time child
//! hits are expanded back to their parents ([`expander`]), rendered into a
//! numbered prompt ([`prompt`]), answered by an [`llm`] provider and checked
//! for citations ([`citation`]).

pub mod chunk;
pub mod chunker;
pub mod citation;
pub mod document;
pub mod embedder;
pub mod expander;
pub mod indexer;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod parent_store;
pub mod prompt;
pub mod search;
pub mod settings;
pub mod vector_store;

pub use chunk::{read_chunks, write_chunks, Chunk, ChunkCounts, ChunkId, ChunkKind, ChunkStrategy};
pub use chunker::{
    assemble_chunks, ChildFragment, ChunkerConfig, FragmentSplitter, HierarchicalChunker,
    ParentSection, DEFAULT_CHILD_MAX_CHARS,
};
pub use citation::{process_answer, Confidence, GeneratedAnswer};
pub use document::{parse_document, DocumentError, ParsedDocument, RawDocument};
pub use embedder::Embedder;
pub use expander::{expand_to_parents, ParentLookup, SearchHit};
pub use indexer::{index_children, IndexOptions, IndexReport};
pub use ingest::{chunk_documents, run_ingest, IngestError, IngestSummary};
pub use loader::{load_documents, LoaderError};
pub use parent_store::ParentStore;
pub use prompt::{build_citation_legend, build_prompt, CitationLegendEntry};
pub use vector_store::{QdrantStore, VectorRecord, VectorSearch, VectorSink};
