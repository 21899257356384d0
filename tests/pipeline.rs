use std::collections::HashSet;
use std::path::Path;

use pretty_assertions::assert_eq;

use documind::chunk::{Chunk, ChunkCounts, ChunkKind};
use documind::chunker::{split_sections, FragmentSplitter, HierarchicalChunker};
use documind::document::{parse_document, ParsedDocument, RawDocument, DEFAULT_ANCHOR_DIR};
use documind::ingest::chunk_documents;
use documind::loader::load_documents;

fn fixture_root() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/docs"))
}

fn parsed(path: &str, content: &str) -> ParsedDocument {
    let raw = RawDocument {
        path: path.to_string(),
        content: content.to_string(),
    };
    parse_document(&raw, DEFAULT_ANCHOR_DIR).expect("parse document")
}

fn long_document() -> String {
    let mut text = String::from("## Scheduling\n");
    for n in 0..12 {
        text.push_str(&format!(
            "Sentence number {n} explains how the scheduler weighs node {n} against its peers. "
        ));
    }
    text.push_str(&format!("{}.\n", "x".repeat(260)));
    text.push_str("## Eviction\nShort one. ");
    for n in 0..5 {
        text.push_str(&format!("Eviction rule {n} applies when memory pressure stays high! "));
    }
    text.push_str("\n## Taints\nDoes a taint repel pods? Yes.");
    text
}

#[test]
fn sections_cover_body_contiguously() {
    let doc = parsed("docs/concepts/scheduling.md", &long_document());
    let sections = split_sections(&doc);
    let level_two = doc
        .metadata
        .headers
        .iter()
        .filter(|header| header.level == 2)
        .count();

    assert_eq!(sections.len(), level_two);
    assert_eq!(sections[0].start_offset, 0);
    for pair in sections.windows(2) {
        assert_eq!(pair[0].end_offset, pair[1].start_offset);
    }
    assert_eq!(sections.last().unwrap().end_offset, doc.content.len());
    let rebuilt: String = sections.iter().map(|s| s.content.as_str()).collect();
    assert_eq!(rebuilt, doc.content);
}

#[test]
fn fragments_stay_within_budget_unless_single_sentence() {
    let doc = parsed("docs/concepts/scheduling.md", &long_document());
    let splitter = FragmentSplitter::new(200);
    let sentence = regex::Regex::new(r"^[^.!?]+[.!?]+$").unwrap();

    let mut oversized = 0;
    for section in split_sections(&doc) {
        let mut oversized_here = 0;
        for fragment in splitter.split(&section) {
            if fragment.content.chars().count() > 200 {
                assert!(sentence.is_match(&fragment.content), "{}", fragment.content);
                oversized_here += 1;
            }
        }
        assert!(oversized_here <= 1);
        oversized += oversized_here;
    }
    assert_eq!(oversized, 1);
}

#[test]
fn ids_are_unique_and_children_prefixed_by_parent() {
    let doc = parsed("docs/concepts/scheduling.md", &long_document());
    let chunks = HierarchicalChunker::default().chunk_document(&doc);

    let ids: HashSet<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids.len(), chunks.len());

    let mut current_parent = None;
    for chunk in &chunks {
        match chunk.kind {
            ChunkKind::Parent => {
                assert_eq!(chunk.parent_id, None);
                current_parent = Some(chunk.id.clone());
            }
            ChunkKind::Child => {
                let parent = chunk.parent_id.as_ref().expect("child has parent");
                assert_eq!(Some(parent), current_parent.as_ref());
                assert!(chunk.id.as_str().starts_with(&format!("{parent}-c")));
            }
        }
    }
}

#[test]
fn rechunking_is_byte_identical() {
    let chunker = HierarchicalChunker::default();
    let doc = parsed("docs/concepts/scheduling.md", &long_document());
    let first = serde_json::to_string_pretty(&chunker.chunk_document(&doc)).unwrap();
    let second = serde_json::to_string_pretty(&chunker.chunk_document(&doc)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn unpunctuated_and_empty_sections_produce_parents_only() {
    let text = format!("## Overview\n{}\n## Empty\n", "a".repeat(600));
    let doc = parsed("docs/concepts/overview.md", &text);
    let chunks = HierarchicalChunker::default().chunk_document(&doc);

    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(Chunk::is_parent));
    assert_eq!(chunks[0].id.as_str(), "overview-p0");
    assert_eq!(chunks[1].id.as_str(), "overview-p1");
    assert_eq!(chunks[1].content, "## Empty\n");
}

#[test]
fn documents_without_sections_produce_nothing() {
    let doc = parsed("docs/index.md", "# Home\nJust an intro. No sections.");
    assert!(HierarchicalChunker::default().chunk_document(&doc).is_empty());
}

#[test]
fn fixture_tree_chunks_in_path_order() {
    let documents = load_documents(fixture_root()).expect("load fixtures");
    assert_eq!(documents.len(), 3);

    let chunks = chunk_documents(&documents, DEFAULT_ANCHOR_DIR, &HierarchicalChunker::default())
        .expect("chunk fixtures");
    assert_eq!(ChunkCounts::of(&chunks), ChunkCounts { parents: 5, children: 9 });

    let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "nodes-p0",
            "nodes-p0-c0",
            "nodes-p1",
            "nodes-p1-c0",
            "pod-lifecycle-p0",
            "pod-lifecycle-p0-c0",
            "pod-lifecycle-p0-c1",
            "pod-lifecycle-p0-c2",
            "pod-lifecycle-p0-c3",
            "pod-lifecycle-p1",
            "pod-lifecycle-p1-c0",
            "pod-lifecycle-p1-c1",
            "pod-lifecycle-p2",
            "pod-lifecycle-p2-c0",
        ]
    );

    let pod = &chunks[4];
    assert!(pod.content.starts_with("## Pod phase\n"));
    assert!(pod.content.contains("### Running"));
    assert_eq!(
        pod.section_path,
        vec!["concepts".to_string(), "workloads".to_string()]
    );
    assert!(chunks[8].content.starts_with("### Running\nThe Pod has been bound"));
    assert!(chunks
        .iter()
        .filter(|c| c.is_child())
        .all(|c| c.content.chars().count() <= 200));
}
