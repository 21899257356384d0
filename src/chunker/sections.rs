//! Parent sections anchored at level-2 headers.

use std::path::Path;

use crate::chunk::ChunkId;
use crate::document::{Header, ParsedDocument};

/// Header level that opens a parent section.
pub const SECTION_LEVEL: u8 = 2;

/// Contiguous `[start_offset, end_offset)` slice of a document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentSection {
    /// `<doc>-p<i>` identifier.
    pub id: ChunkId,
    /// Section text, heading line included.
    pub content: String,
    /// Byte offset where the section starts.
    pub start_offset: usize,
    /// Exclusive byte offset where the section ends.
    pub end_offset: usize,
    /// Level-2 header that opened the section.
    pub header: Header,
}

/// Splits a document into one section per level-2 header.
///
/// Each section runs from its header to the next level-2 header, the last
/// one to the end of the body. Text before the first level-2 header belongs
/// to no section, and a document without level-2 headers yields nothing.
pub fn split_sections(doc: &ParsedDocument) -> Vec<ParentSection> {
    let content = doc.content.as_str();
    let stem = document_stem(&doc.path);
    let anchors: Vec<&Header> = doc
        .metadata
        .headers
        .iter()
        .filter(|header| header.level == SECTION_LEVEL)
        .collect();

    anchors
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let start = clamp_to_boundary(content, header.position);
            let end = anchors
                .get(idx + 1)
                .map(|next| clamp_to_boundary(content, next.position))
                .unwrap_or(content.len())
                .max(start);
            ParentSection {
                id: parent_id(&stem, idx),
                content: content[start..end].to_string(),
                start_offset: start,
                end_offset: end,
                header: (*header).clone(),
            }
        })
        .collect()
}

/// File name without its extension, used as the id prefix.
pub fn document_stem(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    Path::new(&normalized)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or(normalized)
}

fn parent_id(stem: &str, idx: usize) -> ChunkId {
    ChunkId::new(format!("{stem}-p{idx}"))
}

fn clamp_to_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentMetadata;
    use pretty_assertions::assert_eq;

    fn doc(path: &str, content: &str) -> ParsedDocument {
        ParsedDocument {
            path: path.to_string(),
            content: content.to_string(),
            metadata: DocumentMetadata {
                title: "t".to_string(),
                source_path: path.to_string(),
                section_path: Vec::new(),
                headers: md_meta::extract_headers(content),
            },
        }
    }

    #[test]
    fn sections_start_at_h2_and_cover_to_end() {
        let text = "# Title\nLead.\n## One\nAlpha.\n### Sub\nBeta.\n## Two\nGamma.";
        let sections = split_sections(&doc("docs/pods.md", text));

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].id.as_str(), "pods-p0");
        assert_eq!(sections[1].id.as_str(), "pods-p1");
        assert_eq!(sections[0].content, "## One\nAlpha.\n### Sub\nBeta.\n");
        assert_eq!(sections[1].content, "## Two\nGamma.");
        assert_eq!(sections[0].end_offset, sections[1].start_offset);
        assert_eq!(sections[1].end_offset, text.len());
        assert_eq!(sections[1].header.text, "Two");
    }

    #[test]
    fn no_level_two_headers_yields_nothing() {
        let sections = split_sections(&doc("docs/a.md", "# Only\n### Deep\ntext."));
        assert!(sections.is_empty());
    }

    #[test]
    fn out_of_range_positions_are_clamped() {
        let mut parsed = doc("docs/a.md", "## é\nx.");
        parsed.metadata.headers.push(Header {
            level: 2,
            text: "ghost".to_string(),
            position: 4,
        });
        parsed.metadata.headers.push(Header {
            level: 2,
            text: "past end".to_string(),
            position: 999,
        });
        let sections = split_sections(&parsed);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].content, "## ");
        assert_eq!(sections[1].start_offset, 3);
        assert_eq!(sections[2].content, "");
    }

    #[test]
    fn stem_drops_directories_and_extension() {
        assert_eq!(document_stem("/a/docs/pod-lifecycle.md"), "pod-lifecycle");
        assert_eq!(document_stem("docs\\win\\nodes.md"), "nodes");
    }
}
