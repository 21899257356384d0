//! Child fragments: sentence-packed slices of a parent section.

use regex::Regex;

use super::sections::ParentSection;
use crate::chunk::ChunkId;

/// Size-bounded slice of a parent section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildFragment {
    /// `<parent>-c<j>` identifier.
    pub id: ChunkId,
    /// Owning parent id.
    pub parent_id: ChunkId,
    /// Trimmed fragment text.
    pub content: String,
}

/// Greedy sentence packer with a character ceiling.
#[derive(Debug, Clone)]
pub struct FragmentSplitter {
    heading: Regex,
    sentence: Regex,
    max_chars: usize,
}

impl FragmentSplitter {
    /// Builds a splitter that closes a fragment before it would exceed `max_chars`.
    pub fn new(max_chars: usize) -> Self {
        Self {
            heading: Regex::new(r"^## .+\n?").expect("valid heading regex"),
            sentence: Regex::new(r"[^.!?]+[.!?]+").expect("valid sentence regex"),
            max_chars,
        }
    }

    /// Character ceiling for packed fragments.
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Splits a parent section into child fragments.
    ///
    /// The heading line is dropped, the body is cut into runs ending in `.`,
    /// `!` or `?`, and runs are appended to the current fragment while the
    /// combined length stays within the ceiling. A single sentence longer than
    /// the ceiling becomes its own oversized fragment. Text after the last
    /// terminator is not part of any sentence and is dropped.
    pub fn split(&self, parent: &ParentSection) -> Vec<ChildFragment> {
        let body = self.strip_heading(&parent.content);
        let mut fragments = Vec::new();
        let mut group = String::new();
        let mut group_chars = 0usize;

        for sentence in self.sentence.find_iter(body).map(|m| m.as_str()) {
            let sentence_chars = sentence.chars().count();
            if group_chars + sentence_chars <= self.max_chars {
                group.push_str(sentence);
                group_chars += sentence_chars;
                continue;
            }
            if !group.is_empty() {
                flush_fragment(&mut fragments, &parent.id, &group);
            }
            group.clear();
            group.push_str(sentence);
            group_chars = sentence_chars;
        }

        if !group.is_empty() {
            flush_fragment(&mut fragments, &parent.id, &group);
        }
        fragments
    }

    fn strip_heading<'a>(&self, content: &'a str) -> &'a str {
        match self.heading.find(content) {
            Some(heading) => &content[heading.end()..],
            None => content,
        }
    }
}

fn flush_fragment(fragments: &mut Vec<ChildFragment>, parent_id: &ChunkId, group: &str) {
    let id = ChunkId::new(format!("{parent_id}-c{}", fragments.len()));
    fragments.push(ChildFragment {
        id,
        parent_id: parent_id.clone(),
        content: group.trim().to_string(),
    });
}
