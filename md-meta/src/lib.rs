//! Extract structural metadata from Markdown documentation pages.
//!
//! The crate strips a leading YAML front-matter block, records every ATX
//! header (`#` through `######`) with its byte offset into the remaining body,
//! and resolves a display title. Offsets always refer to the front-matter-free
//! content so downstream splitters can slice it directly.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

mod front_matter;

pub use front_matter::{split_front_matter, FrontMatter, MetaError};

/// Title used when neither front matter nor a level-1 header provides one.
pub const UNTITLED: &str = "Untitled";

/// A Markdown header found in the document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header depth (1-6).
    pub level: u8,
    /// Header text without the leading hashes.
    pub text: String,
    /// Byte offset of the header line within the body.
    pub position: usize,
}

/// Metadata extracted from a single Markdown source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownMeta {
    /// Resolved title (front matter, then first H1, then [`UNTITLED`]).
    pub title: String,
    /// Body text with the front-matter block removed.
    pub content: String,
    /// Headers ordered by position.
    pub headers: Vec<Header>,
}

/// Parses front matter, headers and title from raw Markdown.
///
/// # Example
///
/// ```
/// use md_meta::parse_markdown;
///
/// let meta = parse_markdown("---\ntitle: Pods\n---\n## Phase\nRunning.").unwrap();
/// assert_eq!(meta.title, "Pods");
/// assert_eq!(meta.content, "## Phase\nRunning.");
/// assert_eq!(meta.headers[0].position, 0);
/// ```
pub fn parse_markdown(raw: &str) -> Result<MarkdownMeta, MetaError> {
    let (front_matter, content) = split_front_matter(raw)?;
    let headers = extract_headers(content);
    let title = front_matter
        .title
        .or_else(|| {
            headers
                .iter()
                .find(|header| header.level == 1)
                .map(|header| header.text.clone())
        })
        .unwrap_or_else(|| UNTITLED.to_string());

    Ok(MarkdownMeta {
        title,
        content: content.to_string(),
        headers,
    })
}

/// Returns every ATX header in `content`, in source order.
pub fn extract_headers(content: &str) -> Vec<Header> {
    header_pattern()
        .captures_iter(content)
        .filter_map(|caps| {
            let hashes = caps.get(1)?;
            let text = caps.get(2)?;
            Some(Header {
                level: hashes.as_str().len() as u8,
                text: text.as_str().to_string(),
                position: hashes.start(),
            })
        })
        .collect()
}

fn header_pattern() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"(?m)^(#{1,6})\s+(.+?)\r?$").expect("valid header regex")
    })
}
