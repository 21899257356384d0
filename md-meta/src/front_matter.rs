//! YAML front-matter splitting.

use serde_yaml::Value;
use thiserror::Error;

const DELIMITER: &str = "---";

/// Errors surfaced while reading a front-matter block.
#[derive(Debug, Error)]
pub enum MetaError {
    /// The block between the `---` fences is not valid YAML.
    #[error("invalid front matter: {0}")]
    FrontMatter(#[from] serde_yaml::Error),
}

/// Fields the pipeline reads from front matter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    /// `title` key when present and a string.
    pub title: Option<String>,
}

/// Splits a leading `---` fenced YAML block from the body.
///
/// Returns the parsed front matter and the remaining body. A source without
/// an opening fence, or with an opening fence that is never closed, is
/// returned unchanged with empty front matter.
pub fn split_front_matter(raw: &str) -> Result<(FrontMatter, &str), MetaError> {
    let Some(after_open) = strip_fence_line(raw) else {
        return Ok((FrontMatter::default(), raw));
    };

    let mut offset = 0usize;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let yaml = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            return Ok((parse_yaml(yaml)?, body));
        }
        offset += line.len();
    }

    Ok((FrontMatter::default(), raw))
}

fn strip_fence_line(raw: &str) -> Option<&str> {
    let rest = raw.strip_prefix(DELIMITER)?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

fn parse_yaml(yaml: &str) -> Result<FrontMatter, MetaError> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::default());
    }
    let value: Value = serde_yaml::from_str(yaml)?;
    let title = value
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string);
    Ok(FrontMatter { title })
}

#[cfg(test)]
mod tests {
    use super::{split_front_matter, FrontMatter, MetaError};

    #[test]
    fn passes_through_without_fence() {
        let (meta, body) = split_front_matter("## Heading\ntext").unwrap();
        assert_eq!(meta, FrontMatter::default());
        assert_eq!(body, "## Heading\ntext");
    }

    #[test]
    fn strips_block_and_reads_title() {
        let (meta, body) =
            split_front_matter("---\ntitle: \"Pod Lifecycle\"\ncontent_type: concept\n---\nBody")
                .unwrap();
        assert_eq!(meta.title.as_deref(), Some("Pod Lifecycle"));
        assert_eq!(body, "Body");
    }

    #[test]
    fn unterminated_fence_is_left_alone() {
        let raw = "---\ntitle: never closed\n## Heading";
        let (meta, body) = split_front_matter(raw).unwrap();
        assert!(meta.title.is_none());
        assert_eq!(body, raw);
    }

    #[test]
    fn non_string_title_is_ignored() {
        let (meta, _) = split_front_matter("---\ntitle: [a, b]\n---\n").unwrap();
        assert!(meta.title.is_none());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let err = split_front_matter("---\ntitle: [unclosed\n---\nBody").unwrap_err();
        assert!(matches!(err, MetaError::FrontMatter(_)));
    }
}
