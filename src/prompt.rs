//! Prompt rendering for grounded, citation-bearing answers.

use serde::Serialize;

use crate::chunk::Chunk;

/// Reply the model is told to give when the context does not cover the question.
pub const NOT_ENOUGH_INFORMATION: &str =
    "I don't have enough information to answer that question.";

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Renders the generation prompt for `question` over numbered `parents`.
///
/// Parent `i` (0-based) is presented as context block `[i + 1]`, matching
/// [`build_citation_legend`].
pub fn build_prompt(question: &str, parents: &[Chunk]) -> String {
    let mut prompt = String::new();
    if parents.is_empty() {
        prompt.push_str("You are a helpful documentation assistant.\n\n");
        prompt.push_str("You have access to NO relevant documents for this question.\n\n");
        prompt.push_str(&format!(
            "If you don't have enough information to answer accurately, say \"{NOT_ENOUGH_INFORMATION}\"\n\n"
        ));
        prompt.push_str(&format!("Question: {question}\n\nAnswer:"));
        return prompt;
    }

    prompt.push_str("You are a helpful documentation assistant.\n\n");
    prompt.push_str("INSTRUCTIONS:\n");
    prompt.push_str("- Answer the question using ONLY the provided context documents below\n");
    prompt.push_str("- Cite your sources using [1], [2], etc. when you use information from them\n");
    prompt.push_str(&format!(
        "- If the context doesn't contain the answer, say \"{NOT_ENOUGH_INFORMATION}\"\n"
    ));
    prompt.push_str("- Be concise but complete\n");
    prompt.push_str("- If multiple sources support a point, cite all of them: [1][2]\n\n");
    prompt.push_str("CONTEXT DOCUMENTS:\n\n");
    prompt.push_str(&render_context(parents));
    prompt.push_str(CONTEXT_SEPARATOR);
    prompt.push_str(&format!(
        "Question: {question}\n\nProvide your answer with citations:"
    ));
    prompt
}

/// Numbered `[n] Source: <file>` blocks joined by horizontal rules.
pub fn render_context(parents: &[Chunk]) -> String {
    parents
        .iter()
        .enumerate()
        .map(|(idx, parent)| {
            format!("[{}] Source: {}\n{}", idx + 1, parent.source_file, parent.content)
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Maps a citation number back to where its context came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationLegendEntry {
    /// 1-based citation number.
    pub number: usize,
    /// Source file of the parent.
    pub source: String,
    /// Section path joined with `" > "`.
    pub section: String,
}

/// Builds the citation legend shown next to an answer.
pub fn build_citation_legend(parents: &[Chunk]) -> Vec<CitationLegendEntry> {
    parents
        .iter()
        .enumerate()
        .map(|(idx, parent)| CitationLegendEntry {
            number: idx + 1,
            source: parent.source_file.clone(),
            section: parent.section_path.join(" > "),
        })
        .collect()
}
