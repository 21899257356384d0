//! Generative model clients.
//!
//! Providers either return the whole answer at once or a [`TextStream`] of
//! fragments. Streams are folded into the final text with [`accumulate`];
//! citation parsing always runs on the accumulated answer.

use anyhow::{bail, Result};
use reqwest::blocking::Response;

mod anthropic;
mod openai;
pub mod sse;

pub use anthropic::{AnthropicProvider, DEFAULT_ANTHROPIC_MODEL};
pub use openai::{OpenAiProvider, DEFAULT_OPENAI_MODEL};

/// Incremental answer text, in delivery order.
pub type TextStream = Box<dyn Iterator<Item = Result<String>> + Send>;

/// Trait implemented by concrete LLM providers.
pub trait LlmProvider {
    /// Returns the complete answer for `request`.
    fn answer(&self, request: &ProviderRequest) -> Result<String>;

    /// Returns the answer as a stream of text fragments.
    fn stream(&self, request: &ProviderRequest) -> Result<TextStream>;
}

/// Request envelope shared by the various providers.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    /// Fully rendered prompt.
    pub prompt: &'a str,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token ceiling.
    pub max_tokens: usize,
}

/// Drains `stream`, handing each fragment to `on_fragment`, and returns the full text.
///
/// The first failed fragment aborts accumulation.
pub fn accumulate<I, F>(stream: I, mut on_fragment: F) -> Result<String>
where
    I: IntoIterator<Item = Result<String>>,
    F: FnMut(&str),
{
    let mut full = String::new();
    for fragment in stream {
        let fragment = fragment?;
        on_fragment(&fragment);
        full.push_str(&fragment);
    }
    Ok(full)
}

fn ensure_success(resp: Response, provider: &str) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let text = resp
        .text()
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    bail!("{} returned {}: {}", provider, status, text);
}
