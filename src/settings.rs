//! Command-line settings shared by the binaries.
//!
//! Every flag has an environment fallback so a `.env` file can carry the
//! whole configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};

use tracing_subscriber::EnvFilter;

use crate::embedder::{
    Embedder, HttpOptions, OpenAiEmbedder, QdrantEmbedder, DEFAULT_EMBED_BATCH,
};
use crate::llm::{
    AnthropicProvider, LlmProvider, OpenAiProvider, ProviderRequest, DEFAULT_ANTHROPIC_MODEL,
    DEFAULT_OPENAI_MODEL,
};
use crate::vector_store::{QdrantStore, DEFAULT_COLLECTION, DEFAULT_QDRANT_URL};

/// Embedding backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// OpenAI-compatible `/embeddings` endpoint.
    Openai,
    /// Qdrant Cloud Inference endpoint.
    Qdrant,
}

/// Embedding client flags.
#[derive(Args, Debug, Clone)]
pub struct EmbedderArgs {
    /// Embedding backend
    #[arg(long, env = "DOCUMIND_EMBEDDER", value_enum, default_value_t = EmbedderKind::Openai)]
    pub embedder: EmbedderKind,

    /// OpenAI API key (embeddings and the openai LLM provider)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// OpenAI embedding model
    #[arg(
        long,
        env = "DOCUMIND_OPENAI_EMBED_MODEL",
        default_value = "text-embedding-3-small"
    )]
    pub openai_embed_model: String,

    /// Base URL for the OpenAI-compatible API
    #[arg(
        long,
        env = "DOCUMIND_OPENAI_BASE",
        default_value = "https://api.openai.com/v1"
    )]
    pub openai_base_url: String,

    /// Optional embedding dimension override when supported by the model
    #[arg(long, env = "DOCUMIND_OPENAI_DIMENSIONS")]
    pub openai_dimensions: Option<usize>,

    /// Qdrant Cloud Inference endpoint (required with --embedder qdrant)
    #[arg(long, env = "DOCUMIND_QDRANT_INFERENCE_URL")]
    pub qdrant_inference_url: Option<String>,

    /// Model served by the Qdrant inference endpoint
    #[arg(
        long,
        env = "DOCUMIND_QDRANT_EMBED_MODEL",
        default_value = "sentence-transformers/all-minilm-l6-v2"
    )]
    pub qdrant_embed_model: String,

    /// Max number of texts sent per embedding request
    #[arg(long, env = "DOCUMIND_EMBED_BATCH", default_value_t = DEFAULT_EMBED_BATCH)]
    pub batch_size: usize,

    /// Max seconds to wait for each embedding request
    #[arg(long, env = "DOCUMIND_EMBED_TIMEOUT_SECS", default_value_t = 30)]
    pub embed_timeout_secs: u64,

    /// Attempts per embedding request, rate limits and transient errors included
    #[arg(long, env = "DOCUMIND_EMBED_MAX_RETRIES", default_value_t = 5)]
    pub max_retries: usize,
}

impl EmbedderArgs {
    /// Transport settings for the selected client.
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_secs(self.embed_timeout_secs),
            max_retries: self.max_retries,
            batch_size: self.batch_size,
        }
    }

    /// Builds the selected embedder. Qdrant inference reuses the Qdrant API key.
    pub fn build(&self, qdrant: &QdrantArgs) -> Result<Arc<dyn Embedder>> {
        let options = self.http_options();
        match self.embedder {
            EmbedderKind::Openai => {
                let key = self
                    .openai_api_key
                    .as_deref()
                    .ok_or_else(|| anyhow!("OPENAI_API_KEY must be set for the openai embedder"))?;
                let embedder = OpenAiEmbedder::new(
                    key,
                    &self.openai_base_url,
                    self.openai_embed_model.as_str(),
                    self.openai_dimensions,
                    options,
                )?;
                Ok(Arc::new(embedder))
            }
            EmbedderKind::Qdrant => {
                let endpoint = self.qdrant_inference_url.as_deref().ok_or_else(|| {
                    anyhow!("DOCUMIND_QDRANT_INFERENCE_URL must be set for the qdrant embedder")
                })?;
                let key = qdrant
                    .qdrant_api_key
                    .as_deref()
                    .ok_or_else(|| anyhow!("QDRANT_API_KEY must be set for the qdrant embedder"))?;
                let embedder =
                    QdrantEmbedder::new(key, endpoint, self.qdrant_embed_model.as_str(), options)?;
                Ok(Arc::new(embedder))
            }
        }
    }
}

/// Vector database flags.
#[derive(Args, Debug, Clone)]
pub struct QdrantArgs {
    /// Qdrant REST endpoint
    #[arg(long, env = "QDRANT_URL", default_value = DEFAULT_QDRANT_URL)]
    pub qdrant_url: String,

    /// Qdrant API key, if the cluster requires one
    #[arg(long, env = "QDRANT_API_KEY", hide_env_values = true)]
    pub qdrant_api_key: Option<String>,

    /// Collection holding child chunk vectors
    #[arg(long, env = "DOCUMIND_COLLECTION", default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Max seconds to wait for each Qdrant request
    #[arg(long, env = "DOCUMIND_QDRANT_TIMEOUT_SECS", default_value_t = 30)]
    pub qdrant_timeout_secs: u64,
}

impl QdrantArgs {
    /// Opens a client for the configured collection.
    pub fn connect(&self) -> Result<QdrantStore> {
        QdrantStore::new(
            &self.qdrant_url,
            self.qdrant_api_key.as_deref(),
            self.collection.as_str(),
            Duration::from_secs(self.qdrant_timeout_secs.max(1)),
        )
        .with_context(|| format!("failed to configure Qdrant at {}", self.qdrant_url))
    }
}

/// Generative model backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Anthropic messages API.
    Anthropic,
    /// OpenAI chat completions.
    Openai,
}

/// Answer generation flags.
#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    /// Target LLM provider
    #[arg(
        long,
        env = "DOCUMIND_LLM_PROVIDER",
        value_enum,
        default_value_t = ProviderKind::Anthropic
    )]
    pub llm_provider: ProviderKind,

    /// Anthropic API key (required with --llm-provider anthropic)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Anthropic model identifier
    #[arg(long, env = "DOCUMIND_ANTHROPIC_MODEL", default_value = DEFAULT_ANTHROPIC_MODEL)]
    pub anthropic_model: String,

    /// OpenAI chat model
    #[arg(long, env = "DOCUMIND_OPENAI_CHAT_MODEL", default_value = DEFAULT_OPENAI_MODEL)]
    pub openai_chat_model: String,

    /// Sampling temperature for the answer model
    #[arg(long, env = "DOCUMIND_TEMPERATURE", default_value_t = 0.0)]
    pub temperature: f32,

    /// Maximum tokens to request from the completion model
    #[arg(long, env = "DOCUMIND_MAX_TOKENS", default_value_t = 1000)]
    pub max_tokens: usize,
}

impl ProviderArgs {
    /// Builds the selected provider; `openai_api_key` comes from [`EmbedderArgs`].
    pub fn build(&self, openai_api_key: Option<&str>) -> Result<Box<dyn LlmProvider>> {
        match self.llm_provider {
            ProviderKind::Anthropic => {
                let key = self.anthropic_api_key.as_deref().ok_or_else(|| {
                    anyhow!("ANTHROPIC_API_KEY must be set for the Anthropic provider")
                })?;
                Ok(Box::new(AnthropicProvider::new(
                    key,
                    self.anthropic_model.as_str(),
                )?))
            }
            ProviderKind::Openai => {
                let key = openai_api_key
                    .ok_or_else(|| anyhow!("OPENAI_API_KEY must be set for the OpenAI provider"))?;
                Ok(Box::new(OpenAiProvider::new(
                    key,
                    self.openai_chat_model.as_str(),
                )?))
            }
        }
    }

    /// Request envelope for `prompt` with the configured sampling settings.
    pub fn request<'a>(&self, prompt: &'a str) -> ProviderRequest<'a> {
        ProviderRequest {
            prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Installs the stderr log subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Only the first call in a process takes effect.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        embedder: EmbedderArgs,
        #[command(flatten)]
        qdrant: QdrantArgs,
        #[command(flatten)]
        provider: ProviderArgs,
    }

    fn parse(args: &[&str]) -> Harness {
        Harness::try_parse_from(std::iter::once("test").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn explicit_flags_override_defaults() {
        let harness = parse(&[
            "--embedder",
            "qdrant",
            "--batch-size",
            "8",
            "--embed-timeout-secs",
            "3",
            "--llm-provider",
            "openai",
            "--max-tokens",
            "64",
            "--collection",
            "docs_test",
        ]);
        assert_eq!(harness.embedder.embedder, EmbedderKind::Qdrant);
        assert_eq!(
            harness.embedder.http_options(),
            HttpOptions {
                timeout: Duration::from_secs(3),
                max_retries: harness.embedder.max_retries,
                batch_size: 8,
            }
        );
        assert_eq!(harness.provider.llm_provider, ProviderKind::Openai);
        assert_eq!(harness.qdrant.collection, "docs_test");

        let request = harness.provider.request("prompt");
        assert_eq!(request.prompt, "prompt");
        assert_eq!(request.max_tokens, 64);
    }

    #[test]
    fn tracing_can_be_initialized_more_than_once() {
        init_tracing();
        init_tracing();
        tracing::info!("subscriber installed");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let result = Harness::try_parse_from(["test", "--llm-provider", "cohere"]);
        assert!(result.is_err());
    }

    #[test]
    fn qdrant_embedder_needs_an_endpoint() {
        let mut harness = parse(&["--embedder", "qdrant"]);
        harness.embedder.qdrant_inference_url = None;
        harness.qdrant.qdrant_api_key = Some("key".to_string());
        let err = harness.embedder.build(&harness.qdrant).err().unwrap();
        assert!(err.to_string().contains("DOCUMIND_QDRANT_INFERENCE_URL"));
    }

    #[test]
    fn openai_provider_needs_a_key() {
        let harness = parse(&["--llm-provider", "openai"]);
        let err = harness.provider.build(None).err().unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
