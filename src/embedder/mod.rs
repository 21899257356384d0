//! Text embedding clients.
//!
//! Both clients are blocking, batch-bounded and retry rate limits, server
//! errors and transient transport failures with capped exponential backoff.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::warn;

pub mod openai;
pub mod qdrant;

pub use openai::OpenAiEmbedder;
pub use qdrant::QdrantEmbedder;

/// Default number of texts sent per embedding request.
pub const DEFAULT_EMBED_BATCH: usize = 50;

/// Turns text into fixed-length vectors.
pub trait Embedder: Send + Sync {
    /// Embeds `inputs`, returning one vector per input in the same order.
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Largest batch accepted by [`Embedder::embed_batch`].
    fn batch_size(&self) -> usize;

    /// Embeds a single text.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("embedder returned no vector for the query"))
    }
}

impl<E: Embedder + ?Sized> Embedder for Arc<E> {
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(inputs)
    }

    fn batch_size(&self) -> usize {
        (**self).batch_size()
    }
}

/// Transport settings shared by the HTTP embedders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Total attempts per batch, first try included.
    pub max_retries: usize,
    /// Largest batch accepted per request.
    pub batch_size: usize,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 5,
            batch_size: DEFAULT_EMBED_BATCH,
        }
    }
}

impl HttpOptions {
    fn normalized(self) -> Self {
        Self {
            timeout: self.timeout.max(Duration::from_secs(1)),
            max_retries: self.max_retries.max(1),
            batch_size: self.batch_size.max(1),
        }
    }
}

fn ensure_batch_fits(len: usize, max: usize) -> Result<()> {
    anyhow::ensure!(len <= max, "batch of {len} exceeds configured max {max}");
    Ok(())
}

fn ensure_vector_count(service: &str, got: usize, expected: usize) -> Result<()> {
    anyhow::ensure!(
        got == expected,
        "{service} returned {got} embeddings for {expected} inputs"
    );
    Ok(())
}

/// POSTs `body` as JSON, retrying until success or `max_retries` attempts.
fn post_with_retry<T: Serialize>(
    client: &Client,
    endpoint: &str,
    body: &T,
    max_retries: usize,
    service: &str,
) -> Result<Response> {
    let mut attempt = 0usize;
    loop {
        match client.post(endpoint).json(body).send() {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) => {
                let status = resp.status();
                let text = resp
                    .text()
                    .unwrap_or_else(|_| "<body unavailable>".to_string());
                if is_retryable_status(status) && attempt + 1 < max_retries {
                    attempt += 1;
                    warn!(service, %status, attempt, "embedding request rejected; retrying");
                    thread::sleep(retry_backoff(attempt));
                    continue;
                }
                bail!("{service} embeddings request failed ({status}): {text}");
            }
            Err(err) => {
                if is_retryable_error(&err) && attempt + 1 < max_retries {
                    attempt += 1;
                    warn!(service, error = %err, attempt, "embedding request failed; retrying");
                    thread::sleep(retry_backoff(attempt));
                    continue;
                }
                return Err(err).with_context(|| format!("{service} embeddings request failed"));
            }
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request() || err.is_decode()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}
