//! Qdrant Cloud Inference embedding client.

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{ensure_batch_fits, ensure_vector_count, post_with_retry, Embedder, HttpOptions};

const SERVICE: &str = "Qdrant";

/// Blocking embeddings client for a Qdrant inference endpoint.
#[derive(Clone)]
pub struct QdrantEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    options: HttpOptions,
}

impl QdrantEmbedder {
    /// Builds a new Qdrant embeddings client.
    ///
    /// # Arguments
    /// * `api_key` - Value for the `api-key` header
    /// * `endpoint` - Full inference endpoint, e.g. `https://cluster-id.cloud.qdrant.io/inference/text`
    /// * `model` - Model identifier served by the cluster (e.g. `sentence-transformers/all-minilm-l6-v2`)
    pub fn new(
        api_key: &str,
        endpoint: &str,
        model: impl Into<String>,
        options: HttpOptions,
    ) -> Result<Self> {
        let model = model.into();
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Qdrant API key");
        anyhow::ensure!(
            endpoint.starts_with("http://") || endpoint.starts_with("https://"),
            "Qdrant endpoint must be an http(s) URL"
        );
        anyhow::ensure!(!model.trim().is_empty(), "missing Qdrant model name");
        let options = options.normalized();

        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(api_key.trim()).context("invalid Qdrant API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(options.timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Qdrant HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            options,
        })
    }
}

impl Embedder for QdrantEmbedder {
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        ensure_batch_fits(inputs.len(), self.options.batch_size)?;
        let request = InferenceRequest {
            model: &self.model,
            inputs,
        };
        let response = post_with_retry(
            &self.client,
            &self.endpoint,
            &request,
            self.options.max_retries,
            SERVICE,
        )?;
        let payload: InferenceResponse = response
            .json()
            .context("failed to parse Qdrant inference response")?;
        payload.into_embeddings(inputs.len())
    }

    fn batch_size(&self) -> usize {
        self.options.batch_size
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    model: &'a str,
    #[serde(rename = "input")]
    inputs: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    data: Vec<InferenceData>,
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

impl InferenceResponse {
    fn into_embeddings(self, expected: usize) -> Result<Vec<Vec<f32>>> {
        if !self.data.is_empty() {
            ensure_vector_count(SERVICE, self.data.len(), expected)?;
            let mut data = self.data;
            data.sort_by_key(|d| d.index.unwrap_or(0));
            return Ok(data.into_iter().map(|d| d.embedding).collect());
        }
        if !self.embeddings.is_empty() {
            ensure_vector_count(SERVICE, self.embeddings.len(), expected)?;
            return Ok(self.embeddings);
        }
        Err(anyhow!("Qdrant response missing embedding payloads"))
    }
}

#[derive(Debug, Deserialize)]
struct InferenceData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}
