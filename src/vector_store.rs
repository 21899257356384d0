//! Qdrant collection client for child chunk vectors.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::chunk::{Chunk, ChunkId};

/// Default Qdrant REST endpoint.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";
/// Default collection holding child chunk vectors.
pub const DEFAULT_COLLECTION: &str = "documind_chunks";

/// Payload stored next to each vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPayload {
    /// Child chunk id; point ids are derived from it.
    pub chunk_id: ChunkId,
    /// Child text.
    pub content: String,
    /// Owning parent.
    pub parent_id: Option<ChunkId>,
    /// Source document path.
    pub source_file: String,
    /// Folder breadcrumb of the source document.
    pub section_path: Vec<String>,
}

/// One point written to the collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorRecord {
    /// Deterministic point id, see [`point_id`].
    pub id: Uuid,
    /// Embedding of the chunk content.
    pub vector: Vec<f32>,
    /// Chunk fields kept for retrieval.
    pub payload: ChunkPayload,
}

impl VectorRecord {
    /// Pairs a chunk with its embedding.
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: point_id(&chunk.id),
            vector,
            payload: ChunkPayload {
                chunk_id: chunk.id.clone(),
                content: chunk.content.clone(),
                parent_id: chunk.parent_id.clone(),
                source_file: chunk.source_file.clone(),
                section_path: chunk.section_path.clone(),
            },
        }
    }
}

/// Qdrant point id for a chunk: a UUIDv5 of the chunk id.
pub fn point_id(chunk_id: &ChunkId) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_str().as_bytes())
}

/// Search result as returned by the collection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoredPoint {
    /// Point id (UUID string or integer).
    pub id: Value,
    /// Similarity score.
    pub score: f32,
    /// Stored payload, if requested.
    #[serde(default)]
    pub payload: Value,
}

/// Write side of a vector index.
pub trait VectorSink {
    /// Creates the backing collection for `dims`-sized vectors if missing.
    fn ensure_collection(&self, dims: usize) -> Result<()>;

    /// Inserts or replaces `records`.
    fn upsert(&self, records: &[VectorRecord]) -> Result<()>;
}

/// Read side of a vector index.
pub trait VectorSearch {
    /// Returns the `limit` nearest points to `vector`, best first.
    fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>>;
}

/// Blocking REST client bound to one collection.
#[derive(Clone)]
pub struct QdrantStore {
    client: Client,
    base_url: String,
    collection: String,
}

impl QdrantStore {
    /// Connects to `base_url`, optionally authenticating with `api_key`.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        collection: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let collection = collection.into();
        anyhow::ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "Qdrant URL must be an http(s) URL"
        );
        anyhow::ensure!(!collection.trim().is_empty(), "collection name is required");

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.map(str::trim).filter(|key| !key.is_empty()) {
            headers.insert(
                "api-key",
                HeaderValue::from_str(key).context("invalid Qdrant API key")?,
            );
        }
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Qdrant HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection,
        })
    }

    /// Collection this store reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, suffix)
    }
}

impl VectorSink for QdrantStore {
    fn ensure_collection(&self, dims: usize) -> Result<()> {
        anyhow::ensure!(dims > 0, "vector size must be positive");
        let body = json!({ "vectors": { "size": dims, "distance": "Cosine" } });
        let resp = self
            .client
            .put(self.collection_url(""))
            .json(&body)
            .send()
            .with_context(|| format!("failed to create collection {}", self.collection))?;
        if resp.status() == StatusCode::CONFLICT {
            info!(collection = %self.collection, "collection already exists");
            return Ok(());
        }
        check_status(resp, "create collection")?;
        info!(collection = %self.collection, dims, "collection created");
        Ok(())
    }

    fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let body = UpsertRequest { points: records };
        let resp = self
            .client
            .put(self.collection_url("/points?wait=true"))
            .json(&body)
            .send()
            .with_context(|| format!("failed to upsert into {}", self.collection))?;
        check_status(resp, "upsert points")?;
        debug!(collection = %self.collection, points = records.len(), "upserted points");
        Ok(())
    }
}

impl VectorSearch for QdrantStore {
    fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        let body = SearchRequest {
            vector,
            limit,
            with_payload: true,
        };
        let resp = self
            .client
            .post(self.collection_url("/points/search"))
            .json(&body)
            .send()
            .with_context(|| format!("failed to search {}", self.collection))?;
        let parsed: SearchResponse = check_status(resp, "search points")?
            .json()
            .context("failed to parse Qdrant search response")?;
        Ok(parsed.result)
    }
}

fn check_status(resp: Response, action: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    bail!("Qdrant {action} failed ({status}): {body}");
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    points: &'a [VectorRecord],
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}
