//! Query-time similarity search over child chunks.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::chunk::ChunkId;
use crate::embedder::Embedder;
use crate::expander::SearchHit;
use crate::vector_store::{ScoredPoint, VectorSearch};

/// Default number of child hits requested per query.
pub const DEFAULT_TOP_K: usize = 10;

/// Embeds `query` and returns the `top_k` closest child chunks.
pub fn search<E, S>(query: &str, embedder: &E, index: &S, top_k: usize) -> Result<Vec<SearchHit>>
where
    E: Embedder + ?Sized,
    S: VectorSearch + ?Sized,
{
    let vector = embedder
        .embed_query(query)
        .context("failed to embed query")?;
    let points = index
        .search(&vector, top_k)
        .context("vector search failed")?;
    let hits: Vec<SearchHit> = points.into_iter().filter_map(hit_from_point).collect();
    debug!(top_k, hits = hits.len(), "search complete");
    Ok(hits)
}

/// Decodes a scored point into a hit; points without a parent id yield `None`.
pub fn hit_from_point(point: ScoredPoint) -> Option<SearchHit> {
    let payload = &point.payload;
    let Some(parent_id) = field(payload, "parentId", "parent_id") else {
        warn!(point = %point.id, "search hit without parent id; skipping");
        return None;
    };
    let child_id =
        field(payload, "chunkId", "chunk_id").or_else(|| ChunkId::from_value(&point.id))?;
    let content = payload
        .get("content")
        .and_then(|value| value.as_str())
        .unwrap_or_default()
        .to_string();
    Some(SearchHit {
        child_id,
        parent_id,
        content,
        score: point.score,
    })
}

fn field(payload: &serde_json::Value, camel: &str, snake: &str) -> Option<ChunkId> {
    payload
        .get(camel)
        .or_else(|| payload.get(snake))
        .and_then(ChunkId::from_value)
}
