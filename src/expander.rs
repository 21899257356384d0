//! Context expansion from child search hits to their parent sections.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chunk::{Chunk, ChunkId};

/// Child-level similarity hit returned by vector search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Id of the matched child chunk.
    pub child_id: ChunkId,
    /// Id of the parent that owns the child.
    pub parent_id: ChunkId,
    /// Child text as stored in the index.
    pub content: String,
    /// Similarity score; only meaningful for ranking upstream.
    pub score: f32,
}

/// Key-by-id access to parent chunks.
pub trait ParentLookup {
    /// Returns the parent stored under `id`, if any.
    fn get(&self, id: &ChunkId) -> Option<&Chunk>;

    /// Resolves `ids` in first-occurrence order.
    ///
    /// Repeated ids are returned once and ids with no stored parent are
    /// skipped, so the result may be shorter than the number of distinct ids.
    fn get_many(&self, ids: &[ChunkId]) -> Vec<Chunk> {
        let mut seen = HashSet::new();
        let mut parents = Vec::new();
        for id in ids {
            if !seen.insert(id) {
                continue;
            }
            match self.get(id) {
                Some(parent) => parents.push(parent.clone()),
                None => debug!(parent_id = %id, "parent missing from store; dropping hit"),
            }
        }
        parents
    }
}

impl ParentLookup for BTreeMap<ChunkId, Chunk> {
    fn get(&self, id: &ChunkId) -> Option<&Chunk> {
        BTreeMap::get(self, id)
    }
}

/// Maps ranked child hits to their distinct parents, keeping hit order.
pub fn expand_to_parents<L>(hits: &[SearchHit], lookup: &L) -> Vec<Chunk>
where
    L: ParentLookup + ?Sized,
{
    let parent_ids: Vec<ChunkId> = hits.iter().map(|hit| hit.parent_id.clone()).collect();
    let parents = lookup.get_many(&parent_ids);
    debug!(
        hits = hits.len(),
        parents = parents.len(),
        "expanded hits to parents"
    );
    parents
}
