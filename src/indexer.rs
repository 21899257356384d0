//! Child chunk indexing: batched embedding fanned out over worker threads.
//!
//! Batches are cut in source order and embedded concurrently, but results are
//! buffered by batch id and written to the vector sink strictly in sequence,
//! so the index always receives fragments in the order they were chunked.

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info};

use crate::chunk::Chunk;
use crate::embedder::{Embedder, DEFAULT_EMBED_BATCH};
use crate::vector_store::{VectorRecord, VectorSink};

/// Indexing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    /// Children per embedding request; also capped by the embedder.
    pub batch_size: usize,
    /// Concurrent embedding workers.
    pub workers: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_EMBED_BATCH,
            workers: 1,
        }
    }
}

/// Outcome of an indexing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Batches written to the sink.
    pub batches: usize,
    /// Child chunks written to the sink.
    pub indexed: usize,
}

/// Embeds every child in `chunks` and upserts them into `sink` in source order.
///
/// Parent chunks are ignored. The sink's collection is created lazily, sized
/// from the first embedded vector. Any failed batch aborts the run.
pub fn index_children<E, S>(
    chunks: &[Chunk],
    embedder: &E,
    sink: &S,
    options: IndexOptions,
) -> Result<IndexReport>
where
    E: Embedder + Clone + 'static,
    S: VectorSink + ?Sized,
{
    let batch_size = options.batch_size.max(1).min(embedder.batch_size().max(1));
    let workers = options.workers.max(1);
    let children: Vec<&Chunk> = chunks.iter().filter(|chunk| chunk.is_child()).collect();
    let batches: Vec<Vec<Chunk>> = children
        .chunks(batch_size)
        .map(|batch| batch.iter().map(|chunk| (*chunk).clone()).collect())
        .collect();
    info!(
        children = children.len(),
        batches = batches.len(),
        batch_size,
        workers,
        "indexing child chunks"
    );
    if batches.is_empty() {
        return Ok(IndexReport::default());
    }

    // In-flight batches never exceed channel capacity, so neither side blocks forever.
    let capacity = workers * 2;
    let (task_tx, task_rx) = bounded::<EmbeddingTask>(capacity);
    let (result_tx, result_rx) = bounded::<EmbeddingResult>(capacity);
    for worker_id in 0..workers {
        let worker_embedder = embedder.clone();
        let worker_rx = task_rx.clone();
        let worker_tx = result_tx.clone();
        thread::spawn(move || worker_loop(worker_id, worker_rx, worker_tx, worker_embedder));
    }
    drop(task_rx);
    drop(result_tx);

    let mut writer = OrderedWriter::new(sink, batches.len());
    let mut inflight = 0usize;
    for (id, chunks) in batches.into_iter().enumerate() {
        while inflight >= capacity {
            let result = wait_for_result(&result_rx, inflight, writer.next_id)?;
            inflight -= 1;
            writer.accept(result?)?;
        }
        let count = chunks.len();
        task_tx
            .send(EmbeddingTask { id, chunks })
            .map_err(|_| anyhow!("embedding worker channel closed"))?;
        inflight += 1;
        debug!(batch = id, chunks = count, "queued embedding batch");
    }
    drop(task_tx);

    while inflight > 0 {
        let result = wait_for_result(&result_rx, inflight, writer.next_id)?;
        inflight -= 1;
        writer.accept(result?)?;
    }

    info!(
        indexed = writer.report.indexed,
        batches = writer.report.batches,
        "indexing complete"
    );
    Ok(writer.report)
}

struct OrderedWriter<'a, S: ?Sized> {
    sink: &'a S,
    total: usize,
    pending: BTreeMap<usize, Vec<VectorRecord>>,
    next_id: usize,
    collection_ready: bool,
    report: IndexReport,
}

impl<'a, S: VectorSink + ?Sized> OrderedWriter<'a, S> {
    fn new(sink: &'a S, total: usize) -> Self {
        Self {
            sink,
            total,
            pending: BTreeMap::new(),
            next_id: 0,
            collection_ready: false,
            report: IndexReport::default(),
        }
    }

    fn accept(&mut self, batch: EmbeddedBatch) -> Result<()> {
        self.pending.insert(batch.id, batch.records);
        while let Some(records) = self.pending.remove(&self.next_id) {
            if !self.collection_ready {
                if let Some(first) = records.first() {
                    self.sink
                        .ensure_collection(first.vector.len())
                        .context("failed to prepare vector collection")?;
                    self.collection_ready = true;
                }
            }
            self.sink
                .upsert(&records)
                .with_context(|| format!("failed to upsert batch {}", self.next_id))?;
            self.report.batches += 1;
            self.report.indexed += records.len();
            info!(
                batch = self.next_id + 1,
                of = self.total,
                chunks = records.len(),
                "uploaded batch"
            );
            self.next_id += 1;
        }
        Ok(())
    }
}

fn wait_for_result(
    result_rx: &Receiver<EmbeddingResult>,
    inflight: usize,
    oldest: usize,
) -> Result<EmbeddingResult> {
    loop {
        match result_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(result) => return Ok(result),
            Err(RecvTimeoutError::Timeout) => {
                info!(inflight, oldest, "still waiting on embedding batches");
            }
            Err(RecvTimeoutError::Disconnected) => {
                bail!("embedding worker channel closed unexpectedly")
            }
        }
    }
}

fn worker_loop<E: Embedder>(
    worker_id: usize,
    receiver: Receiver<EmbeddingTask>,
    sender: Sender<EmbeddingResult>,
    embedder: E,
) {
    for EmbeddingTask { id, chunks } in receiver.iter() {
        debug!(worker = worker_id, batch = id, chunks = chunks.len(), "embedding batch");
        let result = embed_chunks(&embedder, &chunks)
            .map(|records| EmbeddedBatch { id, records })
            .map_err(|err| {
                anyhow!(
                    "worker {} failed batch {} ({} chunks): {:#}",
                    worker_id,
                    id,
                    chunks.len(),
                    err
                )
            });
        if sender.send(result).is_err() {
            break;
        }
    }
}

fn embed_chunks<E: Embedder + ?Sized>(
    embedder: &E,
    chunks: &[Chunk],
) -> Result<Vec<VectorRecord>> {
    let inputs: Vec<&str> = chunks.iter().map(|chunk| chunk.content.as_str()).collect();
    let vectors = embedder.embed_batch(&inputs)?;
    anyhow::ensure!(
        vectors.len() == chunks.len(),
        "embedding count {} mismatched pending {}",
        vectors.len(),
        chunks.len()
    );
    Ok(chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| VectorRecord::from_chunk(chunk, vector))
        .collect())
}

struct EmbeddingTask {
    id: usize,
    chunks: Vec<Chunk>,
}

struct EmbeddedBatch {
    id: usize,
    records: Vec<VectorRecord>,
}

type EmbeddingResult = Result<EmbeddedBatch>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkId, ChunkKind, ChunkStrategy};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    #[derive(Clone)]
    struct SlowFirstEmbedder {
        fail_on: Option<&'static str>,
    }

    impl Embedder for SlowFirstEmbedder {
        fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
            if inputs.iter().any(|text| Some(*text) == self.fail_on) {
                bail!("model rejected input");
            }
            // Early batches finish last so reordering is exercised.
            if inputs.first() == Some(&"text 0") {
                thread::sleep(Duration::from_millis(50));
            }
            Ok(inputs.iter().map(|text| vec![text.len() as f32, 1.0, 0.0]).collect())
        }

        fn batch_size(&self) -> usize {
            64
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        dims: RefCell<Vec<usize>>,
        upserts: RefCell<Vec<Vec<String>>>,
    }

    impl VectorSink for RecordingSink {
        fn ensure_collection(&self, dims: usize) -> Result<()> {
            self.dims.borrow_mut().push(dims);
            Ok(())
        }

        fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
            self.upserts.borrow_mut().push(
                records
                    .iter()
                    .map(|record| record.payload.chunk_id.to_string())
                    .collect(),
            );
            Ok(())
        }
    }

    fn chunk(id: &str, kind: ChunkKind, content: &str) -> Chunk {
        Chunk {
            id: ChunkId::new(id),
            content: content.to_string(),
            parent_id: (kind == ChunkKind::Child).then(|| ChunkId::new("doc-p0")),
            source_file: "docs/doc.md".to_string(),
            section_path: Vec::new(),
            kind,
            strategy: ChunkStrategy::Recursive,
        }
    }

    fn corpus(children: usize) -> Vec<Chunk> {
        let mut chunks = vec![chunk("doc-p0", ChunkKind::Parent, "## P\nparent.")];
        chunks.extend(
            (0..children)
                .map(|n| chunk(&format!("doc-p0-c{n}"), ChunkKind::Child, &format!("text {n}"))),
        );
        chunks
    }

    #[test]
    fn upserts_follow_source_order_across_workers() {
        let sink = RecordingSink::default();
        let embedder = SlowFirstEmbedder { fail_on: None };
        let options = IndexOptions {
            batch_size: 2,
            workers: 3,
        };
        let report = index_children(&corpus(7), &embedder, &sink, options).unwrap();

        assert_eq!(report, IndexReport { batches: 4, indexed: 7 });
        assert_eq!(*sink.dims.borrow(), vec![3]);
        let flattened: Vec<String> = sink.upserts.borrow().iter().flatten().cloned().collect();
        let expected: Vec<String> = (0..7).map(|n| format!("doc-p0-c{n}")).collect();
        assert_eq!(flattened, expected);
        assert_eq!(sink.upserts.borrow()[3], vec!["doc-p0-c6".to_string()]);
    }

    #[test]
    fn single_worker_matches_many_workers() {
        let one = RecordingSink::default();
        let many = RecordingSink::default();
        let embedder = SlowFirstEmbedder { fail_on: None };
        let chunks = corpus(11);
        let options = |workers| IndexOptions {
            batch_size: 3,
            workers,
        };
        index_children(&chunks, &embedder, &one, options(1)).unwrap();
        index_children(&chunks, &embedder, &many, options(4)).unwrap();
        assert_eq!(*one.upserts.borrow(), *many.upserts.borrow());
    }

    #[test]
    fn no_children_means_no_collection_calls() {
        let sink = RecordingSink::default();
        let chunks = vec![chunk("doc-p0", ChunkKind::Parent, "## P\nparent.")];
        let report = index_children(
            &chunks,
            &SlowFirstEmbedder { fail_on: None },
            &sink,
            IndexOptions::default(),
        )
        .unwrap();
        assert_eq!(report, IndexReport::default());
        assert!(sink.dims.borrow().is_empty());
    }

    #[test]
    fn failed_batch_aborts_indexing() {
        let sink = RecordingSink::default();
        let embedder = SlowFirstEmbedder {
            fail_on: Some("text 3"),
        };
        let err = index_children(
            &corpus(6),
            &embedder,
            &sink,
            IndexOptions {
                batch_size: 2,
                workers: 2,
            },
        )
        .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("failed batch 1"), "{message}");
        assert!(message.contains("model rejected input"), "{message}");
    }
}
