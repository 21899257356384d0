use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use documind::chunk::{read_chunks, Chunk, ChunkCounts};
use documind::indexer::{index_children, IndexOptions};
use documind::parent_store::{ParentStore, DEFAULT_PARENT_STORE};
use documind::settings::{self, EmbedderArgs, QdrantArgs};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "documind-index",
    about = "Store parent sections and embed child fragments into Qdrant"
)]
struct IndexCli {
    /// Path to the chunks.json produced by documind-ingest
    #[arg(short, long, env = "DOCUMIND_CHUNKS", default_value = "data/chunks.json")]
    chunks: PathBuf,

    /// Parent store JSON file
    #[arg(long, env = "DOCUMIND_PARENT_STORE", default_value = DEFAULT_PARENT_STORE)]
    parent_store: PathBuf,

    /// Number of concurrent embedding workers
    #[arg(
        long = "embed-threads",
        env = "DOCUMIND_EMBED_THREADS",
        default_value_t = 1,
        alias = "worker-threads"
    )]
    worker_threads: usize,

    #[command(flatten)]
    embedder: EmbedderArgs,

    #[command(flatten)]
    qdrant: QdrantArgs,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    settings::init_tracing();
    let cli = IndexCli::parse();

    let chunks = read_chunks(&cli.chunks)
        .with_context(|| format!("failed to load chunks from {}", cli.chunks.display()))?;
    let counts = ChunkCounts::of(&chunks);
    info!(parents = counts.parents, children = counts.children, "loaded chunks");

    let embedder = cli.embedder.build(&cli.qdrant)?;
    let vectors = cli.qdrant.connect()?;
    let mut store = ParentStore::open(&cli.parent_store)?;

    let parents: Vec<Chunk> = chunks.iter().filter(|c| c.is_parent()).cloned().collect();
    store
        .save(&parents)
        .context("failed to save parents to store")?;

    let report = index_children(
        &chunks,
        &embedder,
        &vectors,
        IndexOptions {
            batch_size: cli.embedder.batch_size,
            workers: cli.worker_threads,
        },
    )
    .context("failed to index child chunks")?;

    println!("{} parents, {} children", counts.parents, counts.children);
    println!(
        "Saved {} parents ({} in store at {})",
        parents.len(),
        store.len(),
        store.path().display()
    );
    println!(
        "Indexed {} children in {} batches into {}",
        report.indexed,
        report.batches,
        vectors.collection()
    );
    Ok(())
}
