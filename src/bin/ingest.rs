use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use documind::chunker::{ChunkerConfig, HierarchicalChunker, DEFAULT_CHILD_MAX_CHARS};
use documind::document::DEFAULT_ANCHOR_DIR;
use documind::ingest::run_ingest;
use documind::settings;

#[derive(Parser, Debug)]
#[command(
    name = "documind-ingest",
    about = "Chunk a Markdown documentation tree into parent sections and child fragments"
)]
struct IngestCli {
    /// Source directory containing .md files
    #[arg(short, long, env = "DOCUMIND_SOURCE")]
    source: PathBuf,

    /// Output directory for chunks.json
    #[arg(short, long, env = "DOCUMIND_OUTPUT", default_value = "data")]
    output: PathBuf,

    /// Directory name whose descendants form each document's section path
    #[arg(long, env = "DOCUMIND_ANCHOR_DIR", default_value = DEFAULT_ANCHOR_DIR)]
    anchor: String,

    /// Character ceiling for child fragments
    #[arg(long, env = "DOCUMIND_CHILD_MAX_CHARS", default_value_t = DEFAULT_CHILD_MAX_CHARS)]
    child_max_chars: usize,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    settings::init_tracing();
    let cli = IngestCli::parse();

    let chunker = HierarchicalChunker::new(ChunkerConfig {
        child_max_chars: cli.child_max_chars.max(1),
        ..ChunkerConfig::default()
    });
    let summary = run_ingest(&cli.source, &cli.output, &cli.anchor, &chunker)
        .with_context(|| format!("failed to ingest {}", cli.source.display()))?;

    println!("Found {} markdown files", summary.documents);
    println!("Created {} chunks", summary.counts.total());
    println!("   - Parents: {}", summary.counts.parents);
    println!("   - Children: {}", summary.counts.children);
    println!("Saved to {}", summary.output.display());
    Ok(())
}
