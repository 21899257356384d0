use std::collections::HashSet;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use documind::citation::{process_answer, GeneratedAnswer};
use documind::expander::expand_to_parents;
use documind::llm::accumulate;
use documind::parent_store::{ParentStore, DEFAULT_PARENT_STORE};
use documind::prompt::{build_citation_legend, build_prompt, render_context, CitationLegendEntry};
use documind::search::{search, DEFAULT_TOP_K};
use documind::settings::{self, EmbedderArgs, ProviderArgs, QdrantArgs};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "documind-query",
    about = "Answer a question from the indexed documentation with checked citations"
)]
struct QueryCli {
    /// Question to answer
    question: String,

    /// Number of child fragments retrieved before parent expansion
    #[arg(long, env = "DOCUMIND_TOP_K", default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Parent store JSON file
    #[arg(long, env = "DOCUMIND_PARENT_STORE", default_value = DEFAULT_PARENT_STORE)]
    parent_store: PathBuf,

    /// Print the answer as it is generated
    #[arg(long, default_value_t = false)]
    stream: bool,

    /// Only print the retrieved context and prompt (skip LLM call)
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    #[command(flatten)]
    embedder: EmbedderArgs,

    #[command(flatten)]
    qdrant: QdrantArgs,

    #[command(flatten)]
    provider: ProviderArgs,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    settings::init_tracing();
    let cli = QueryCli::parse();

    let provider = if cli.dry_run {
        None
    } else {
        Some(cli.provider.build(cli.embedder.openai_api_key.as_deref())?)
    };
    let embedder = cli.embedder.build(&cli.qdrant)?;
    let vectors = cli.qdrant.connect()?;
    let store = ParentStore::open(&cli.parent_store)?;

    let hits = search(&cli.question, &embedder, &vectors, cli.top_k.max(1))?;
    let parents = expand_to_parents(&hits, &store);
    let referenced: HashSet<_> = hits.iter().map(|hit| &hit.parent_id).collect();
    if parents.len() < referenced.len() {
        warn!(
            referenced = referenced.len(),
            resolved = parents.len(),
            "some parents are missing from the store; was indexing interrupted?"
        );
    }
    info!(hits = hits.len(), parents = parents.len(), "retrieved context");

    let prompt = build_prompt(&cli.question, &parents);
    let legend = build_citation_legend(&parents);

    let Some(provider) = provider else {
        println!("--- Retrieved Context ---\n{}\n", render_context(&parents));
        println!("--- Prompt ---\n{prompt}\n");
        print_legend(&legend);
        println!("dry-run enabled; skipping LLM call.");
        return Ok(());
    };

    let request = cli.provider.request(&prompt);
    let text = if cli.stream {
        println!("--- Answer ---");
        let stream = provider.stream(&request)?;
        let mut stdout = io::stdout();
        let text = accumulate(stream, |fragment| {
            print!("{fragment}");
            let _ = stdout.flush();
        })
        .context("answer stream failed")?;
        println!();
        text
    } else {
        provider.answer(&request)?
    };

    let answer = process_answer(&text, parents.len());
    if !cli.stream {
        println!("--- Answer ---\n{}", answer.text);
    }
    println!();
    print_legend(&legend);
    print_citations(&answer);
    Ok(())
}

fn print_legend(legend: &[CitationLegendEntry]) {
    if legend.is_empty() {
        println!("--- Sources ---\n(none)");
        return;
    }
    println!("--- Sources ---");
    for entry in legend {
        if entry.section.is_empty() {
            println!("[{}] {}", entry.number, entry.source);
        } else {
            println!("[{}] {} ({})", entry.number, entry.source, entry.section);
        }
    }
}

fn print_citations(answer: &GeneratedAnswer) {
    let cited: Vec<String> = answer
        .unique_citations
        .iter()
        .map(|n| format!("[{n}]"))
        .collect();
    println!(
        "\nCited: {}",
        if cited.is_empty() {
            "none".to_string()
        } else {
            cited.join(" ")
        }
    );
    let ignored = answer
        .citations
        .iter()
        .filter(|n| !answer.unique_citations.contains(*n))
        .count();
    if ignored > 0 {
        println!("Ignored {ignored} out-of-range citation marker(s)");
    }
    println!("Confidence: {}", answer.confidence);
}
