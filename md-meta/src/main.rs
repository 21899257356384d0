use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use md_meta::{parse_markdown, Header};
use serde::Serialize;

/// Prints the resolved title and header outline of a Markdown page as JSON.
#[derive(Parser, Debug)]
#[command(name = "md-meta", version)]
struct MetaCli {
    /// Markdown file to inspect; `-` or nothing reads stdin
    input: Option<PathBuf>,
}

#[derive(Serialize)]
struct Outline<'a> {
    title: &'a str,
    headers: &'a [Header],
}

fn main() -> Result<()> {
    let cli = MetaCli::parse();
    let markdown = match cli.input.as_deref() {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let meta = parse_markdown(&markdown)?;
    let outline = Outline {
        title: &meta.title,
        headers: &meta.headers,
    };
    println!("{}", serde_json::to_string_pretty(&outline)?);
    Ok(())
}
