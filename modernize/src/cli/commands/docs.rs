//! `modernize docs`

use anyhow::{Context, Result};
use colored::*;
use std::fs;

use crate::cli::{DocsArgs, DocsFormat, LibraryChoice};
use modernize::functions::FunctionRegistry;
use modernize::functions::docs::{render_json, render_markdown};

pub fn handle_docs_command(args: DocsArgs) -> Result<()> {
    let registries: Vec<&FunctionRegistry> = match args.library {
        LibraryChoice::General => vec![FunctionRegistry::general()],
        LibraryChoice::Publishing => vec![FunctionRegistry::publishing()],
        LibraryChoice::All => vec![FunctionRegistry::general(), FunctionRegistry::publishing()],
    };

    let rendered = match args.format {
        DocsFormat::Markdown => registries
            .iter()
            .map(|r| render_markdown(r))
            .collect::<Vec<_>>()
            .join("\n"),
        DocsFormat::Json => render_json(&registries).context("Failed to serialize function documentation")?,
    };

    match args.output {
        Some(path) => {
            fs::write(&path, &rendered)
                .with_context(|| format!("Failed to write documentation to: {}", path.display()))?;
            let count: usize = registries.iter().map(|r| r.len()).sum();
            println!(
                "Documented {} functions in {}",
                count.to_string().bold(),
                path.display().to_string().bright_green()
            );
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
