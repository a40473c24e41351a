mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;

use cli::commands::{docs, parse, run};
use cli::{Cli, Commands};
use modernize::Config;

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = execute(cli) {
        eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => {
            Config::load(path).with_context(|| format!("Failed to load config: {}", path.display()))?
        }
        None => Config::load_default().context("Failed to load config")?,
    };

    init_logging(cli.verbose, &config);
    log::debug!("Using settings {:?}", config.transform);

    match cli.command {
        Commands::Docs(args) => docs::handle_docs_command(args),
        Commands::Parse(args) => parse::handle_parse_command(args),
        Commands::Run(args) => run::handle_run_command(args, &config),
    }
}

/// `RUST_LOG` wins over the configured level; `-v` flags win over both
fn init_logging(verbose: u8, config: &Config) {
    let default = config.logging.level.as_filter().to_string().to_lowercase();
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default));

    let level = match verbose {
        0 => None,
        1 => Some(log::LevelFilter::Info),
        2 => Some(log::LevelFilter::Debug),
        _ => Some(log::LevelFilter::Trace),
    };
    if let Some(level) = level {
        builder.filter_level(level);
    }

    builder.format_timestamp(None).init();
}
