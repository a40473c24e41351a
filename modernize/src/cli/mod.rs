//! Command-line arguments

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use modernize::mapping::WebPartKind;

/// Generate mapping function documentation and dry-run page mappings offline
#[derive(Parser, Debug)]
#[command(name = "modernize", version, about, long_about = None, propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the built-in function documentation
    Docs(DocsArgs),
    /// Parse one function expression and show its structure
    Parse(ParseArgs),
    /// Process one web part against a mapping file
    Run(RunArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LibraryChoice {
    General,
    Publishing,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocsFormat {
    Markdown,
    Json,
}

#[derive(Parser, Debug)]
pub struct DocsArgs {
    /// Which library to document
    #[arg(short, long, value_enum, default_value = "all")]
    pub library: LibraryChoice,

    #[arg(short, long, value_enum, default_value = "markdown")]
    pub format: DocsFormat,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ParseArgs {
    /// Function expression, or a `;` separated chain
    #[arg(value_name = "EXPRESSION")]
    pub expression: String,

    /// Property the expression is attached to; selectors have none
    #[arg(short, long)]
    pub property: Option<String>,
}

/// Web part kind as given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Classic,
    ClientSide,
    AddIn,
}

impl From<KindArg> for WebPartKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Classic => WebPartKind::Classic,
            KindArg::ClientSide => WebPartKind::ClientSide,
            KindArg::AddIn => WebPartKind::AddIn,
        }
    }
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Web part mapping file (XML)
    #[arg(short, long)]
    pub mapping: PathBuf,

    /// Web part type to look up in the mapping file
    #[arg(short, long)]
    pub web_part: String,

    /// Kind of the legacy web part
    #[arg(short, long, value_enum, default_value = "classic")]
    pub kind: KindArg,

    /// JSON object holding the web part's properties
    #[arg(short, long)]
    pub properties: PathBuf,

    /// JSON snapshot of the source site
    #[arg(short, long)]
    pub source: PathBuf,

    /// Absolute url of the target web for cross-site runs
    #[arg(short, long)]
    pub target_web: Option<String>,

    /// Local folder transferred assets are written to
    #[arg(short, long)]
    pub assets: Option<PathBuf>,

    /// CSV file mapping source to target identities
    #[arg(short, long)]
    pub users: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}
