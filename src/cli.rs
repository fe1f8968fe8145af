use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::{fetch, service};

#[derive(Debug, Parser)]
#[command(
    name = "karpdocs",
    about = "Index and search the Karpenter documentation"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Use this index directory instead of <data-dir>/index
    #[arg(long, global = true, env = "KARPDOCS_DATABASE")]
    pub database: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the documentation and index it
    Index(IndexArgs),
    /// Show index statistics and the outcome of the last run
    Stats(StatsArgs),
    /// Search the indexed documentation
    Search(SearchArgs),
    /// Print one indexed page
    Read(ReadArgs),
    /// Start MCP server for AI agent integration
    Mcp,
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Index --

#[derive(Debug, Parser)]
pub struct IndexArgs {
    /// Replace the index content instead of updating it
    #[arg(long)]
    pub rebuild: bool,

    /// Branch of the documentation repository to fetch
    #[arg(long, default_value = fetch::DEFAULT_BRANCH)]
    pub branch: String,

    /// Index a local documentation tree instead of fetching it: a
    /// repository checkout, its website/ directory or website/content/en
    #[arg(long, conflicts_with = "branch")]
    pub path: Option<PathBuf>,
}

// -- Stats --

#[derive(Debug, Parser)]
pub struct StatsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Only return pages from this top-level section
    #[arg(short, long)]
    pub section: Option<String>,

    /// Number of results to return (1-50)
    #[arg(short = 'n', long, default_value_t = service::DEFAULT_LIMIT)]
    pub limit: usize,
}

// -- Read --

#[derive(Debug, Parser)]
pub struct ReadArgs {
    /// Page path relative to the documentation root
    pub path: String,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "karpdocs",
            &mut std::io::stdout(),
        );
    }
}
