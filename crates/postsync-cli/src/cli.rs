use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "postsync")]
#[command(about = "Browse a remote post feed with likes kept on this machine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Override the API base URL from the config file
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Skip the connectivity check and read from the local cache
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the first page (remote when reachable, cache otherwise)
    #[command(alias = "ls")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reload the feed from the first page
    Refresh {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load the feed and page further into it
    Browse {
        /// Number of extra pages to fetch after the first
        #[arg(short, long, default_value = "1")]
        pages: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle the like on a post
    Like {
        /// Post ID
        id: String,
    },
    /// Show the cached snapshot without touching the network
    Cached {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or write the client config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective config (file plus environment overrides)
    Show,
    /// Create or update the config file
    Init {
        /// API base URL serving `/posts`
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
        /// `host:port` used for connectivity checks
        #[arg(long, value_name = "ADDR")]
        probe_address: Option<String>,
        /// Posts per page
        #[arg(long)]
        page_size: Option<u32>,
        /// Retry a failed page instead of skipping it
        #[arg(long)]
        retry_failed_pages: bool,
        /// Store likes on posts that were never cached
        #[arg(long)]
        persist_unsynced_likes: bool,
    },
}
