//! CLI definitions using clap.
//!
//! One subcommand per tool-surface operation of SPEC_FULL.md §6, plus
//! `init`/`version`/`completions` housekeeping. This layer only parses
//! arguments and formats output; all business logic lives in the library
//! (`storage`, `tools`) so the CLI and the JSON tool surface are two thin
//! callers of the same underlying functions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// mnemex - a persistent per-project memory engine for long-running AI coding agents.
#[derive(Parser, Debug)]
#[command(name = "mnemex", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: platform data dir, or $MNEMEX_DB)
    #[arg(long, global = true, env = "MNEMEX_DB")]
    pub db: Option<PathBuf>,

    /// Default project id for commands that accept a scope
    #[arg(long, global = true)]
    pub project_id: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the database and configuration file
    Init {
        /// Overwrite an existing database
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Store a memory (subject to deduplication unless --force)
    Store(StoreArgs),

    /// Full-text search, re-ranked by recency and access frequency
    Search(SearchArgs),

    /// Patch fields on an existing memory
    Update(UpdateArgs),

    /// Delete a memory and every tag/link touching it
    Delete {
        id: String,
    },

    /// List memories under a scope/filter
    List(ListArgs),

    /// Total count and per-category breakdown
    Stats,

    /// Bump access tracking on a memory, as if returned by a search
    Refresh {
        id: String,
    },

    /// Manage tags on memories
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },

    /// Manage typed links between memories
    Link {
        #[command(subcommand)]
        command: LinkCommands,
    },

    /// Optimize the index, optionally purge and vacuum, enforce the cap
    Cleanup {
        /// Purge memories untouched for this many days
        #[arg(long)]
        purge_days: Option<i64>,

        /// Reclaim freed space after purging
        #[arg(long)]
        vacuum: bool,
    },

    /// Export the whole store as a single v1 JSON document
    Export {
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Import a v1 JSON document
    Import {
        /// Read from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Check the file knowledge cache's freshness for a single path
    FileCheck {
        path: String,
        #[arg(long)]
        project_id: Option<String>,
    },
}

/// Supported shells for completions.
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Args, Debug)]
pub struct StoreArgs {
    pub content: String,

    #[arg(short, long)]
    pub category: Option<String>,

    #[arg(long)]
    pub session_id: Option<String>,

    #[arg(long)]
    pub project_id: Option<String>,

    #[arg(long)]
    pub source: Option<String>,

    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Pin this memory's `project_id` to null regardless of --project-id
    #[arg(long)]
    pub global: bool,

    /// Bypass the deduplicator entirely
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub query: String,

    #[arg(long)]
    pub project_id: Option<String>,

    /// Scope: project, global, or all (default)
    #[arg(long)]
    pub scope: Option<String>,

    /// Non-positive values are ignored and the configured default prevails
    #[arg(short, long)]
    pub limit: Option<i64>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: String,

    #[arg(short, long)]
    pub content: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub source: Option<String>,

    #[arg(long)]
    pub session_id: Option<String>,

    /// Reassign the project id; pass an empty string to clear it (make global)
    #[arg(long)]
    pub project_id: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub project_id: Option<String>,

    #[arg(long)]
    pub session_id: Option<String>,

    #[arg(long)]
    pub scope: Option<String>,

    #[arg(short, long)]
    pub limit: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum TagCommands {
    /// Add tags to a memory
    Add {
        id: String,
        #[arg(short, long, value_delimiter = ',', required = true)]
        tags: Vec<String>,
    },
    /// Remove tags from a memory
    Remove {
        id: String,
        #[arg(short, long, value_delimiter = ',', required = true)]
        tags: Vec<String>,
    },
    /// Replace a memory's tags wholesale
    Set {
        id: String,
        #[arg(short, long, value_delimiter = ',', required = true)]
        tags: Vec<String>,
    },
    /// List a memory's tags
    List { id: String },
    /// List every tag in use, with usage counts
    ListAll,
    /// Find memories carrying a tag
    Search {
        tag: String,
        #[arg(long)]
        project_id: Option<String>,
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
}

#[derive(Subcommand, Debug)]
pub enum LinkCommands {
    /// Create a typed link between two memories
    Add {
        source: String,
        target: String,
        /// related, supersedes, contradicts, or extends
        relationship: String,
    },
    /// Remove the link between two memories
    Remove { source: String, target: String },
    /// List the links touching a memory
    List { id: String },
}
