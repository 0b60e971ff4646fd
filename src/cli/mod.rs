//! CLI module for Fortell.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Fortell - Article-to-Video and RAG
///
/// Turn web articles into narrated, captioned short videos and chat with the
/// scraped content. The name "Fortell" comes from the Norwegian word for
/// "tell."
#[derive(Parser, Debug)]
#[command(name = "fortell")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Fortell and verify system requirements
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Summarize an article into three narrated stories and index it
    Summarize {
        /// Article URL
        url: String,

        /// Acting user ID
        #[arg(short, long, default_value = "local")]
        user: String,
    },

    /// Compose and publish the video for an existing story bundle
    BuildVideo {
        /// Story bundle name returned by summarize
        dir: String,

        /// Acting user ID
        #[arg(short, long, default_value = "local")]
        user: String,
    },

    /// Start an interactive RAG chat session over indexed articles
    Chat {
        /// Restrict retrieval to one document ID
        #[arg(short, long)]
        doc: Option<String>,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Search the retrieval index
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Restrict to one document ID
        #[arg(short, long)]
        doc: Option<String>,
    },

    /// List indexed documents
    List,

    /// Manage user accounts and credits
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    /// Create a user account
    Add {
        /// User ID
        id: String,
        /// Display name
        #[arg(short, long)]
        name: Option<String>,
        /// Initial credit balance
        #[arg(short, long, default_value = "5")]
        credits: i64,
    },

    /// Show a user's balance
    Show {
        /// User ID
        id: String,
    },

    /// Add credits to a user
    Topup {
        /// User ID
        id: String,
        /// Credits to add
        amount: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
