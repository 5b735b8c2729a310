//! Command-line interface definition.
//!
//! A thin `clap` surface over the library: account registration, document
//! ingestion, index status, thread listing, and a single-user `ask` flow.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter configuration file to the platform config directory.
    Init,

    /// Register a user account.
    Register {
        username: String,
        password: String,

        #[arg(short, long)]
        email: Option<String>,
    },

    /// Log in and print a session token.
    Login {
        username: String,
        password: String,
    },

    /// List conversation threads, newest first.
    #[clap(alias = "ls")]
    Threads,

    /// Ingest a pre-extracted text file into the document index. Chunks are
    /// separated by blank lines.
    Ingest {
        file: PathBuf,

        /// Source name recorded for attribution; defaults to the file name.
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Show whether the document index exists and how many documents it holds.
    Status,

    /// Ask a question in anonymous single-user mode.
    #[clap(alias = "a")]
    Ask {
        question: String,

        /// Client name used to personalize the suggestions.
        #[arg(short, long)]
        client: Option<String>,

        /// Continue an existing thread instead of starting a new one.
        #[arg(short, long)]
        thread: Option<String>,

        /// Skip the answer cache for this question.
        #[arg(long)]
        regenerate: bool,
    },
}
