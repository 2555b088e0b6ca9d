//! CLI module for Studyflow.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Studyflow - AI study assistant
///
/// Generates practice questions, analyses test results and recommends books and
/// lecture videos for the topics a student struggles with.
#[derive(Parser, Debug)]
#[command(name = "studyflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
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
    /// Check API keys and configuration
    Doctor,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Dispatch a raw agent request and print the JSON response
    Run {
        /// Request JSON, or @path to read it from a file
        request: String,
    },

    /// Generate practice questions
    Questions {
        #[arg(short, long)]
        subject: String,

        #[arg(short, long)]
        topic: String,

        /// Number of questions
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// easy, medium or hard
        #[arg(short, long)]
        difficulty: Option<String>,
    },

    /// Run a full learning cycle: analysis, then book and video recommendations
    Cycle {
        #[arg(short, long)]
        subject: String,

        #[arg(short, long)]
        topic: Option<String>,

        /// Number of questions answered
        #[arg(long)]
        total: Option<u32>,

        /// Number of correct answers
        #[arg(long)]
        correct: Option<u32>,

        /// Known weak topic (repeatable)
        #[arg(short = 'w', long = "weak-topic")]
        weak_topics: Vec<String>,

        /// Save the results for this user
        #[arg(short, long)]
        user: Option<String>,

        /// Print the raw JSON outcome
        #[arg(long)]
        json: bool,
    },

    /// Show saved sessions and recommendations for a user
    History {
        user_id: String,

        /// Maximum number of entries
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
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
