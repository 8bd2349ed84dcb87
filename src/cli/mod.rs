//! CLI module for Lull.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Lull - Bedtime History Story Generator
///
/// A CLI tool that turns a historical topic into a long-form, calming
/// bedtime story: one outline, then chapters of 25 scenes each, generated
/// sequentially with checkpoints so interrupted runs can be resumed.
#[derive(Parser, Debug)]
#[command(name = "lull")]
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
    /// Initialize Lull and verify system requirements
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Generate a complete story for a topic
    Generate {
        /// Historical topic (e.g., "The fall of Constantinople")
        topic: String,

        /// Target total word count (defaults to config value)
        #[arg(short, long)]
        words: Option<u32>,
    },

    /// Resume an interrupted run from its last checkpoint
    Resume {
        /// Run ID to resume (see 'lull runs')
        run_id: String,
    },

    /// Generate a story for the next unprocessed topic prompt
    Next,

    /// Show topic prompt queue status
    Status {
        /// Clear all recorded progress and start the queue over
        #[arg(long)]
        reset: bool,
    },

    /// List checkpointed runs
    Runs,

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

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "story.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
