//! CLI module for Podweave.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{format_size, Output};

use clap::{Parser, Subcommand};

/// Podweave - Generative podcast conversations
///
/// Turns articles, web pages and notes into a two-host podcast: first a
/// speaker-tagged transcript, then a single audio file.
#[derive(Parser, Debug)]
#[command(name = "podweave")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "PODWEAVE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a podcast from URLs, files or text
    Generate {
        /// Web page URLs, local file paths, or literal text
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Chunk the content and generate a long multi-part conversation
        #[arg(short, long)]
        longform: bool,

        /// Stop after writing the transcript
        #[arg(long)]
        transcript_only: bool,

        /// Audio output file (default: <data_dir>/audio/podcast_<id>.<ext>)
        #[arg(short, long)]
        output: Option<String>,

        /// Podcast name used in the introduction
        #[arg(long)]
        name: Option<String>,
    },

    /// Render a saved transcript to audio
    Synthesize {
        /// Speaker-tagged transcript file
        transcript: String,

        /// Audio output file
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Export a saved transcript in another format
    Export {
        /// Speaker-tagged transcript file
        transcript: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,

        /// Output format (tagged, plain, json)
        #[arg(long, default_value = "plain")]
        format: String,
    },

    /// Check system requirements and configuration
    Doctor,

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

    /// Show configuration file path
    Path,

    /// Open configuration file in editor
    Edit,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
