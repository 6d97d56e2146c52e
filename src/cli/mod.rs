use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "transcript-service",
    about = "Transcript Service - Serve YouTube caption tracks as clean text over HTTP",
    version,
    long_about = "A small HTTP service that takes an 11-character YouTube video ID, downloads the video's caption track (English preferred) and returns it as a single whitespace-normalized block of text."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./config.yaml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Interface to bind
    #[arg(long, global = true, env = "HOST", value_name = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, global = true, env = "PORT", value_name = "PORT")]
    pub port: Option<u16>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve,

    /// Fetch one transcript and print or save it
    Fetch {
        /// Video ID or YouTube URL
        #[arg(value_name = "VIDEO_ID_OR_URL")]
        video: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the caption tracks offered for a video
    Tracks {
        /// Video ID or YouTube URL
        #[arg(value_name = "VIDEO_ID_OR_URL")]
        video: String,
    },

    /// Show the effective configuration
    Config,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with fragments and timings
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
