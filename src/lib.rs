//! Transcript Service - a small HTTP facade over YouTube caption tracks
//!
//! Given an 11-character video identifier, the service retrieves the video's
//! caption track, collapses it into a single block of plain text and returns
//! it as JSON. Caption retrieval sits behind the [`CaptionSource`] trait so the
//! scraping mechanism can be swapped without touching the request handling.

pub mod captions;
pub mod cli;
pub mod config;
pub mod output;
pub mod server;
pub mod transcript;
pub mod utils;

pub use captions::{CaptionError, CaptionFragment, CaptionSource, CaptionTrackInfo};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use server::{build_router, AppState};
pub use transcript::{TranscriptError, TranscriptService};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types raised while bootstrapping the service
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),
}
