use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::captions::{CaptionError, CaptionFragment, CaptionSource};
use crate::utils::VideoId;

/// Cleaned transcript for one video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// Identifier the transcript belongs to
    pub video_id: String,

    /// All fragments, whitespace-normalized and joined with single spaces
    pub transcript: String,

    /// Fragments as delivered by the caption source
    pub fragments: Vec<CaptionFragment>,
}

/// Everything that can go wrong while producing a transcript
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("Invalid video ID")]
    InvalidVideoId,

    #[error("Transcript is disabled for this video")]
    Disabled,

    #[error("No transcript found")]
    NotFound,

    #[error("Video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("Empty transcript")]
    Empty,

    #[error("Transcript fetch failed: {0}")]
    Upstream(String),
}

impl From<CaptionError> for TranscriptError {
    fn from(err: CaptionError) -> Self {
        match err {
            CaptionError::Disabled => TranscriptError::Disabled,
            CaptionError::NotFound => TranscriptError::NotFound,
            CaptionError::VideoUnavailable(reason) => TranscriptError::VideoUnavailable(reason),
            CaptionError::Unknown(detail) => TranscriptError::Upstream(detail),
        }
    }
}

/// Trim a fragment and collapse every internal whitespace run to one space
pub fn normalize_fragment(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Join fragments in their original order. Fragments that are blank after
/// normalization are skipped so no double spaces appear.
pub fn join_fragments(fragments: &[CaptionFragment]) -> String {
    fragments
        .iter()
        .map(|fragment| normalize_fragment(&fragment.text))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Validates identifiers, calls the caption source and cleans its output
#[derive(Clone)]
pub struct TranscriptService {
    source: Arc<dyn CaptionSource>,
}

impl TranscriptService {
    pub fn new(source: Arc<dyn CaptionSource>) -> Self {
        Self { source }
    }

    /// Name of the underlying caption source
    pub fn source_name(&self) -> &'static str {
        self.source.source_name()
    }

    /// Fetch and normalize the transcript of `raw_id`. Invalid identifiers are
    /// rejected before the caption source is contacted.
    pub async fn fetch_transcript(&self, raw_id: &str) -> Result<TranscriptResult, TranscriptError> {
        let video_id = VideoId::parse(raw_id).ok_or(TranscriptError::InvalidVideoId)?;

        tracing::info!(
            video_id = %video_id,
            source = self.source.source_name(),
            "Fetching transcript"
        );

        let fragments = self.source.fetch_captions(video_id.as_str()).await?;
        if fragments.is_empty() {
            return Err(TranscriptError::NotFound);
        }

        let transcript = join_fragments(&fragments);
        if transcript.is_empty() {
            return Err(TranscriptError::Empty);
        }

        tracing::debug!(
            video_id = %video_id,
            fragments = fragments.len(),
            chars = transcript.chars().count(),
            "Transcript ready"
        );

        Ok(TranscriptResult {
            video_id: video_id.into_inner(),
            transcript,
            fragments,
        })
    }
}
