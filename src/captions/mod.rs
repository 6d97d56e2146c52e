use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod youtube;

pub use youtube::YoutubeCaptionSource;

/// A single timed caption line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionFragment {
    /// Caption text as published, entities already decoded
    pub text: String,

    /// Language of the track the fragment came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,

    /// Start offset in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,

    /// Duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl CaptionFragment {
    /// Fragment carrying only text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language_code: None,
            start: None,
            duration: None,
        }
    }

    /// Tag the fragment with its track language
    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = Some(language_code.into());
        self
    }

    /// Attach start offset and duration, both in seconds
    pub fn with_timing(mut self, start: f64, duration: f64) -> Self {
        self.start = Some(start);
        self.duration = Some(duration);
        self
    }
}

/// One entry of a video's caption track list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrackInfo {
    /// BCP-47-ish language code, e.g. `en` or `pt-BR`
    pub language_code: String,

    /// Human readable track name
    pub name: String,

    /// Timed-text download URL
    pub base_url: String,

    /// True for automatic speech recognition tracks
    pub is_generated: bool,
}

/// Classified caption retrieval failures
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptionError {
    #[error("Captions are disabled for this video")]
    Disabled,

    #[error("No caption track found")]
    NotFound,

    #[error("Video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("Caption retrieval failed: {0}")]
    Unknown(String),
}

impl From<reqwest::Error> for CaptionError {
    fn from(err: reqwest::Error) -> Self {
        CaptionError::Unknown(err.to_string())
    }
}

/// Anything that can produce the ordered caption fragments of a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Fetch the caption fragments of `video_id` in time order
    async fn fetch_captions(&self, video_id: &str) -> Result<Vec<CaptionFragment>, CaptionError>;

    /// Short name used in logs
    fn source_name(&self) -> &'static str;
}

/// Pick the track to download: the preferred language if offered, otherwise
/// the first track in the list.
pub fn select_track<'a>(
    tracks: &'a [CaptionTrackInfo],
    preferred_language: &str,
) -> Option<&'a CaptionTrackInfo> {
    tracks
        .iter()
        .find(|track| track.language_code == preferred_language)
        .or_else(|| tracks.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(code: &str) -> CaptionTrackInfo {
        CaptionTrackInfo {
            language_code: code.to_string(),
            name: code.to_uppercase(),
            base_url: format!("https://example.com/timedtext?lang={}", code),
            is_generated: false,
        }
    }

    #[test]
    fn test_select_track_prefers_requested_language() {
        let tracks = vec![track("de"), track("en"), track("fr")];
        let chosen = select_track(&tracks, "en").unwrap();
        assert_eq!(chosen.language_code, "en");
    }

    #[test]
    fn test_select_track_falls_back_to_first() {
        let tracks = vec![track("de"), track("fr")];
        let chosen = select_track(&tracks, "en").unwrap();
        assert_eq!(chosen.language_code, "de");
    }

    #[test]
    fn test_select_track_requires_exact_code() {
        // "en-GB" is not the "en" track; the first entry wins
        let tracks = vec![track("es"), track("en-GB")];
        assert_eq!(select_track(&tracks, "en").unwrap().language_code, "es");
    }

    #[test]
    fn test_select_track_empty_list() {
        assert!(select_track(&[], "en").is_none());
    }

    #[test]
    fn test_fragment_builders() {
        let fragment = CaptionFragment::new("hi").with_language("en").with_timing(1.5, 2.0);
        assert_eq!(fragment.text, "hi");
        assert_eq!(fragment.language_code.as_deref(), Some("en"));
        assert_eq!(fragment.start, Some(1.5));
        assert_eq!(fragment.duration, Some(2.0));
    }
}
