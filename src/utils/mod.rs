use std::fmt;
use url::Url;

/// Number of characters in a platform video identifier
pub const VIDEO_ID_LEN: usize = 11;

/// An identifier that passed the length check. The character set is not
/// inspected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Accept exactly [`VIDEO_ID_LEN`] characters, nothing else
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.chars().count() == VIDEO_ID_LEN {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check whether a host belongs to YouTube
pub fn is_youtube_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "youtube.com" || host == "youtu.be" || host.ends_with(".youtube.com")
}

/// Resolve a bare identifier or a watch / short / embed / youtu.be URL to an
/// identifier
pub fn extract_video_id(input: &str) -> Option<VideoId> {
    let input = input.trim();
    if !input.starts_with("http://") && !input.starts_with("https://") {
        return VideoId::parse(input);
    }

    let url = Url::parse(input).ok()?;
    let host = url.host_str()?;
    if !is_youtube_host(host) {
        return None;
    }

    if host.eq_ignore_ascii_case("youtu.be") {
        let segment = url.path_segments()?.next()?;
        return VideoId::parse(segment);
    }

    if url.path() == "/watch" {
        let (_, value) = url.query_pairs().find(|(key, _)| key == "v")?;
        return VideoId::parse(&value);
    }

    let mut segments = url.path_segments()?;
    match (segments.next(), segments.next()) {
        (Some("shorts" | "embed" | "v" | "live"), Some(id)) => VideoId::parse(id),
        _ => None,
    }
}
