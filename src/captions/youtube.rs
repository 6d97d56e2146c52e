use async_trait::async_trait;
use regex::Regex;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use super::{select_track, CaptionError, CaptionFragment, CaptionSource, CaptionTrackInfo};
use crate::config::CaptionConfig;
use crate::ServiceError;

const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse = ";
const RECAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";

static TEXT_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text\b([^>/]*)>(.*?)</text>").expect("valid regex"));
static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\w:-]+)="([^"]*)""#).expect("valid regex"));
static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Caption source that scrapes the YouTube watch page for its caption track
/// list and downloads the timed-text XML of the selected track
pub struct YoutubeCaptionSource {
    client: Client,
    base_url: Url,
    preferred_language: String,
}

impl YoutubeCaptionSource {
    pub fn new(config: &CaptionConfig) -> crate::Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|_| {
            ServiceError::InvalidConfig(format!("Invalid caption base URL: {}", config.base_url))
        })?;

        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ServiceError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            preferred_language: config.preferred_language.clone(),
        })
    }

    /// List the caption tracks offered for a video
    pub async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrackInfo>, CaptionError> {
        let mut watch_url = self
            .base_url
            .join("watch")
            .map_err(|e| CaptionError::Unknown(format!("Cannot build watch URL: {}", e)))?;
        watch_url.query_pairs_mut().append_pair("v", video_id);

        tracing::debug!("Fetching watch page: {}", watch_url);
        let html = self.get_text(watch_url.as_str()).await?;

        if html.contains(RECAPTCHA_MARKER) {
            return Err(CaptionError::Unknown(
                "Upstream answered with a captcha challenge (rate limited)".to_string(),
            ));
        }

        let player = extract_player_response(&html).ok_or_else(|| {
            CaptionError::Unknown("Player response not found in watch page".to_string())
        })?;

        parse_caption_tracks(&player)
    }

    /// Download and parse a single caption track
    async fn fetch_track(&self, track: &CaptionTrackInfo) -> Result<Vec<CaptionFragment>, CaptionError> {
        let url = self.resolve_track_url(&track.base_url)?;

        tracing::debug!("Downloading {} caption track", track.language_code);
        let xml = self.get_text(url.as_str()).await?;

        Ok(parse_timed_text(&xml, Some(&track.language_code)))
    }

    /// Track URLs are usually absolute; relative ones hang off the base URL.
    /// The default XML format is requested instead of srv3.
    fn resolve_track_url(&self, base_url: &str) -> Result<Url, CaptionError> {
        let cleaned = base_url.replace("&fmt=srv3", "");
        self.base_url
            .join(&cleaned)
            .map_err(|e| CaptionError::Unknown(format!("Invalid caption track URL: {}", e)))
    }

    async fn get_text(&self, url: &str) -> Result<String, CaptionError> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT_LANGUAGE, "en-US")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CaptionError::Unknown(
                "Upstream rate limited the request (HTTP 429)".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(CaptionError::Unknown(format!("Upstream returned HTTP {}", status)));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl CaptionSource for YoutubeCaptionSource {
    async fn fetch_captions(&self, video_id: &str) -> Result<Vec<CaptionFragment>, CaptionError> {
        let tracks = self.list_tracks(video_id).await?;

        let track = select_track(&tracks, &self.preferred_language).ok_or(CaptionError::NotFound)?;
        tracing::debug!(
            video_id,
            language = %track.language_code,
            generated = track.is_generated,
            "Selected caption track"
        );

        self.fetch_track(track).await
    }

    fn source_name(&self) -> &'static str {
        "YouTube"
    }
}

/// Pull the `ytInitialPlayerResponse` object out of a watch page. Only the
/// first JSON value after the marker is parsed; the rest of the script is
/// ignored.
fn extract_player_response(html: &str) -> Option<Value> {
    let start = html.find(PLAYER_RESPONSE_MARKER)? + PLAYER_RESPONSE_MARKER.len();
    let mut values = serde_json::Deserializer::from_str(&html[start..]).into_iter::<Value>();

    match values.next() {
        Some(Ok(value)) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Classify the caption section of a player response
fn parse_caption_tracks(player: &Value) -> Result<Vec<CaptionTrackInfo>, CaptionError> {
    let Some(raw_tracks) = player
        .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
        .and_then(Value::as_array)
    else {
        return Err(playability_error(player).unwrap_or(CaptionError::Disabled));
    };

    let tracks: Vec<CaptionTrackInfo> = raw_tracks.iter().filter_map(parse_track).collect();
    if tracks.is_empty() {
        return Err(CaptionError::NotFound);
    }

    Ok(tracks)
}

fn playability_error(player: &Value) -> Option<CaptionError> {
    let status = player.pointer("/playabilityStatus/status")?.as_str()?;
    if status == "OK" {
        return None;
    }

    let reason = player
        .pointer("/playabilityStatus/reason")
        .and_then(Value::as_str)
        .unwrap_or(status);
    Some(CaptionError::VideoUnavailable(reason.to_string()))
}

fn parse_track(raw: &Value) -> Option<CaptionTrackInfo> {
    let base_url = raw.get("baseUrl")?.as_str()?.to_string();
    let language_code = raw
        .get("languageCode")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let name = raw
        .pointer("/name/simpleText")
        .or_else(|| raw.pointer("/name/runs/0/text"))
        .and_then(Value::as_str)
        .unwrap_or(&language_code)
        .to_string();

    let is_generated = raw.get("kind").and_then(Value::as_str) == Some("asr");

    Some(CaptionTrackInfo {
        language_code,
        name,
        base_url,
        is_generated,
    })
}

/// Parse timed-text XML into fragments, keeping document order
pub fn parse_timed_text(xml: &str, language_code: Option<&str>) -> Vec<CaptionFragment> {
    TEXT_ELEMENT
        .captures_iter(xml)
        .map(|cap| {
            let attributes = &cap[1];
            let mut fragment = CaptionFragment::new(decode_caption_text(&cap[2]));
            fragment.language_code = language_code.map(str::to_string);
            fragment.start = attribute(attributes, "start").and_then(|v| v.parse().ok());
            fragment.duration = attribute(attributes, "dur").and_then(|v| v.parse().ok());
            fragment
        })
        .collect()
}

fn attribute<'a>(attributes: &'a str, name: &str) -> Option<&'a str> {
    ATTRIBUTE
        .captures_iter(attributes)
        .find(|cap| &cap[1] == name)
        .and_then(|cap| cap.get(2))
        .map(|m| m.as_str())
}

/// The XML layer escapes once and the caption payload escapes again, and
/// styling markup only shows up after the first decode.
fn decode_caption_text(raw: &str) -> String {
    let once = html_escape::decode_html_entities(raw);
    let stripped = MARKUP_TAG.replace_all(&once, "");
    html_escape::decode_html_entities(&stripped).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn watch_page(player: &Value) -> String {
        format!(
            "<html><body><script>var ytInitialPlayerResponse = {};var meta = {{\"a\":1}};</script></body></html>",
            player
        )
    }

    fn source_for(server: &MockServer) -> YoutubeCaptionSource {
        let config = CaptionConfig {
            base_url: server.uri(),
            ..CaptionConfig::default()
        };
        YoutubeCaptionSource::new(&config).unwrap()
    }

    async fn mount_watch_page(server: &MockServer, video_id: &str, body: String) {
        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(query_param("v", video_id))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_parse_timed_text() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
<text start="0.5" dur="2.1">Hey   there</text>
<text start="2.6" dur="1.4">it&amp;#39;s &lt;font color=&quot;#E5E5E5&quot;&gt;me&lt;/font&gt;</text>
<text start="4" dur="1"/>
<text start="5.0" dur="3">Tom &amp;amp; Jerry</text>
</transcript>"#;

        let fragments = parse_timed_text(xml, Some("en"));
        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["Hey   there", "it's me", "Tom & Jerry"]);
        assert_eq!(fragments[0].start, Some(0.5));
        assert_eq!(fragments[0].duration, Some(2.1));
        assert_eq!(fragments[2].start, Some(5.0));
        assert!(fragments.iter().all(|f| f.language_code.as_deref() == Some("en")));
    }

    #[test]
    fn test_parse_timed_text_multiline_and_empty() {
        let xml = "<transcript><text start=\"1\" dur=\"1\">line one\nline two</text></transcript>";
        let fragments = parse_timed_text(xml, None);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "line one\nline two");
        assert!(fragments[0].language_code.is_none());

        assert!(parse_timed_text("<transcript></transcript>", None).is_empty());
        assert!(parse_timed_text("", None).is_empty());
    }

    #[test]
    fn test_extract_player_response_ignores_trailing_script() {
        let html = watch_page(&json!({"videoDetails": {"videoId": "abc"}}));
        let player = extract_player_response(&html).unwrap();
        assert_eq!(player["videoDetails"]["videoId"], "abc");

        assert!(extract_player_response("<html>nothing here</html>").is_none());
        assert!(extract_player_response("ytInitialPlayerResponse = null;").is_none());
    }

    #[test]
    fn test_caption_classification() {
        let disabled = json!({"playabilityStatus": {"status": "OK"}});
        assert_eq!(parse_caption_tracks(&disabled), Err(CaptionError::Disabled));

        let no_status = json!({});
        assert_eq!(parse_caption_tracks(&no_status), Err(CaptionError::Disabled));

        let empty = json!({
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": []}}
        });
        assert_eq!(parse_caption_tracks(&empty), Err(CaptionError::NotFound));

        let unavailable = json!({
            "playabilityStatus": {"status": "ERROR", "reason": "Video unavailable"}
        });
        assert_eq!(
            parse_caption_tracks(&unavailable),
            Err(CaptionError::VideoUnavailable("Video unavailable".to_string()))
        );
    }

    #[test]
    fn test_parse_track_names() {
        let player = json!({
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": "/api/timedtext?lang=en", "languageCode": "en",
                 "name": {"simpleText": "English"}},
                {"baseUrl": "/api/timedtext?lang=de&kind=asr", "languageCode": "de",
                 "name": {"runs": [{"text": "German (auto-generated)"}]}, "kind": "asr"},
                {"languageCode": "fr"}
            ]}}
        });

        let tracks = parse_caption_tracks(&player).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].name, "English");
        assert!(!tracks[0].is_generated);
        assert_eq!(tracks[1].name, "German (auto-generated)");
        assert!(tracks[1].is_generated);
    }

    #[tokio::test]
    async fn test_fetch_prefers_english_track() {
        let server = MockServer::start().await;
        let player = json!({
            "playabilityStatus": {"status": "OK"},
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": format!("{}/api/timedtext?v=dQw4w9WgXcQ&lang=de", server.uri()),
                 "languageCode": "de"},
                {"baseUrl": format!("{}/api/timedtext?v=dQw4w9WgXcQ&lang=en&fmt=srv3", server.uri()),
                 "languageCode": "en"}
            ]}}
        });
        mount_watch_page(&server, "dQw4w9WgXcQ", watch_page(&player)).await;

        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .and(query_param("lang", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<transcript><text start="0" dur="1">Never gonna</text><text start="1" dur="1">give you up</text></transcript>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let fragments = source_for(&server).fetch_captions("dQw4w9WgXcQ").await.unwrap();
        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["Never gonna", "give you up"]);
        assert_eq!(fragments[0].language_code.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_first_track_with_relative_url() {
        let server = MockServer::start().await;
        let player = json!({
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": "/api/timedtext?v=abcdefghijk&lang=es", "languageCode": "es"},
                {"baseUrl": "/api/timedtext?v=abcdefghijk&lang=pt", "languageCode": "pt"}
            ]}}
        });
        mount_watch_page(&server, "abcdefghijk", watch_page(&player)).await;

        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .and(query_param("lang", "es"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<transcript><text start="0" dur="1">Hola</text></transcript>"#,
            ))
            .mount(&server)
            .await;

        let fragments = source_for(&server).fetch_captions("abcdefghijk").await.unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "Hola");
        assert_eq!(fragments[0].language_code.as_deref(), Some("es"));
    }

    #[tokio::test]
    async fn test_fetch_reports_disabled_captions() {
        let server = MockServer::start().await;
        let player = json!({"playabilityStatus": {"status": "OK"}});
        mount_watch_page(&server, "abcdefghijk", watch_page(&player)).await;

        let result = source_for(&server).fetch_captions("abcdefghijk").await;
        assert_eq!(result, Err(CaptionError::Disabled));
    }

    #[tokio::test]
    async fn test_list_tracks_unavailable_video() {
        let server = MockServer::start().await;
        let player = json!({
            "playabilityStatus": {"status": "LOGIN_REQUIRED", "reason": "Sign in to confirm your age"}
        });
        mount_watch_page(&server, "abcdefghijk", watch_page(&player)).await;

        let result = source_for(&server).list_tracks("abcdefghijk").await;
        assert_eq!(
            result,
            Err(CaptionError::VideoUnavailable("Sign in to confirm your age".to_string()))
        );
    }

    #[tokio::test]
    async fn test_rate_limit_and_captcha_are_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(query_param("v", "ratelimited"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        mount_watch_page(
            &server,
            "captchapage",
            "<form><div class=\"g-recaptcha\"></div></form>".to_string(),
        )
        .await;
        mount_watch_page(&server, "noplayerxyz", "<html></html>".to_string()).await;

        let source = source_for(&server);
        for video_id in ["ratelimited", "captchapage", "noplayerxyz"] {
            let result = source.fetch_captions(video_id).await;
            assert!(
                matches!(result, Err(CaptionError::Unknown(_))),
                "{} gave {:?}",
                video_id,
                result
            );
        }
    }

    #[tokio::test]
    async fn test_server_error_on_track_download() {
        let server = MockServer::start().await;
        let player = json!({
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": "/api/timedtext?lang=en", "languageCode": "en"}
            ]}}
        });
        mount_watch_page(&server, "abcdefghijk", watch_page(&player)).await;
        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = source_for(&server).fetch_captions("abcdefghijk").await;
        assert!(matches!(result, Err(CaptionError::Unknown(_))));
    }
}
