use anyhow::Result;
use std::path::Path;

use crate::captions::CaptionTrackInfo;
use crate::cli::OutputFormat;
use crate::transcript::TranscriptResult;

/// Render a transcript in the requested format
pub fn render_transcript(result: &TranscriptResult, format: &OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Text => result.transcript.clone(),
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
    };
    Ok(content)
}

/// Save a transcript to a file
pub fn save_to_file(result: &TranscriptResult, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render_transcript(result, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print a transcript to stdout
pub fn print_to_console(result: &TranscriptResult, format: &OutputFormat) -> Result<()> {
    println!("{}", render_transcript(result, format)?);
    Ok(())
}

/// One line per caption track, the preferred one marked with `*`
pub fn format_track_list(tracks: &[CaptionTrackInfo], selected: Option<&CaptionTrackInfo>) -> String {
    tracks
        .iter()
        .map(|track| {
            let marker = if selected == Some(track) { "*" } else { " " };
            let kind = if track.is_generated { " (auto-generated)" } else { "" };
            format!("{} {:<8} {}{}", marker, track.language_code, track.name, kind)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
