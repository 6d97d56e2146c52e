use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use transcript_service::captions::{select_track, YoutubeCaptionSource};
use transcript_service::cli::{Cli, Commands};
use transcript_service::config::Config;
use transcript_service::server::{self, AppState};
use transcript_service::transcript::TranscriptService;
use transcript_service::{output, utils};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    // defaults < config file < HOST/PORT (flag or environment)
    let config = Config::load(cli.config.as_deref())?.with_overrides(cli.host, cli.port)?;

    match cli.command {
        Commands::Serve => {
            let source = YoutubeCaptionSource::new(&config.captions)?;
            let state = AppState::new(TranscriptService::new(Arc::new(source)));

            tracing::info!("Backend started");
            server::serve(&config, state).await?;
        }
        Commands::Fetch {
            video,
            output,
            format,
        } => {
            let video_id = utils::extract_video_id(&video)
                .ok_or_else(|| anyhow::anyhow!("Invalid video ID or URL: {}", video))?;
            let source = YoutubeCaptionSource::new(&config.captions)?;
            let service = TranscriptService::new(Arc::new(source));

            let progress = spinner(cli.quiet, "Fetching transcript...");
            let result = service.fetch_transcript(video_id.as_str()).await;
            progress.finish_and_clear();
            let result = result?;

            match output {
                Some(path) => {
                    output::save_to_file(&result, &path, &format)?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => output::print_to_console(&result, &format)?,
            }
        }
        Commands::Tracks { video } => {
            let video_id = utils::extract_video_id(&video)
                .ok_or_else(|| anyhow::anyhow!("Invalid video ID or URL: {}", video))?;
            let source = YoutubeCaptionSource::new(&config.captions)?;

            let progress = spinner(cli.quiet, "Looking up caption tracks...");
            let tracks = source.list_tracks(video_id.as_str()).await;
            progress.finish_and_clear();
            let tracks = tracks?;

            let selected = select_track(&tracks, &config.captions.preferred_language);
            println!("Caption tracks for {}:", video_id);
            println!("{}", output::format_track_list(&tracks, selected));
        }
        Commands::Config => config.display(),
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "transcript_service=debug,tower_http=debug"
    } else {
        "transcript_service=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // stderr keeps `fetch` output on stdout clean
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn spinner(quiet: bool, message: &'static str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        progress.set_style(style);
    }
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}
