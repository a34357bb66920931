//! # Story Digest
//!
//! A staged news pipeline that discovers trending headlines for a topic,
//! lets a language model curate the most interesting ones, scrapes the
//! supporting coverage of each curated story, and writes bilingual
//! (Indonesian/English) summaries plus one social media post per story.
//!
//! ## Usage
//!
//! ```sh
//! SERPAPI_API_KEY=... OPENAI_API_KEY=... story_digest -o ./scraping_result
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: Resolve the topic feed into canonical headlines
//! 2. **Selecting**: Ask the model to curate a fixed-size subset
//! 3. **Expanding**: Resolve each curated story into supporting links
//! 4. **Scraping**: Extract article text through one shared page session
//! 5. **Summarizing**: Summarize each story in Indonesian and English
//! 6. **Posting**: Derive a title and social post from the English summary
//!
//! Everything runs sequentially; artifacts land under a dated directory.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod extract;
mod headlines;
mod links;
mod models;
mod outputs;
mod pipeline;
mod provider;
mod structured;
mod summarize;
mod utils;

use api::OpenAiChat;
use cli::Cli;
use config::{PipelineConfig, load_config};
use extract::HttpRenderer;
use outputs::files::RunLayout;
use pipeline::Pipeline;
use provider::SerpApiNews;
use utils::{ensure_writable_dir, run_date};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env is fine; keys may already be in the environment.
    let dotenv = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("story_digest starting up");
    if let Ok(path) = &dotenv {
        debug!(path = %path.display(), "Loaded .env");
    }

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.config, ?args.output_root, "Parsed CLI arguments");

    // ---- Load config ----
    let mut config = match &args.config {
        Some(path) => load_config(Path::new(path)).await?,
        None => PipelineConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let serpapi_key = args
        .serpapi_api_key
        .as_deref()
        .ok_or("SERPAPI_API_KEY is not set (use --serpapi-api-key or the environment)")?;
    let openai_key = args
        .openai_api_key
        .as_deref()
        .ok_or("OPENAI_API_KEY is not set (use --openai-api-key or the environment)")?;

    // Early check: ensure the output root is writable
    if let Err(e) = ensure_writable_dir(&config.output_root).await {
        error!(
            path = %config.output_root,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Collaborators ----
    let provider = SerpApiNews::new(serpapi_key, &config.provider_endpoint);
    let text = OpenAiChat::new(openai_key, &config.api_base);
    let renderer = HttpRenderer::default();
    let layout = RunLayout::new(Path::new(&config.output_root), &run_date());
    info!(
        date_dir = %layout.date_dir.display(),
        summary_dir = %layout.summary_dir.display(),
        "Run directories"
    );

    // ---- Run ----
    let mut pipeline = Pipeline::new(&provider, &text, &renderer, &config);
    let output = match pipeline.run(&layout).await {
        Ok(output) => output,
        Err(e) => {
            error!(error = %e, "Run aborted while writing output");
            return Err(e);
        }
    };

    let completed = output
        .headlines
        .iter()
        .filter(|ws| ws.post.is_some())
        .map(|ws| ws.folder.as_str())
        .collect::<Vec<_>>();
    debug!(?completed, "Headlines with a social post");

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        headlines = output.report.headlines_fetched,
        curated = output.report.headlines_curated,
        articles = output.report.articles_accepted,
        summaries = output.report.summaries,
        posts = output.report.posts,
        stage = %pipeline.stage(),
        "Execution complete"
    );

    Ok(())
}
