//! Pipeline configuration.
//!
//! All tunables (limits, thresholds, model identifiers, output layout) live in
//! [`PipelineConfig`], which is loaded from an optional YAML file, overridden
//! by CLI flags, and passed by reference to every stage.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

/// Topic token for the English business feed.
pub const DEFAULT_TOPIC_TOKEN: &str = "CAAqJggKIiBDQkFTRWdvSUwyMHZNRGx6TVdZU0FtVnVHZ0pWVXlnQVAB";

/// Every knob the run coordinator and its stages read.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Opaque provider token selecting the news feed.
    pub topic_token: String,
    /// Provider language (`hl`).
    pub language: String,
    /// Provider region (`gl`).
    pub region: String,
    /// Maximum number of headlines kept from the feed (N).
    pub headline_limit: usize,
    /// Number of headlines the curator selects (K).
    pub select_count: usize,
    /// Maximum supporting links fetched per headline (M).
    pub links_per_headline: usize,
    /// Extracted text must be strictly longer than this, after trimming.
    pub min_article_chars: usize,
    /// Fixed delay after each page load before reading the markup.
    pub page_wait_secs: u64,
    pub select_model: String,
    pub summary_model: String,
    pub post_model: String,
    /// Labels marking non-news records; matched as lower-case substrings.
    pub banned_labels: Vec<String>,
    /// Prefix for the per-run CSV files.
    pub file_prefix: String,
    /// Root directory for all run output.
    pub output_root: String,
    /// Headline titles are cut to this many characters before becoming folder names.
    pub folder_name_max: usize,
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    /// Headline provider search endpoint.
    pub provider_endpoint: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            topic_token: DEFAULT_TOPIC_TOKEN.to_string(),
            language: "en".to_string(),
            region: "US".to_string(),
            headline_limit: 10,
            select_count: 5,
            links_per_headline: 20,
            min_article_chars: 50,
            page_wait_secs: 3,
            select_model: "gpt-5-nano".to_string(),
            summary_model: "gpt-5-nano".to_string(),
            post_model: "gpt-5-nano".to_string(),
            banned_labels: vec![
                "top news".to_string(),
                "posts on x".to_string(),
                "frequently asked questions".to_string(),
            ],
            file_prefix: "eng_business".to_string(),
            output_root: "scraping_result/link_eng_business".to_string(),
            folder_name_max: 60,
            api_base: "https://api.openai.com/v1".to_string(),
            provider_endpoint: "https://serpapi.com/search.json".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn page_wait(&self) -> Duration {
        Duration::from_secs(self.page_wait_secs)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.topic_token.trim().is_empty() {
            return Err("topic_token must not be empty".into());
        }
        if self.headline_limit == 0 {
            return Err("headline_limit must be > 0".into());
        }
        if self.select_count == 0 {
            return Err("select_count must be > 0".into());
        }
        if self.folder_name_max == 0 {
            return Err("folder_name_max must be > 0".into());
        }
        Ok(())
    }
}

/// Load a [`PipelineConfig`] from a YAML file. Missing keys take their defaults.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_config(path: &Path) -> Result<PipelineConfig, Box<dyn Error>> {
    let content = fs::read_to_string(path).await?;
    let config: PipelineConfig = serde_yaml::from_str(&content)?;
    config.validate()?;
    info!("Loaded pipeline configuration");
    Ok(config)
}
