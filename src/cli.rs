//! Command-line interface definitions for Story Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Tunables given here override the YAML configuration file; API keys are
//! usually supplied through the environment (or a `.env` file).

use crate::config::PipelineConfig;
use clap::Parser;

/// Command-line arguments for the Story Digest application.
///
/// # Examples
///
/// ```sh
/// # Defaults, keys from the environment
/// story_digest
///
/// # Custom config and output root
/// story_digest -c digest.yaml -o ./out
///
/// # Smaller run
/// story_digest --headline-limit 6 --select-count 3 --links-per-headline 5
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML pipeline config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Root directory for run output
    #[arg(short, long)]
    pub output_root: Option<String>,

    /// Provider topic token selecting the news feed
    #[arg(long)]
    pub topic_token: Option<String>,

    /// Maximum headlines kept from the feed
    #[arg(long)]
    pub headline_limit: Option<usize>,

    /// Number of headlines to curate
    #[arg(long)]
    pub select_count: Option<usize>,

    /// Maximum supporting links per curated headline
    #[arg(long)]
    pub links_per_headline: Option<usize>,

    /// Seconds to wait after each page load
    #[arg(long)]
    pub page_wait_secs: Option<u64>,

    /// SerpAPI key for the headline provider
    #[arg(long, env = "SERPAPI_API_KEY", hide_env_values = true)]
    pub serpapi_api_key: Option<String>,

    /// API key for the OpenAI-compatible text service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
}

impl Cli {
    /// Overwrite config fields with any values given on the command line.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(root) = &self.output_root {
            config.output_root = root.clone();
        }
        if let Some(token) = &self.topic_token {
            config.topic_token = token.clone();
        }
        if let Some(n) = self.headline_limit {
            config.headline_limit = n;
        }
        if let Some(k) = self.select_count {
            config.select_count = k;
        }
        if let Some(m) = self.links_per_headline {
            config.links_per_headline = m;
        }
        if let Some(secs) = self.page_wait_secs {
            config.page_wait_secs = secs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(&[
            "story_digest",
            "--config",
            "./digest.yaml",
            "--output-root",
            "./out",
        ]);

        assert_eq!(cli.config.as_deref(), Some("./digest.yaml"));
        assert_eq!(cli.output_root.as_deref(), Some("./out"));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(&["story_digest", "-c", "/tmp/c.yaml", "-o", "/tmp/out"]);

        assert_eq!(cli.config.as_deref(), Some("/tmp/c.yaml"));
        assert_eq!(cli.output_root.as_deref(), Some("/tmp/out"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(&[
            "story_digest",
            "--headline-limit",
            "6",
            "--select-count",
            "3",
            "--links-per-headline",
            "4",
            "--page-wait-secs",
            "1",
        ]);
        let mut config = PipelineConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.headline_limit, 6);
        assert_eq!(config.select_count, 3);
        assert_eq!(config.links_per_headline, 4);
        assert_eq!(config.page_wait_secs, 1);
        assert_eq!(config.min_article_chars, 50);
    }
}
