//! Supporting-link resolution.
//!
//! A curated headline's story token is sent back to the provider to list the
//! articles covering the same event. Callers must not invoke this for a
//! headline without a story token.

use crate::config::PipelineConfig;
use crate::models::RawNewsRecord;
use crate::provider::{HeadlineProvider, Locale, NewsQuery};
use tracing::{debug, error, info, instrument};
use url::Url;

/// Only absolute http(s) URLs can be loaded by the page renderer.
fn is_navigable(link: &str) -> bool {
    match Url::parse(link) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(e) => {
            debug!(%link, error = %e, "Skipping unparseable link");
            false
        }
    }
}

/// Keep the links of the first `cap` records, skipping records with no link.
pub fn collect_links(records: &[RawNewsRecord], cap: usize) -> Vec<String> {
    records
        .iter()
        .take(cap)
        .filter_map(|r| r.link.as_deref())
        .map(str::trim)
        .filter(|link| !link.is_empty() && is_navigable(link))
        .map(str::to_string)
        .collect()
}

/// Fetch at most `config.links_per_headline` supporting URLs for a story.
///
/// A provider failure yields an empty list.
#[instrument(level = "info", skip_all, fields(%story_id))]
pub async fn resolve_supporting_links<P: HeadlineProvider>(
    provider: &P,
    story_id: &str,
    config: &PipelineConfig,
) -> Vec<String> {
    let locale = Locale {
        language: config.language.clone(),
        region: config.region.clone(),
    };
    let links = match provider.fetch(NewsQuery::Story(story_id), &locale).await {
        Ok(records) => collect_links(&records, config.links_per_headline),
        Err(e) => {
            error!(error = %e, "Error getting story links");
            Vec::new()
        }
    };
    info!(
        count = links.len(),
        cap = config.links_per_headline,
        "Found supporting links"
    );
    links
}
