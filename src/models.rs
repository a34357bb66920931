//! Data models for headlines, curated stories, and their per-run artifacts.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Headline`]: A normalized headline as resolved from the provider
//! - [`CuratedSelection`]: The model-chosen subset of a headline batch
//! - [`ExtractedArticle`]: Visible text scraped from one supporting link
//! - [`Summary`] and [`SocialPost`]: Model outputs derived from the articles
//! - [`HeadlineWorkingSet`]: The per-headline accumulation owned by a run
//!
//! Raw provider records ([`RawNewsRecord`] and friends) mirror the JSON shape
//! returned by the headline provider; every field is optional because the
//! provider omits fields freely.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A headline as normalized from one provider record.
///
/// Identity is the `(title, link)` pair, and only within a single fetch batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Headline {
    pub title: String,
    pub link: String,
    pub source: String,
    pub published: String,
    /// Handle used to fetch supporting links; `None` means the headline
    /// cannot be expanded.
    pub story_id: Option<String>,
}

impl Headline {
    /// The story token as written to CSV (empty when absent).
    pub fn story_token(&self) -> &str {
        self.story_id.as_deref().unwrap_or("")
    }
}

/// Ordered 1-based references into the headline batch the curator saw.
///
/// Every index is guaranteed to satisfy `1 <= index <= batch_len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuratedSelection {
    indices: Vec<usize>,
}

impl CuratedSelection {
    /// Build a selection, silently discarding indices outside `1..=batch_len`.
    pub fn from_indices(indices: impl IntoIterator<Item = usize>, batch_len: usize) -> Self {
        Self {
            indices: indices
                .into_iter()
                .filter(|i| (1..=batch_len).contains(i))
                .collect(),
        }
    }

    /// The deterministic default: the first `min(count, batch_len)` headlines.
    pub fn first(count: usize, batch_len: usize) -> Self {
        Self {
            indices: (1..=count.min(batch_len)).collect(),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Resolve the selection against the batch it was made from.
    pub fn resolve<'a>(&self, headlines: &'a [Headline]) -> Vec<&'a Headline> {
        self.indices
            .iter()
            .filter_map(|i| headlines.get(i - 1))
            .collect()
    }
}

/// Visible text scraped from one supporting link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub source_url: String,
    pub text: String,
}

/// Bilingual summary of all accepted articles for one headline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Summary {
    /// Indonesian summary.
    #[serde(rename = "id", default)]
    pub id_text: String,
    /// English summary.
    #[serde(rename = "en", default)]
    pub en_text: String,
}

/// A short title plus one single-slide social media post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SocialPost {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "ig_post", default)]
    pub body: String,
}

/// Run-level stage. Transitions are strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStage {
    Fetching,
    Selecting,
    Expanding,
    Scraping,
    Summarizing,
    Posting,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Fetching => "fetching",
            RunStage::Selecting => "selecting",
            RunStage::Expanding => "expanding",
            RunStage::Scraping => "scraping",
            RunStage::Summarizing => "summarizing",
            RunStage::Posting => "posting",
            RunStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why a headline stopped before producing a social post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyExit {
    NoStoryToken,
    NoSupportingLinks,
    NoArticles,
    SummaryUnavailable,
    EmptyEnglishSummary,
    PostUnavailable,
}

impl fmt::Display for EarlyExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            EarlyExit::NoStoryToken => "no story token",
            EarlyExit::NoSupportingLinks => "no supporting links",
            EarlyExit::NoArticles => "no accepted articles",
            EarlyExit::SummaryUnavailable => "summary unavailable",
            EarlyExit::EmptyEnglishSummary => "empty english summary",
            EarlyExit::PostUnavailable => "post unavailable",
        };
        f.write_str(reason)
    }
}

/// Per-headline state within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlineStage {
    Expanding,
    Scraping,
    Summarizing,
    Posting,
    Done,
    Stopped(EarlyExit),
}

impl HeadlineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, HeadlineStage::Done | HeadlineStage::Stopped(_))
    }
}

/// Everything a run accumulates for one curated headline.
///
/// Owned exclusively by the run coordinator. Once `stage` is terminal the
/// working set is no longer mutated.
#[derive(Debug, Clone)]
pub struct HeadlineWorkingSet {
    pub headline: Headline,
    /// Sanitized folder name used for this headline's artifacts.
    pub folder: String,
    pub links: Vec<String>,
    pub articles: Vec<ExtractedArticle>,
    pub summary: Option<Summary>,
    pub post: Option<SocialPost>,
    pub stage: HeadlineStage,
}

impl HeadlineWorkingSet {
    pub fn new(headline: Headline, folder: String) -> Self {
        Self {
            headline,
            folder,
            links: Vec::new(),
            articles: Vec::new(),
            summary: None,
            post: None,
            stage: HeadlineStage::Expanding,
        }
    }

    /// Move to `next` unless the headline already reached a terminal stage.
    pub fn advance(&mut self, next: HeadlineStage) {
        if !self.stage.is_terminal() {
            self.stage = next;
        }
    }

    pub fn stop(&mut self, reason: EarlyExit) {
        self.advance(HeadlineStage::Stopped(reason));
    }

    /// Still moving through the pipeline (neither done nor stopped).
    pub fn is_active(&self) -> bool {
        !self.stage.is_terminal()
    }

    /// All accepted article texts joined for summarization.
    pub fn combined_text(&self) -> String {
        let mut combined = String::new();
        for article in &self.articles {
            combined.push_str(&article.text);
            combined.push('\n');
        }
        combined
    }
}

/// Counters reported once a run finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub headlines_fetched: usize,
    pub headlines_curated: usize,
    pub links_found: usize,
    pub articles_accepted: usize,
    pub summaries: usize,
    pub posts: usize,
}

/// Top-level response from the headline provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub news_results: Vec<RawNewsRecord>,
}

/// One raw record from the provider's `news_results` list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNewsRecord {
    pub title: Option<String>,
    pub link: Option<String>,
    pub source: Option<RawSource>,
    pub date: Option<String>,
    pub story_token: Option<String>,
    pub highlight: Option<RawHighlight>,
    pub stories: Option<Vec<RawStory>>,
}

/// The "highlighted" variant of a record; preferred over top-level fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHighlight {
    pub title: Option<String>,
    pub link: Option<String>,
    pub source: Option<RawSource>,
    pub date: Option<String>,
    pub story_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSource {
    pub name: Option<String>,
}

/// A sub-story listed under a record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStory {
    pub title: Option<String>,
    pub story_token: Option<String>,
}
