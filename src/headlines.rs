//! Headline resolution and curation.
//!
//! [`resolve_headlines`] turns one provider batch into at most N canonical
//! [`Headline`]s, and [`curate`] asks the text service which K of them to
//! expand. Neither returns an error: an unavailable provider yields an empty
//! batch, and an unusable model reply yields the first K headlines.

use crate::api::{ChatRequest, TextService, ask_timed};
use crate::config::PipelineConfig;
use crate::models::{CuratedSelection, Headline, RawNewsRecord, RawSource};
use crate::provider::{HeadlineProvider, Locale, NewsQuery};
use crate::structured::{StructuredReply, parse_reply};
use itertools::Itertools;
use serde::Deserialize;
use std::fmt::Write;
use tracing::{debug, error, info, instrument, warn};

const CURATOR_SYSTEM_PROMPT: &str =
    "You are an assistant that selects the most interesting news headlines.";

/// True when `title` contains any banned label, case-insensitively.
pub fn is_banned(title: &str, banned_labels: &[String]) -> bool {
    let lowered = title.to_lowercase();
    banned_labels
        .iter()
        .any(|label| lowered.contains(&label.to_lowercase()))
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.as_str()).filter(|s| !s.is_empty())
}

fn source_name(source: Option<&RawSource>) -> Option<&str> {
    source.and_then(|s| non_empty(s.name.as_ref()))
}

/// Pick the story token for a record.
///
/// Order: highlighted token, top-level token, first sub-story with a
/// non-empty, non-banned title, then first sub-story with any token.
pub fn resolve_story_id(record: &RawNewsRecord, banned_labels: &[String]) -> Option<String> {
    let highlight = record.highlight.as_ref();
    if let Some(token) = highlight.and_then(|h| non_empty(h.story_token.as_ref())) {
        return Some(token.to_string());
    }
    if let Some(token) = non_empty(record.story_token.as_ref()) {
        return Some(token.to_string());
    }

    let stories = record.stories.as_deref().unwrap_or_default();
    let titled = stories.iter().find_map(|story| {
        let token = non_empty(story.story_token.as_ref())?;
        let title = story.title.as_deref().unwrap_or("").trim();
        (!title.is_empty() && !is_banned(title, banned_labels)).then_some(token)
    });
    titled
        .or_else(|| {
            stories
                .iter()
                .find_map(|story| non_empty(story.story_token.as_ref()))
        })
        .map(str::to_string)
}

/// Normalize one raw record, preferring highlighted fields.
///
/// Returns `None` for records without a title or whose title is banned.
pub fn normalize_record(record: &RawNewsRecord, banned_labels: &[String]) -> Option<Headline> {
    let highlight = record.highlight.as_ref();

    let title = highlight
        .and_then(|h| non_empty(h.title.as_ref()))
        .or_else(|| non_empty(record.title.as_ref()))
        .unwrap_or("")
        .trim();
    if title.is_empty() || is_banned(title, banned_labels) {
        return None;
    }

    let link = highlight
        .and_then(|h| non_empty(h.link.as_ref()))
        .or_else(|| non_empty(record.link.as_ref()))
        .unwrap_or("");
    let source = highlight
        .and_then(|h| source_name(h.source.as_ref()))
        .or_else(|| source_name(record.source.as_ref()))
        .unwrap_or("");
    let published = highlight
        .and_then(|h| non_empty(h.date.as_ref()))
        .or_else(|| non_empty(record.date.as_ref()))
        .unwrap_or("");

    Some(Headline {
        title: title.to_string(),
        link: link.to_string(),
        source: source.to_string(),
        published: published.to_string(),
        story_id: resolve_story_id(record, banned_labels),
    })
}

/// Normalize a provider batch into at most `limit` headlines.
///
/// Banned and untitled records are dropped before counting toward `limit`,
/// and repeated `(title, link)` pairs keep only their first occurrence.
pub fn normalize_batch(
    records: &[RawNewsRecord],
    limit: usize,
    banned_labels: &[String],
) -> Vec<Headline> {
    records
        .iter()
        .filter_map(|record| normalize_record(record, banned_labels))
        .unique_by(|h| (h.title.clone(), h.link.clone()))
        .take(limit)
        .collect()
}

/// Fetch and normalize the headline feed for the configured topic.
///
/// Provider failures and empty feeds both yield an empty list.
#[instrument(level = "info", skip_all, fields(limit = config.headline_limit))]
pub async fn resolve_headlines<P: HeadlineProvider>(
    provider: &P,
    config: &PipelineConfig,
) -> Vec<Headline> {
    let locale = Locale {
        language: config.language.clone(),
        region: config.region.clone(),
    };
    let records = match provider
        .fetch(NewsQuery::Topic(&config.topic_token), &locale)
        .await
    {
        Ok(records) => records,
        Err(e) => {
            error!(error = %e, "Error fetching headlines");
            return Vec::new();
        }
    };

    let headlines = normalize_batch(&records, config.headline_limit, &config.banned_labels);
    info!(
        records = records.len(),
        headlines = headlines.len(),
        "Resolved headlines"
    );
    debug!(titles = ?headlines.iter().map(|h| &h.title).collect::<Vec<_>>(), "Headline titles");
    headlines
}

/// Build the curator prompt listing every title with its 1-based index.
pub fn curator_prompt(headlines: &[Headline], select_count: usize) -> String {
    let mut prompt = format!(
        "Here are {} headlines. Choose {} most interesting to a general reader. \
         Answer ONLY a JSON object like {{\"selected\": [{}]}} with indices (1-based).\n\n",
        headlines.len(),
        select_count,
        (1..=select_count).join(",")
    );
    for (i, h) in headlines.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", i + 1, h.title);
    }
    prompt
}

/// A single entry in the curator's `selected` array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IndexValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl IndexValue {
    /// Coerce to an index. Negative values are kept (and later dropped as
    /// out of range); non-numeric values are an error.
    fn to_index(&self) -> Result<i64, String> {
        match self {
            IndexValue::Int(i) => Ok(*i),
            IndexValue::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
            IndexValue::Float(f) => Err(format!("non-integer index {}", f)),
            IndexValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("non-numeric index {:?}", s)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SelectionReply {
    selected: Option<Vec<IndexValue>>,
}

impl StructuredReply for SelectionReply {
    type Output = Option<Vec<i64>>;
    const KIND: &'static str = "curator";

    fn into_output(self) -> Result<Option<Vec<i64>>, String> {
        let indices = self
            .selected
            .ok_or_else(|| "missing \"selected\" field".to_string())?
            .iter()
            .map(IndexValue::to_index)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(indices))
    }
}

/// Turn a raw curator reply into a selection over a batch of `batch_len`.
///
/// The reply is cut to `select_count` entries before out-of-range indices are
/// dropped. Any parse failure selects the first `select_count` headlines.
pub fn parse_selection(raw: &str, select_count: usize, batch_len: usize) -> CuratedSelection {
    match parse_reply::<SelectionReply, _>(raw, |_| None) {
        Some(indices) => CuratedSelection::from_indices(
            indices
                .into_iter()
                .take(select_count)
                .filter_map(|i| usize::try_from(i).ok()),
            batch_len,
        ),
        None => CuratedSelection::first(select_count, batch_len),
    }
}

/// Ask the text service to pick the headlines worth expanding.
///
/// A failed call falls back to the first `select_count` headlines, the same
/// as an unparsable reply.
#[instrument(level = "info", skip_all, fields(batch = headlines.len(), k = config.select_count))]
pub async fn curate<T: TextService>(
    service: &T,
    headlines: &[Headline],
    config: &PipelineConfig,
) -> CuratedSelection {
    let batch = &headlines[..headlines.len().min(config.headline_limit)];
    if batch.is_empty() {
        return CuratedSelection::first(config.select_count, 0);
    }

    let request = ChatRequest::new(
        &config.select_model,
        CURATOR_SYSTEM_PROMPT,
        curator_prompt(batch, config.select_count),
    );
    let selection = match ask_timed(service, &request).await {
        Ok(raw) => parse_selection(&raw, config.select_count, batch.len()),
        Err(e) => {
            warn!(error = %e, "Curator request failed; selecting first headlines");
            CuratedSelection::first(config.select_count, batch.len())
        }
    };
    info!(
        selected = ?selection.indices(),
        count = selection.len(),
        "Curated headline selection"
    );
    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedText;
    use crate::models::{RawHighlight, RawStory};
    use crate::provider::testing::FakeProvider;

    fn banned() -> Vec<String> {
        PipelineConfig::default().banned_labels
    }

    fn record(title: &str) -> RawNewsRecord {
        RawNewsRecord {
            title: Some(title.to_string()),
            link: Some(format!("https://news.example.com/{}", title.replace(' ', "-"))),
            source: Some(RawSource {
                name: Some("Example Wire".to_string()),
            }),
            date: Some("2 hours ago".to_string()),
            story_token: Some(format!("story-{}", title)),
            ..Default::default()
        }
    }

    fn story(title: Option<&str>, token: Option<&str>) -> RawStory {
        RawStory {
            title: title.map(str::to_string),
            story_token: token.map(str::to_string),
        }
    }

    fn batch_of(n: usize) -> Vec<Headline> {
        (1..=n)
            .map(|i| normalize_record(&record(&format!("Headline {}", i)), &[]).unwrap())
            .collect()
    }

    #[test]
    fn test_banned_label_substring_case_insensitive() {
        let labels = banned();
        assert!(is_banned("Top News", &labels));
        assert!(is_banned("Today's TOP NEWS roundup", &labels));
        assert!(is_banned("Frequently Asked Questions", &labels));
        assert!(!is_banned("Stocks rally on rate cut", &labels));
    }

    #[test]
    fn test_highlight_fields_preferred() {
        let mut rec = record("Plain title");
        rec.highlight = Some(RawHighlight {
            title: Some("Highlighted title".to_string()),
            link: Some("https://highlight.example.com".to_string()),
            source: Some(RawSource {
                name: Some("Highlight Times".to_string()),
            }),
            date: None,
            story_token: None,
        });
        let h = normalize_record(&rec, &banned()).unwrap();
        assert_eq!(h.title, "Highlighted title");
        assert_eq!(h.link, "https://highlight.example.com");
        assert_eq!(h.source, "Highlight Times");
        assert_eq!(h.published, "2 hours ago");
        assert_eq!(h.story_id.as_deref(), Some("story-Plain title"));
    }

    #[test]
    fn test_story_id_resolution_order() {
        let labels = banned();
        let mut rec = RawNewsRecord {
            title: Some("t".to_string()),
            highlight: Some(RawHighlight {
                story_token: Some("from-highlight".to_string()),
                ..Default::default()
            }),
            story_token: Some("from-top".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_story_id(&rec, &labels).as_deref(), Some("from-highlight"));

        rec.highlight = None;
        assert_eq!(resolve_story_id(&rec, &labels).as_deref(), Some("from-top"));

        rec.story_token = None;
        rec.stories = Some(vec![
            story(Some("Top News"), Some("banned-sub")),
            story(Some(""), Some("untitled-sub")),
            story(Some("Real story"), Some("good-sub")),
        ]);
        assert_eq!(resolve_story_id(&rec, &labels).as_deref(), Some("good-sub"));

        rec.stories = Some(vec![
            story(Some("Top News"), None),
            story(Some("Top News"), Some("banned-sub")),
        ]);
        assert_eq!(resolve_story_id(&rec, &labels).as_deref(), Some("banned-sub"));

        rec.stories = Some(vec![story(Some("Anything"), None)]);
        assert_eq!(resolve_story_id(&rec, &labels), None);

        rec.stories = None;
        assert_eq!(resolve_story_id(&rec, &labels), None);
    }

    #[test]
    fn test_untitled_records_dropped() {
        let rec = RawNewsRecord::default();
        assert!(normalize_record(&rec, &banned()).is_none());
    }

    #[test]
    fn test_banned_records_do_not_count_toward_limit() {
        let mut records: Vec<RawNewsRecord> =
            (1..=8).map(|i| record(&format!("Story {}", i))).collect();
        records.insert(2, record("Top News"));
        records.insert(6, record("Top news in business"));
        assert_eq!(records.len(), 10);

        let headlines = normalize_batch(&records, 10, &banned());
        assert_eq!(headlines.len(), 8);
        assert!(headlines.iter().all(|h| !is_banned(&h.title, &banned())));

        let capped = normalize_batch(&records, 5, &banned());
        assert_eq!(capped.len(), 5);
        assert_eq!(capped[4].title, "Story 5");
    }

    #[test]
    fn test_duplicate_title_link_pairs_collapse() {
        let records = vec![record("Same"), record("Same"), record("Other")];
        let headlines = normalize_batch(&records, 10, &banned());
        assert_eq!(headlines.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_headlines_is_repeatable() {
        let config = PipelineConfig::default();
        let mut provider = FakeProvider::default();
        provider.topics.insert(
            config.topic_token.clone(),
            vec![record("One"), record("Top News"), record("Two")],
        );
        let first = resolve_headlines(&provider, &config).await;
        let second = resolve_headlines(&provider, &config).await;
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_resolve_headlines_provider_failure_is_empty() {
        let provider = FakeProvider {
            fail: true,
            ..Default::default()
        };
        let headlines = resolve_headlines(&provider, &PipelineConfig::default()).await;
        assert!(headlines.is_empty());
    }

    #[test]
    fn test_curator_prompt_lists_indices() {
        let prompt = curator_prompt(&batch_of(3), 2);
        assert!(prompt.contains("{\"selected\": [1,2]}"));
        assert!(prompt.contains("1. Headline 1\n"));
        assert!(prompt.contains("3. Headline 3\n"));
    }

    #[test]
    fn test_parse_selection_drops_out_of_range_keeps_order() {
        let sel = parse_selection(r#"{"selected":[1,3,9,2,4]}"#, 5, 8);
        assert_eq!(sel.indices(), &[1, 3, 2, 4]);
    }

    #[test]
    fn test_parse_selection_truncates_before_filtering() {
        let sel = parse_selection(r#"{"selected":[9,9,1,2,3,4,5]}"#, 5, 8);
        assert_eq!(sel.indices(), &[1, 2, 3]);
    }

    #[test]
    fn test_parse_selection_fenced_and_numeric_strings() {
        let sel = parse_selection("```json\n{\"selected\": [\"2\", 5.0, -1, 0]}\n```", 5, 8);
        assert_eq!(sel.indices(), &[2, 5]);
    }

    #[test]
    fn test_parse_selection_fallbacks() {
        for raw in [
            "I think 1, 2 and 3",
            "{\"picked\": [1,2]}",
            "{\"selected\": null}",
            "{\"selected\": [1, \"two\"]}",
            "{\"selected\": [1.5]}",
            "```json\n{\"selected\": [1,2\n```",
            "[[8, 7]]",
            "[1, 2]",
        ] {
            assert_eq!(parse_selection(raw, 5, 8).indices(), &[1, 2, 3, 4, 5], "{}", raw);
            assert_eq!(parse_selection(raw, 5, 3).indices(), &[1, 2, 3], "{}", raw);
        }
    }

    #[tokio::test]
    async fn test_curate_uses_reply() {
        let service = ScriptedText::new(vec![Ok(r#"{"selected":[1,3,9,2,4]}"#)]);
        let config = PipelineConfig::default();
        let sel = curate(&service, &batch_of(8), &config).await;
        assert_eq!(sel.indices(), &[1, 3, 2, 4]);

        let requests = service.requests.borrow();
        assert_eq!(requests[0].model, config.select_model);
        assert_eq!(requests[0].system, CURATOR_SYSTEM_PROMPT);
        assert!(requests[0].user.contains("8. Headline 8"));
    }

    #[tokio::test]
    async fn test_curate_service_error_falls_back() {
        let service = ScriptedText::new(vec![Err("timeout")]);
        let sel = curate(&service, &batch_of(8), &PipelineConfig::default()).await;
        assert_eq!(sel.indices(), &[1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_curate_empty_batch_skips_service() {
        let service = ScriptedText::new(vec![]);
        let sel = curate(&service, &[], &PipelineConfig::default()).await;
        assert!(sel.is_empty());
        assert_eq!(service.calls(), 0);
    }
}
