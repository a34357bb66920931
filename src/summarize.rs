//! Bilingual summaries and social posts.
//!
//! Both stages send one prompt and parse a small JSON object back, but they
//! fail differently on purpose:
//! - [`summarize`] always yields a [`Summary`] once the model answered; an
//!   unparsable reply becomes the Indonesian text verbatim.
//! - [`generate_post`] yields nothing at all when the reply is unusable.

use crate::api::{ChatRequest, TextService, ask_timed};
use crate::config::PipelineConfig;
use crate::models::{SocialPost, Summary};
use crate::structured::{StructuredReply, parse_reply};
use tracing::{info, instrument, warn};

const SUMMARY_SYSTEM_PROMPT: &str =
    "You are an assistant that summarizes news articles into Indonesian and English.";
const POST_SYSTEM_PROMPT: &str = "You are a social media copywriter.";

impl StructuredReply for Summary {
    type Output = Summary;
    const KIND: &'static str = "summary";

    fn into_output(self) -> Result<Summary, String> {
        Ok(Summary {
            id_text: self.id_text.trim().to_string(),
            en_text: self.en_text.trim().to_string(),
        })
    }
}

impl StructuredReply for SocialPost {
    type Output = Option<SocialPost>;
    const KIND: &'static str = "social_post";

    fn into_output(self) -> Result<Option<SocialPost>, String> {
        Ok(Some(SocialPost {
            title: self.title.trim().to_string(),
            body: self.body.trim().to_string(),
        }))
    }
}

pub fn summary_prompt(text: &str) -> String {
    format!(
        "Ringkas teks berikut dalam 2 bahasa (komprehensif, jelas, agak panjang).\n\
         Output HARUS valid JSON exactly like:\n\
         {{ \"id\": \"Ringkasan Bahasa Indonesia\", \"en\": \"English summary\" }}\n\n\
         Teks:\n{}",
        text
    )
}

pub fn post_prompt(summary_en: &str) -> String {
    format!(
        "Given the following English summary, produce JSON: \
         {{\"title\": \"short title (<=10 words)\", \"ig_post\": \"IG post text (one slide)\"}}\n\n\
         Summary:\n{}",
        summary_en
    )
}

/// Parse a summarizer reply. Unparsable replies keep the raw text as `id_text`.
pub fn parse_summary(raw: &str) -> Summary {
    parse_reply::<Summary, _>(raw, |cleaned| Summary {
        id_text: cleaned.to_string(),
        en_text: String::new(),
    })
}

/// Parse a post generator reply. Unparsable replies yield `None`.
pub fn parse_post(raw: &str) -> Option<SocialPost> {
    parse_reply::<SocialPost, _>(raw, |_| None)
}

/// Summarize the combined article text for one headline in both languages.
///
/// Returns `None` without calling the service when `text` is blank, and
/// `None` when the service call itself fails.
#[instrument(level = "info", skip_all, fields(bytes = text.len()))]
pub async fn summarize<T: TextService>(
    service: &T,
    text: &str,
    config: &PipelineConfig,
) -> Option<Summary> {
    if text.trim().is_empty() {
        info!("Nothing to summarize");
        return None;
    }

    let request = ChatRequest::new(&config.summary_model, SUMMARY_SYSTEM_PROMPT, summary_prompt(text));
    match ask_timed(service, &request).await {
        Ok(raw) => {
            let summary = parse_summary(&raw);
            info!(
                id_bytes = summary.id_text.len(),
                en_bytes = summary.en_text.len(),
                "Summary ready"
            );
            Some(summary)
        }
        Err(e) => {
            warn!(error = %e, "Summary request failed");
            None
        }
    }
}

/// Derive a short title and one social post from an English summary.
///
/// Returns `None` without calling the service when the summary is blank.
#[instrument(level = "info", skip_all)]
pub async fn generate_post<T: TextService>(
    service: &T,
    summary_en: &str,
    config: &PipelineConfig,
) -> Option<SocialPost> {
    if summary_en.trim().is_empty() {
        return None;
    }

    let request = ChatRequest::new(&config.post_model, POST_SYSTEM_PROMPT, post_prompt(summary_en));
    match ask_timed(service, &request).await {
        Ok(raw) => {
            let post = parse_post(&raw);
            if let Some(post) = &post {
                info!(title = %post.title, "Social post ready");
            }
            post
        }
        Err(e) => {
            warn!(error = %e, "Social post request failed");
            None
        }
    }
}
