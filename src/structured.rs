//! Defensive parsing of structured text-service replies.
//!
//! The curator, summarizer, and post generator all expect a small JSON object
//! back from the model and all must survive getting something else. Each
//! declares its reply shape as a [`StructuredReply`]; [`parse_reply`] strips
//! any code fence, deserializes, validates, and hands the cleaned raw text to
//! the caller's fallback when any step fails.

use crate::utils::{looks_truncated, truncate_for_log};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// A reply shape the model is asked to produce.
pub trait StructuredReply: DeserializeOwned {
    /// What the caller gets once the reply is validated.
    type Output;

    /// Name used in log lines.
    const KIND: &'static str;

    /// Validate the deserialized reply. An `Err` takes the fallback path.
    fn into_output(self) -> Result<Self::Output, String>;
}

/// Remove a surrounding markdown code fence and its optional language tag.
///
/// ```ignore
/// assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
/// assert_eq!(strip_fences("{\"a\":1}"), "{\"a\":1}");
/// ```
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = rest.strip_suffix("```").unwrap_or(rest);

    // A tag is one word ending the opening line, or directly before the JSON.
    let tag_len = inner
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+')))
        .unwrap_or(inner.len());
    let after_tag = &inner[tag_len..];
    let is_tag = tag_len > 0
        && (after_tag.starts_with('\n')
            || after_tag.starts_with("\r\n")
            || after_tag.trim_start().starts_with(['{', '[']));
    if is_tag { after_tag.trim() } else { inner.trim() }
}

/// Parse `raw` as `S`, or call `fallback` with the fence-stripped text.
///
/// The reply must be a JSON object; arrays and scalars take the fallback
/// even when they would fill the fields of `S` positionally. Failures are
/// logged with a preview of the raw text for diagnosis.
pub fn parse_reply<S, F>(raw: &str, fallback: F) -> S::Output
where
    S: StructuredReply,
    F: FnOnce(&str) -> S::Output,
{
    let cleaned = strip_fences(raw);
    let reject = |reason: &str| {
        warn!(
            kind = S::KIND,
            %reason,
            response_preview = %truncate_for_log(cleaned, 300),
            "Structured reply rejected; using fallback"
        );
    };

    let value = match serde_json::from_str::<Value>(cleaned) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            reject(&format!("expected a JSON object, got {}", json_kind(&other)));
            return fallback(cleaned);
        }
        Err(e) => {
            warn!(
                kind = S::KIND,
                error = %e,
                truncated = looks_truncated(&e),
                response_preview = %truncate_for_log(cleaned, 300),
                "Model returned non-conforming JSON; using fallback"
            );
            return fallback(cleaned);
        }
    };

    let reply = match serde_json::from_value::<S>(value) {
        Ok(reply) => reply,
        Err(e) => {
            reject(&e.to_string());
            return fallback(cleaned);
        }
    };
    match reply.into_output() {
        Ok(output) => output,
        Err(reason) => {
            reject(&reason);
            fallback(cleaned)
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Pair {
        a: Option<i64>,
    }

    impl StructuredReply for Pair {
        type Output = i64;
        const KIND: &'static str = "pair";

        fn into_output(self) -> Result<i64, String> {
            self.a.ok_or_else(|| "missing a".to_string())
        }
    }

    #[test]
    fn test_strip_fences_with_language_tag() {
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("```JSON {\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_strip_fences_without_tag() {
        assert_eq!(strip_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_strip_fences_keeps_leading_prose_word() {
        assert_eq!(strip_fences("```\nSorry, no JSON.\n```"), "Sorry, no JSON.");
        assert_eq!(strip_fences("```Sorry, no JSON.```"), "Sorry, no JSON.");
        assert_eq!(strip_fences("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_parse_reply_success() {
        let out = parse_reply::<Pair, _>("```json\n{\"a\": 7}\n```", |_| -1);
        assert_eq!(out, 7);
    }

    #[test]
    fn test_parse_reply_invalid_json_uses_fallback_with_cleaned_text() {
        let out = parse_reply::<Pair, _>("```json\nnot json\n```", |raw| {
            assert_eq!(raw, "not json");
            -1
        });
        assert_eq!(out, -1);
    }

    #[test]
    fn test_parse_reply_validation_failure_uses_fallback() {
        let out = parse_reply::<Pair, _>("{\"b\": 2}", |_| -2);
        assert_eq!(out, -2);
    }

    #[test]
    fn test_parse_reply_array_uses_fallback() {
        let out = parse_reply::<Pair, _>("[7]", |raw| {
            assert_eq!(raw, "[7]");
            -4
        });
        assert_eq!(out, -4);
        assert_eq!(parse_reply::<Pair, _>("```json\n[7]\n```", |_| -5), -5);
    }

    #[test]
    fn test_parse_reply_wrong_type_uses_fallback() {
        let out = parse_reply::<Pair, _>("\"just a string\"", |_| -3);
        assert_eq!(out, -3);
    }
}
