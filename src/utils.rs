//! Utility functions for logging, file naming, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Run date stamping for output directories
//! - String truncation for log previews
//! - JSON error classification for malformed model output
//! - Filename sanitization for headline folders
//! - File system validation for the output root

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\- ]+").expect("valid filename regex"));

/// Today's local date as `YYYY-MM-DD`, used to name the run directories.
pub fn run_date() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (backing off to the nearest
/// char boundary) with an ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// A model response cut off by its token limit fails with an EOF error;
/// flagging it in logs separates truncation from outright non-JSON replies.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Turn a headline title into a folder name.
///
/// Characters outside `[A-Za-z0-9_- ]` are removed, the result is trimmed,
/// spaces become underscores, and the name is cut to `max_len` characters.
/// Titles with nothing left become `"untitled"`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(safe_filename("Fed holds rates: what's next?", 80), "Fed_holds_rates_whats_next");
/// assert_eq!(safe_filename("???", 80), "untitled");
/// ```
pub fn safe_filename(s: &str, max_len: usize) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(s, "");
    let name: String = cleaned
        .trim()
        .replace(' ', "_")
        .chars()
        .take(max_len)
        .collect();
    if name.is_empty() {
        "untitled".to_string()
    } else {
        name
    }
}

/// Create the output root if needed and prove a file can be written in it.
///
/// The check file is removed again on success.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    let root = Path::new(path);
    fs::create_dir_all(root).await?;

    let check = root.join(".story_digest_write_check");
    fs::write(&check, b"ok").await?;
    fs::remove_file(&check).await?;
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        // 'é' is two bytes; cutting at 1 would split it
        let result = truncate_for_log("éé", 1);
        assert_eq!(result, "…(+4 bytes)");
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("Hello World", 80), "Hello_World");
        assert_eq!(
            safe_filename("Fed holds rates: what's next?", 80),
            "Fed_holds_rates_whats_next"
        );
        assert_eq!(safe_filename("  padded  ", 80), "padded");
        assert_eq!(safe_filename("keep-dash_and_underscore", 80), "keep-dash_and_underscore");
    }

    #[test]
    fn test_safe_filename_truncates_and_defaults() {
        assert_eq!(safe_filename("abcdefghij", 4), "abcd");
        assert_eq!(safe_filename("???", 80), "untitled");
        assert_eq!(safe_filename("", 80), "untitled");
    }

    #[test]
    fn test_run_date_shape() {
        let date = run_date();
        assert_eq!(date.len(), 10);
        assert_eq!(&date[4..5], "-");
        assert_eq!(&date[7..8], "-");
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"{"field": "value"#;
        let result: Result<serde_json::Value, _> = serde_json::from_str(json_eof);
        let err = result.unwrap_err();
        assert!(looks_truncated(&err));

        let not_json: Result<serde_json::Value, _> = serde_json::from_str("nope");
        assert!(!looks_truncated(&not_json.unwrap_err()));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        let nested = nested.to_str().unwrap();
        ensure_writable_dir(nested).await.unwrap();
        assert!(Path::new(nested).is_dir());
        assert_eq!(std::fs::read_dir(nested).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_rejects_file_in_the_way() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "x").unwrap();
        let target = blocker.join("out");
        assert!(ensure_writable_dir(target.to_str().unwrap()).await.is_err());
    }
}
