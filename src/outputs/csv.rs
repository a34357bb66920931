//! CSV reports for a run.
//!
//! Three files are produced: the full headline batch, the curated selection,
//! and the generated social posts. All are UTF-8 with a byte-order mark so
//! spreadsheet tools pick the right encoding, with RFC 4180 quoting.

use crate::models::{Headline, SocialPost};
use crate::outputs::files::write_unique;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

const BOM: &str = "\u{feff}";

/// Quote a field when it contains a delimiter, quote, or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    let row: Vec<String> = fields.into_iter().map(escape_field).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

/// Render a header plus rows as a CSV document.
pub fn csv_document<'a, R>(header: &[&str], rows: R) -> String
where
    R: IntoIterator<Item = Vec<&'a str>>,
{
    let mut out = String::from(BOM);
    push_row(&mut out, header.iter().copied());
    for row in rows {
        push_row(&mut out, row);
    }
    out
}

/// Title, Link, Source, Published, StoryToken for every fetched headline.
#[instrument(level = "info", skip_all, fields(count = headlines.len()))]
pub async fn write_headlines_csv(
    dir: &Path,
    prefix: &str,
    headlines: &[Headline],
) -> Result<PathBuf, Box<dyn Error>> {
    let doc = csv_document(
        &["Title", "Link", "Source", "Published", "StoryToken"],
        headlines.iter().map(|h| {
            vec![
                h.title.as_str(),
                h.link.as_str(),
                h.source.as_str(),
                h.published.as_str(),
                h.story_token(),
            ]
        }),
    );
    let path = write_unique(dir, &format!("{}_headlines", prefix), "csv", doc.as_bytes()).await?;
    info!(path = %path.display(), "Saved headlines");
    Ok(path)
}

/// StoryToken, Title, Link for the curated headlines only.
#[instrument(level = "info", skip_all, fields(count = selected.len()))]
pub async fn write_selection_csv(
    dir: &Path,
    prefix: &str,
    select_count: usize,
    selected: &[&Headline],
) -> Result<PathBuf, Box<dyn Error>> {
    let doc = csv_document(
        &["StoryToken", "Title", "Link"],
        selected
            .iter()
            .map(|h| vec![h.story_token(), h.title.as_str(), h.link.as_str()]),
    );
    let stem = format!("{}_top{}", prefix, select_count);
    let path = write_unique(dir, &stem, "csv", doc.as_bytes()).await?;
    info!(path = %path.display(), "Saved curated selection");
    Ok(path)
}

/// headline_folder, title, ig_post for every headline that produced a post.
#[instrument(level = "info", skip_all, fields(count = posts.len()))]
pub async fn write_posts_csv(
    dir: &Path,
    posts: &[(&str, &SocialPost)],
) -> Result<PathBuf, Box<dyn Error>> {
    let doc = csv_document(
        &["headline_folder", "title", "ig_post"],
        posts
            .iter()
            .map(|(folder, post)| vec![*folder, post.title.as_str(), post.body.as_str()]),
    );
    let path = write_unique(dir, "ig_posts_with_title", "csv", doc.as_bytes()).await?;
    info!(path = %path.display(), "Saved social posts");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headline(title: &str, story: Option<&str>) -> Headline {
        Headline {
            title: title.to_string(),
            link: "https://example.com/a".to_string(),
            source: "Wire".to_string(),
            published: "today".to_string(),
            story_id: story.map(str::to_string),
        }
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_csv_document_has_bom_and_header() {
        let doc = csv_document(&["A", "B"], vec![vec!["1", "x,y"]]);
        assert!(doc.starts_with('\u{feff}'));
        assert_eq!(doc.trim_start_matches('\u{feff}'), "A,B\r\n1,\"x,y\"\r\n");
    }

    #[tokio::test]
    async fn test_headlines_csv_writes_empty_token_for_missing_story() {
        let dir = tempfile::tempdir().unwrap();
        let headlines = vec![headline("One", Some("tok")), headline("Two", None)];
        let path = write_headlines_csv(dir.path(), "eng_business", &headlines)
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("eng_business_headlines.csv"));
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("One,https://example.com/a,Wire,today,tok\r\n"));
        assert!(body.contains("Two,https://example.com/a,Wire,today,\r\n"));
    }

    #[tokio::test]
    async fn test_selection_and_posts_csv() {
        let dir = tempfile::tempdir().unwrap();
        let h = headline("One", Some("tok"));
        let path = write_selection_csv(dir.path(), "eng_business", 5, &[&h])
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("eng_business_top5.csv"));
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("StoryToken,Title,Link\r\ntok,One,https://example.com/a\r\n"));

        let post = SocialPost {
            title: "Short".to_string(),
            body: "Body, with comma".to_string(),
        };
        let posts_path = write_posts_csv(dir.path(), &[("One", &post)]).await.unwrap();
        let body = std::fs::read_to_string(posts_path).unwrap();
        assert!(body.contains("One,Short,\"Body, with comma\"\r\n"));

        let empty = write_posts_csv(dir.path(), &[]).await.unwrap();
        assert_eq!(empty, dir.path().join("ig_posts_with_title(1).csv"));
    }
}
