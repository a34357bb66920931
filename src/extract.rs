//! Page rendering and article text extraction.
//!
//! A run opens one [`RenderSession`] through a [`PageRenderer`], reuses it for
//! every supporting link, and closes it once scraping is done. Each page is
//! loaded, given a fixed settle delay, and then read; [`extract_text`] pulls
//! the paragraph text out of the markup.
//!
//! # Extraction priority
//!
//! 1. Paragraphs inside the first `<article>`, else the first `[role=main]`
//! 2. Paragraphs anywhere in `<body>`
//! 3. Empty string
//!
//! Text is accepted only when, trimmed, it is longer than the configured
//! minimum. Load or read failures count as empty text for that URL.

use crate::config::PipelineConfig;
use crate::models::ExtractedArticle;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

static ARTICLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article").expect("valid article selector"));
static MAIN_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[role="main"]"#).expect("valid main selector"));
static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("valid body selector"));
static PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("valid paragraph selector"));

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Acquires the page-loading session shared by one run.
pub trait PageRenderer {
    type Session: RenderSession;

    async fn open(&self) -> Result<Self::Session, Box<dyn Error>>;
}

/// A live page-loading session.
pub trait RenderSession {
    /// Navigate to `url`.
    async fn navigate(&mut self, url: &str) -> Result<(), Box<dyn Error>>;

    /// Markup of the current page as rendered so far.
    async fn page_source(&mut self) -> Result<String, Box<dyn Error>>;

    /// Release the session.
    async fn close(self);
}

/// Renderer that loads pages over HTTP with a browser user agent.
///
/// It does not execute scripts; the settle delay is still applied so the
/// pacing matches a script-capable backend.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    timeout: Duration,
}

impl HttpRenderer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpRenderer {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl PageRenderer for HttpRenderer {
    type Session = HttpSession;

    #[instrument(level = "info", skip_all)]
    async fn open(&self) -> Result<HttpSession, Box<dyn Error>> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(self.timeout)
            .build()?;
        info!("Page session opened");
        Ok(HttpSession {
            client: Some(client),
            current: None,
        })
    }
}

/// One shared HTTP client plus the most recently loaded page.
pub struct HttpSession {
    client: Option<reqwest::Client>,
    current: Option<String>,
}

impl fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSession")
            .field("open", &self.client.is_some())
            .field("has_page", &self.current.is_some())
            .finish()
    }
}

impl RenderSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), Box<dyn Error>> {
        self.current = None;
        let client = self.client.as_ref().ok_or("page session already closed")?;
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("page load returned status {}", status).into());
        }
        self.current = Some(response.text().await?);
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, Box<dyn Error>> {
        self.current.clone().ok_or_else(|| "no page loaded".into())
    }

    async fn close(mut self) {
        self.client = None;
        self.current = None;
        info!("Page session closed");
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        if self.client.take().is_some() {
            warn!("Page session dropped without close; releasing");
        }
    }
}

fn paragraph_text(container: ElementRef<'_>) -> String {
    container
        .select(&PARAGRAPH_SELECTOR)
        .map(|p| p.text().collect::<String>())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract paragraph text from page markup.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let main = document
        .select(&ARTICLE_SELECTOR)
        .next()
        .or_else(|| document.select(&MAIN_SELECTOR).next());
    if let Some(container) = main {
        return paragraph_text(container);
    }
    if let Some(body) = document.select(&BODY_SELECTOR).next() {
        return paragraph_text(body);
    }
    String::new()
}

/// Return `text` when its trimmed length is strictly greater than `min_chars`.
pub fn accept_text(text: String, min_chars: usize) -> Option<String> {
    (text.trim().chars().count() > min_chars).then_some(text)
}

/// Load one URL in the session and extract its text.
///
/// Any failure is logged and yields an empty string.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn scrape_article<S: RenderSession>(session: &mut S, url: &str, wait: Duration) -> String {
    let t0 = Instant::now();
    if let Err(e) = session.navigate(url).await {
        error!(error = %e, "Page load failed");
        return String::new();
    }
    sleep(wait).await;
    match session.page_source().await {
        Ok(html) => {
            let text = extract_text(&html);
            debug!(
                bytes = text.len(),
                elapsed_ms = t0.elapsed().as_millis(),
                "Extracted page text"
            );
            text
        }
        Err(e) => {
            error!(error = %e, "Reading page source failed");
            String::new()
        }
    }
}

/// Scrape every link in order, keeping only accepted articles.
#[instrument(level = "info", skip_all, fields(links = links.len()))]
pub async fn scrape_links<S: RenderSession>(
    session: &mut S,
    links: &[String],
    config: &PipelineConfig,
) -> Vec<ExtractedArticle> {
    let mut articles = Vec::new();
    for (i, link) in links.iter().enumerate() {
        debug!(n = i + 1, total = links.len(), %link, "Scraping supporting link");
        let text = scrape_article(session, link, config.page_wait()).await;
        match accept_text(text, config.min_article_chars) {
            Some(text) => articles.push(ExtractedArticle {
                source_url: link.clone(),
                text,
            }),
            None => info!(%link, "No article text found or too short; skipped"),
        }
    }
    info!(
        accepted = articles.len(),
        total = links.len(),
        "Scraped supporting articles"
    );
    articles
}
