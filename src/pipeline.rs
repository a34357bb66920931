//! Run coordination.
//!
//! A run moves strictly forward through
//! `Fetching → Selecting → Expanding → Scraping → Summarizing → Posting → Done`.
//! Each curated headline carries its own [`HeadlineWorkingSet`]; a headline
//! that runs out of material (no story token, no links, no accepted articles,
//! no usable summary) stops at that stage while the others continue.
//!
//! Stages never fail. The only errors a run returns come from writing
//! artifacts to disk, which aborts the run.

use crate::api::TextService;
use crate::config::PipelineConfig;
use crate::extract::{PageRenderer, RenderSession, scrape_links};
use crate::headlines::{curate, resolve_headlines};
use crate::links::resolve_supporting_links;
use crate::models::{
    EarlyExit, HeadlineStage, HeadlineWorkingSet, RunReport, RunStage, SocialPost,
};
use crate::outputs::csv::{write_headlines_csv, write_posts_csv, write_selection_csv};
use crate::outputs::files::{RunLayout, write_articles, write_summary};
use crate::provider::HeadlineProvider;
use crate::summarize::{generate_post, summarize};
use crate::utils::safe_filename;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};

/// Everything a finished run hands back.
#[derive(Debug)]
pub struct RunOutput {
    pub report: RunReport,
    pub headlines: Vec<HeadlineWorkingSet>,
}

/// Sequences the stages of one run over borrowed collaborators.
pub struct Pipeline<'a, P, T, R> {
    provider: &'a P,
    text: &'a T,
    renderer: &'a R,
    config: &'a PipelineConfig,
    stage: RunStage,
}

impl<'a, P, T, R> Pipeline<'a, P, T, R>
where
    P: HeadlineProvider,
    T: TextService,
    R: PageRenderer,
{
    pub fn new(provider: &'a P, text: &'a T, renderer: &'a R, config: &'a PipelineConfig) -> Self {
        Self {
            provider,
            text,
            renderer,
            config,
            stage: RunStage::Fetching,
        }
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    fn enter(&mut self, next: RunStage) {
        if next <= self.stage {
            return;
        }
        info!(from = %self.stage, to = %next, "Run stage");
        self.stage = next;
    }

    /// Execute one full run, writing artifacts under `layout`.
    #[instrument(level = "info", skip_all, fields(date_dir = %layout.date_dir.display()))]
    pub async fn run(&mut self, layout: &RunLayout) -> Result<RunOutput, Box<dyn Error>> {
        let mut report = RunReport::default();

        let headlines = resolve_headlines(self.provider, self.config).await;
        report.headlines_fetched = headlines.len();
        if headlines.is_empty() {
            warn!("No headlines; nothing to do");
            self.enter(RunStage::Done);
            return Ok(RunOutput {
                report,
                headlines: Vec::new(),
            });
        }
        layout.prepare().await?;
        write_headlines_csv(&layout.date_dir, &self.config.file_prefix, &headlines).await?;

        self.enter(RunStage::Selecting);
        let selection = curate(self.text, &headlines, self.config).await;
        if selection.is_empty() {
            warn!("Curator selected no headlines");
        }
        let selected = selection.resolve(&headlines);
        report.headlines_curated = selected.len();
        write_selection_csv(
            &layout.date_dir,
            &self.config.file_prefix,
            self.config.select_count,
            &selected,
        )
        .await?;

        let mut working: Vec<HeadlineWorkingSet> = Vec::with_capacity(selected.len());
        for headline in selected {
            let short_title: String = headline
                .title
                .chars()
                .take(self.config.folder_name_max)
                .collect();
            let name = safe_filename(&short_title, self.config.folder_name_max);
            let folder = layout.create_headline_dir(&name).await?;
            if folder != name {
                debug!(%name, %folder, "Headline folder name taken; suffixed");
            }
            working.push(HeadlineWorkingSet::new(headline.clone(), folder));
        }

        self.enter(RunStage::Expanding);
        self.expand(&mut working).await;
        report.links_found = working.iter().map(|ws| ws.links.len()).sum();

        self.enter(RunStage::Scraping);
        self.scrape(&mut working).await;
        for ws in working.iter().filter(|ws| ws.is_active()) {
            write_articles(&layout.headline_dir(&ws.folder), &ws.articles).await?;
        }
        report.articles_accepted = working.iter().map(|ws| ws.articles.len()).sum();

        self.enter(RunStage::Summarizing);
        self.summarize(&mut working).await;
        for ws in &working {
            if let Some(summary) = &ws.summary {
                write_summary(&layout.summary_dir, &ws.folder, summary).await?;
            }
        }
        report.summaries = working.iter().filter(|ws| ws.summary.is_some()).count();

        self.enter(RunStage::Posting);
        self.post(&mut working).await;
        let posts: Vec<(&str, &SocialPost)> = working
            .iter()
            .filter_map(|ws| ws.post.as_ref().map(|p| (ws.folder.as_str(), p)))
            .collect();
        report.posts = posts.len();
        write_posts_csv(&layout.summary_dir, &posts).await?;

        self.enter(RunStage::Done);
        for ws in &working {
            match ws.stage {
                HeadlineStage::Stopped(reason) => {
                    info!(folder = %ws.folder, %reason, "Headline stopped early")
                }
                _ => info!(folder = %ws.folder, "Headline complete"),
            }
        }
        info!(?report, "Run finished");
        Ok(RunOutput {
            report,
            headlines: working,
        })
    }

    async fn expand(&self, working: &mut [HeadlineWorkingSet]) {
        for ws in working.iter_mut() {
            let Some(story_id) = ws.headline.story_id.clone() else {
                info!(title = %ws.headline.title, "No story token; skipping supporting links");
                ws.stop(EarlyExit::NoStoryToken);
                continue;
            };
            ws.links = resolve_supporting_links(self.provider, &story_id, self.config).await;
            if ws.links.is_empty() {
                ws.stop(EarlyExit::NoSupportingLinks);
            } else {
                ws.advance(HeadlineStage::Scraping);
            }
        }
    }

    /// Scrape every active headline through one shared session.
    ///
    /// The session is closed before returning on every path; per-URL failures
    /// never escape the loop.
    async fn scrape(&self, working: &mut [HeadlineWorkingSet]) {
        if !working.iter().any(|ws| ws.is_active()) {
            return;
        }
        let mut session = match self.renderer.open().await {
            Ok(session) => Some(session),
            Err(e) => {
                error!(error = %e, "Could not open page session; no pages will be scraped");
                None
            }
        };

        for ws in working.iter_mut().filter(|ws| ws.is_active()) {
            if let Some(session) = session.as_mut() {
                info!(title = %ws.headline.title, links = ws.links.len(), "Scraping headline");
                ws.articles = scrape_links(session, &ws.links, self.config).await;
            }
            if ws.articles.is_empty() {
                ws.stop(EarlyExit::NoArticles);
            } else {
                ws.advance(HeadlineStage::Summarizing);
            }
        }

        if let Some(session) = session {
            session.close().await;
        }
    }

    async fn summarize(&self, working: &mut [HeadlineWorkingSet]) {
        for ws in working.iter_mut().filter(|ws| ws.is_active()) {
            let combined = ws.combined_text();
            if combined.trim().is_empty() {
                ws.stop(EarlyExit::NoArticles);
                continue;
            }
            match summarize(self.text, &combined, self.config).await {
                Some(summary) => {
                    let has_english = !summary.en_text.trim().is_empty();
                    ws.summary = Some(summary);
                    if has_english {
                        ws.advance(HeadlineStage::Posting);
                    } else {
                        ws.stop(EarlyExit::EmptyEnglishSummary);
                    }
                }
                None => ws.stop(EarlyExit::SummaryUnavailable),
            }
        }
    }

    async fn post(&self, working: &mut [HeadlineWorkingSet]) {
        for ws in working.iter_mut().filter(|ws| ws.is_active()) {
            let en_text = ws
                .summary
                .as_ref()
                .map(|s| s.en_text.as_str())
                .unwrap_or("");
            match generate_post(self.text, en_text, self.config).await {
                Some(post) => {
                    ws.post = Some(post);
                    ws.advance(HeadlineStage::Done);
                }
                None => ws.stop(EarlyExit::PostUnavailable),
            }
        }
    }
}
