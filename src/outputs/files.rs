//! Run directory layout and collision-free file writes.
//!
//! # Output Structure
//!
//! ```text
//! output_root/
//! ├── 2025-05-06/
//! │   ├── eng_business_headlines.csv
//! │   ├── eng_business_top5.csv
//! │   └── Fed_holds_rates_steady/
//! │       ├── 1.txt
//! │       └── 2.txt
//! └── summary_2025-05-06/
//!     ├── id_sum_Fed_holds_rates_steady.txt
//!     ├── en_sum_Fed_holds_rates_steady.txt
//!     └── ig_posts_with_title.csv
//! ```
//!
//! Nothing is ever overwritten: when a target exists, `name(1).ext`,
//! `name(2).ext`, … are tried until a free name is found.

use crate::models::{ExtractedArticle, Summary};
use std::error::Error;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

/// First non-existing path among `base.ext`, `base(1).ext`, `base(2).ext`, …
pub fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let mut path = dir.join(format!("{}.{}", stem, ext));
    let mut i = 1;
    while path.exists() {
        path = dir.join(format!("{}({}).{}", stem, i, ext));
        i += 1;
    }
    path
}

/// Write `contents` to a fresh file named after `stem.ext` inside `dir`.
///
/// Uses create-new semantics, so a file appearing between the existence
/// check and the write moves on to the next suffix instead of being clobbered.
pub async fn write_unique(
    dir: &Path,
    stem: &str,
    ext: &str,
    contents: &[u8],
) -> Result<PathBuf, Box<dyn Error>> {
    loop {
        let path = unique_path(dir, stem, ext);
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        match file {
            Ok(mut file) => {
                file.write_all(contents).await?;
                file.flush().await?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Directories used by a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    /// `<root>/<date>`: CSVs and one folder per curated headline.
    pub date_dir: PathBuf,
    /// `<root>/summary_<date>`: summaries and the posts CSV.
    pub summary_dir: PathBuf,
}

impl RunLayout {
    pub fn new(root: &Path, run_date: &str) -> Self {
        Self {
            date_dir: root.join(run_date),
            summary_dir: root.join(format!("summary_{}", run_date)),
        }
    }

    /// Create the date and summary directories.
    #[instrument(level = "info", skip_all, fields(date_dir = %self.date_dir.display()))]
    pub async fn prepare(&self) -> Result<(), Box<dyn Error>> {
        fs::create_dir_all(&self.date_dir).await?;
        fs::create_dir_all(&self.summary_dir).await?;
        Ok(())
    }

    pub fn headline_dir(&self, folder: &str) -> PathBuf {
        self.date_dir.join(folder)
    }

    /// Create a fresh folder for one curated headline and return its name.
    ///
    /// Folders follow the same suffix rule as files: when `name` is taken,
    /// `name(1)`, `name(2)`, … are tried, so no two headlines share a folder.
    /// Expects [`RunLayout::prepare`] to have created the date directory.
    pub async fn create_headline_dir(&self, name: &str) -> Result<String, Box<dyn Error>> {
        let mut folder = name.to_string();
        let mut i = 1;
        loop {
            match fs::create_dir(self.headline_dir(&folder)).await {
                Ok(()) => return Ok(folder),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    folder = format!("{}({})", name, i);
                    i += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Write accepted articles as `1.txt`, `2.txt`, … in acceptance order.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), count = articles.len()))]
pub async fn write_articles(
    dir: &Path,
    articles: &[ExtractedArticle],
) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut written = Vec::with_capacity(articles.len());
    for (i, article) in articles.iter().enumerate() {
        let path = write_unique(dir, &(i + 1).to_string(), "txt", article.text.as_bytes()).await?;
        debug!(path = %path.display(), source = %article.source_url, "Wrote article");
        written.push(path);
    }
    info!(count = written.len(), "Wrote supporting articles");
    Ok(written)
}

/// Write `id_sum_<folder>.txt` and `en_sum_<folder>.txt`.
#[instrument(level = "info", skip_all, fields(%folder))]
pub async fn write_summary(
    summary_dir: &Path,
    folder: &str,
    summary: &Summary,
) -> Result<(PathBuf, PathBuf), Box<dyn Error>> {
    let id_path = write_unique(
        summary_dir,
        &format!("id_sum_{}", folder),
        "txt",
        summary.id_text.as_bytes(),
    )
    .await?;
    let en_path = write_unique(
        summary_dir,
        &format!("en_sum_{}", folder),
        "txt",
        summary.en_text.as_bytes(),
    )
    .await?;
    info!(id = %id_path.display(), en = %en_path.display(), "Saved summaries");
    Ok((id_path, en_path))
}
