use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, TimeZone};
use std::path::PathBuf;
use tokio::fs;

pub const DEFAULT_CATEGORY: &str = "科技";

/// Human-readable date used in the prompt and the post title, e.g. `2025年01月15日`
pub fn date_label<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%Y年%m月%d日").to_string()
}

/// Writes news digests as markdown posts laid out by year and month.
#[derive(Debug, Clone)]
pub struct Publisher {
    base_dir: PathBuf,
    category: String,
}

impl Publisher {
    pub fn new(base_dir: impl Into<PathBuf>, category: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            category: category.into(),
        }
    }

    /// `<base>/<year>/<month>/<date>-news.md`
    pub fn document_path<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> PathBuf
    where
        Tz::Offset: std::fmt::Display,
    {
        self.base_dir
            .join(now.year().to_string())
            .join(format!("{:02}", now.month()))
            .join(format!("{}-news.md", now.format("%Y-%m-%d")))
    }

    pub fn render<Tz: TimeZone>(&self, body: &str, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        format!(
            "---\ntitle: {}科技新闻\ndate: {}\ncategories: ['{}']\n---\n\n{}\n",
            date_label(now),
            now.format("%Y-%m-%d"),
            self.category,
            body
        )
    }

    /// Write the post for `now`, replacing any earlier post for the same day.
    pub async fn publish<Tz: TimeZone>(&self, body: Option<&str>, now: &DateTime<Tz>) -> Result<PathBuf>
    where
        Tz::Offset: std::fmt::Display,
    {
        let path = self.document_path(now);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }

        let content = self.render(body.unwrap_or_default(), now);
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
