use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use tracing::{error, info, Instrument};

use crate::configuration::Settings;
use crate::credentials::load_api_key;
use crate::fetcher::NewsFetcher;
use crate::providers::openai::OpenAiProvider;
use crate::publisher::{date_label, Publisher};

/// What a single fetch-and-publish cycle came to.
#[derive(Debug)]
pub enum CycleOutcome {
    Published { path: PathBuf },
    Failed { error: anyhow::Error },
}

impl CycleOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, CycleOutcome::Published { .. })
    }

    /// Log the outcome; failures are reported with their whole cause chain
    pub fn log(&self) {
        match self {
            CycleOutcome::Published { path } => {
                info!("News saved to {}", path.display())
            }
            CycleOutcome::Failed { error } => {
                error!("Failed to collect news: {:?}", error)
            }
        }
    }
}

/// Runs one complete cycle: credential, model conversation, markdown post.
pub struct Collector {
    settings: Settings,
    publisher: Publisher,
}

impl Collector {
    pub fn new(settings: Settings) -> Self {
        let publisher = Publisher::new(
            settings.publisher.output_dir.clone(),
            settings.publisher.category.clone(),
        );
        Self {
            settings,
            publisher,
        }
    }

    /// Never fails: any error is captured in the returned outcome and logged.
    pub async fn run_cycle(&self, now: DateTime<Local>) -> CycleOutcome {
        let label = date_label(&now);
        let span = tracing::info_span!("cycle", date = %now.format("%Y-%m-%d"));

        let outcome = match self.collect(&label, now).instrument(span.clone()).await {
            Ok(path) => CycleOutcome::Published { path },
            Err(error) => CycleOutcome::Failed { error },
        };
        span.in_scope(|| outcome.log());
        outcome
    }

    async fn collect(&self, label: &str, now: DateTime<Local>) -> Result<PathBuf> {
        info!("Current time: {} {}", label, now.format("%H:%M:%S"));
        info!("Fetching news for {}", label);

        let api_key = load_api_key(&self.settings.credential_file)?;
        let provider = OpenAiProvider::new(self.settings.provider.clone().into_config(api_key))
            .context("Failed to build the API client")?;
        let fetcher = NewsFetcher::new(Box::new(provider))
            .with_max_tool_rounds(self.settings.fetcher.max_tool_rounds);

        info!("Searching for news");
        let news = fetcher
            .fetch(label)
            .await
            .with_context(|| format!("Failed to fetch news for {}", label))?;

        self.publisher.publish(news.as_deref(), &now).await
    }
}
