use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Duration;

/// Extracted content of one feed item's link.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Article {
    pub source_link: String,
    pub title: String,
    pub body: String,
    pub published_at: Option<DateTime<Utc>>,
    pub extracted_at: DateTime<Utc>,
    pub canonical_url: Option<String>,
    pub description: Option<String>,
}

/// Aggregate counters of one scrape run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeRun {
    pub attempted: usize,
    pub failed: usize,
}

impl ScrapeRun {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed
    }

    pub(crate) fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if !ok {
            self.failed += 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub workers: usize,
    pub request_timeout: Duration,
    /// Bodies shorter than this many characters count as failed extractions.
    pub min_body_chars: usize,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_SCRAPE_WORKERS,
            request_timeout: ARTICLE_TIMEOUT,
            min_body_chars: MIN_BODY_CHARS,
        }
    }
}

pub const DEFAULT_SCRAPE_WORKERS: usize = 20;
pub const ARTICLE_TIMEOUT: Duration = Duration::from_secs(60);
pub const MIN_BODY_CHARS: usize = 200;
