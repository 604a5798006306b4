//! Type definitions for the RSS module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::error::FetchError;

/// A feed to fetch, as listed in the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    pub label: Option<String>,
}

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: None,
        }
    }
}

/// The items retrieved from one source in one fetch run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feed {
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub items: Vec<FeedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
}

impl Feed {
    pub fn failed(source_url: &str, error: &FetchError) -> Self {
        Self {
            source_url: source_url.to_string(),
            title: None,
            items: Vec::new(),
            fetch_error: Some(error.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.fetch_error.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedItem {
    #[serde(default)]
    pub title: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub summary: String,
    pub source_feed_url: String,
}

/// Outcome of a whole fetch batch. `feeds` is in source-file order.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub feeds: Vec<Feed>,
}

impl FetchReport {
    pub fn total_items(&self) -> usize {
        self.feeds.iter().map(|f| f.items.len()).sum()
    }

    pub fn failed_feeds(&self) -> impl Iterator<Item = &Feed> {
        self.feeds.iter().filter(|f| f.is_failed())
    }

    pub fn failure_count(&self) -> usize {
        self.failed_feeds().count()
    }
}

/// Tuning knobs for a fetch batch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub workers: usize,
    pub request_timeout: Duration,
    pub retries: usize,
    pub retry_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_FEED_WORKERS,
            request_timeout: REQUEST_TIMEOUT,
            retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
        }
    }
}

// Constants
pub const DEFAULT_FEED_WORKERS: usize = 20;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const RETRY_DELAY: Duration = Duration::from_secs(5);
pub const MAX_RETRIES: usize = 2;
