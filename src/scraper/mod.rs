//! Article scraping for the items of one day bucket.
//!
//! Every item is fetched and extracted independently on a bounded pool. A
//! failure of one item is logged and counted, never propagated; only an
//! unloadable bucket or an unreachable index ends the run early.

mod extraction;
mod types;

pub use extraction::extract_article;
pub use types::*;

use futures::stream::{self, StreamExt};
use std::path::Path;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::index::IndexWriter;
use crate::rss::FeedItem;
use crate::store::{load_bucket, DayBucket};
use crate::TARGET_WEB_REQUEST;

pub struct Scraper {
    client: reqwest::Client,
    items: Vec<FeedItem>,
    options: ScrapeOptions,
    cancel: Option<watch::Receiver<bool>>,
}

impl Scraper {
    pub fn new(client: reqwest::Client, items: Vec<FeedItem>, options: ScrapeOptions) -> Self {
        Self {
            client,
            items,
            options,
            cancel: None,
        }
    }

    /// Scrape every item of `bucket`, across all feeds, in record order.
    pub fn from_bucket(client: reqwest::Client, bucket: &DayBucket, options: ScrapeOptions) -> Self {
        Self::new(client, bucket.items().cloned().collect(), options)
    }

    /// Load the bucket at `path` and scrape its items.
    pub fn from_path(
        client: reqwest::Client,
        path: &Path,
        options: ScrapeOptions,
    ) -> Result<Self, ScrapeError> {
        let bucket = load_bucket(path)?;
        info!(target: TARGET_WEB_REQUEST, "Loaded {} items from {}", bucket.item_count(), path.display());
        Ok(Self::from_bucket(client, &bucket, options))
    }

    /// Items not yet started when `cancel` flips to `true` are skipped and
    /// not counted.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Extract every item and write each article to `writer` as soon as it
    /// is ready.
    pub async fn scrape(&self, writer: &IndexWriter, verbose: bool) -> Result<ScrapeRun, ScrapeError> {
        writer.ping().await?;

        let workers = self.options.workers.max(1);
        info!(target: TARGET_WEB_REQUEST, "Scraping {} articles with {} workers", self.items.len(), workers);

        let run = stream::iter(&self.items)
            .take_while(|_| std::future::ready(!self.is_cancelled()))
            .map(|item| self.scrape_item(item, writer, verbose))
            .buffer_unordered(workers)
            .fold(ScrapeRun::default(), |mut run, ok| async move {
                run.record(ok);
                run
            })
            .await;

        if self.is_cancelled() {
            warn!(target: TARGET_WEB_REQUEST, "Scrape cancelled after {} of {} items", run.attempted, self.items.len());
        }
        Ok(run)
    }

    async fn scrape_item(&self, item: &FeedItem, writer: &IndexWriter, verbose: bool) -> bool {
        let article = match extract_article(&self.client, item, &self.options).await {
            Ok(article) => article,
            Err(err) => {
                if verbose {
                    info!(target: TARGET_WEB_REQUEST, "Failed {}: {}", item.link, err);
                } else {
                    debug!(target: TARGET_WEB_REQUEST, "Failed {}: {}", item.link, err);
                }
                return false;
            }
        };

        match writer.write(&article).await {
            Ok(id) => {
                if verbose {
                    info!(target: TARGET_WEB_REQUEST, "Indexed {} ({} chars) as {}", item.link, article.body.chars().count(), id);
                }
                true
            }
            Err(err) => {
                warn!(target: TARGET_WEB_REQUEST, "Failed to index {}: {}", item.link, err);
                false
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, |rx| *rx.borrow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_run_counts() {
        let mut run = ScrapeRun::default();
        run.record(true);
        run.record(false);
        run.record(true);
        assert_eq!(run.attempted, 3);
        assert_eq!(run.failed, 1);
        assert_eq!(run.succeeded(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_attempts_nothing() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let items = vec![FeedItem {
            title: "t".to_string(),
            link: "http://127.0.0.1:9/never".to_string(),
            published_at: None,
            summary: String::new(),
            source_feed_url: "http://127.0.0.1:9/feed".to_string(),
        }];
        let scraper = Scraper::new(reqwest::Client::new(), items, ScrapeOptions::default())
            .with_cancellation(rx);
        let writer = IndexWriter::new(std::sync::Arc::new(crate::index::MemoryIndex::new()));

        let run = scraper.scrape(&writer, false).await.unwrap();
        assert_eq!(run, ScrapeRun::default());
    }

    #[tokio::test]
    async fn test_invalid_link_counts_as_failure() {
        let items = vec![FeedItem {
            title: "t".to_string(),
            link: "not a url".to_string(),
            published_at: None,
            summary: String::new(),
            source_feed_url: "http://127.0.0.1:9/feed".to_string(),
        }];
        let scraper = Scraper::new(reqwest::Client::new(), items, ScrapeOptions::default());
        let index = std::sync::Arc::new(crate::index::MemoryIndex::new());
        let writer = IndexWriter::new(index.clone());

        let run = scraper.scrape(&writer, true).await.unwrap();
        assert_eq!(run.attempted, 1);
        assert_eq!(run.failed, 1);
        assert!(index.is_empty().await);
    }
}
