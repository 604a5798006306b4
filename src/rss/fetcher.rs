//! Batch feed fetching with per-feed isolation.

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::client::{fetch_with_fallback, FEED_ACCEPT};
use super::parser::parse_feed;
use super::types::{Feed, FeedSource, FetchOptions, FetchReport};
use super::util::is_valid_url;
use crate::error::FetchError;
use crate::TARGET_WEB_REQUEST;

/// Fetches many feeds concurrently. One feed's failure never affects another.
pub struct FeedFetcher {
    client: reqwest::Client,
    options: FetchOptions,
    cancel: Option<watch::Receiver<bool>>,
}

impl FeedFetcher {
    pub fn new(client: reqwest::Client, options: FetchOptions) -> Self {
        Self {
            client,
            options,
            cancel: None,
        }
    }

    /// Stop issuing new requests once `cancel` flips to `true`.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Fetch every source. The result holds exactly one [`Feed`] per source,
    /// in the order the sources were given.
    pub async fn fetch(&self, sources: &[FeedSource]) -> FetchReport {
        let workers = self.options.workers.max(1);
        info!(target: TARGET_WEB_REQUEST, "Fetching {} feeds with {} workers", sources.len(), workers);

        let feeds = stream::iter(sources)
            .map(|source| async move {
                match self.fetch_one(source).await {
                    Ok(feed) => {
                        debug!(target: TARGET_WEB_REQUEST, "Fetched {} items from {}", feed.items.len(), source.url);
                        feed
                    }
                    Err(err) => {
                        warn!(target: TARGET_WEB_REQUEST, "Failed to fetch feed {}: {}", source.url, err);
                        Feed::failed(&source.url, &err)
                    }
                }
            })
            .buffered(workers)
            .collect::<Vec<_>>()
            .await;

        FetchReport { feeds }
    }

    async fn fetch_one(&self, source: &FeedSource) -> Result<Feed, FetchError> {
        if !is_valid_url(&source.url) {
            return Err(FetchError::InvalidUrl(source.url.clone()));
        }

        let mut attempts = 0;
        loop {
            if self.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            match self.fetch_document(&source.url).await {
                Ok(feed) => return Ok(feed),
                // Retrying cannot fix a document we already received.
                Err(err @ FetchError::Parse(_)) | Err(err @ FetchError::Decode) => return Err(err),
                Err(err) if attempts >= self.options.retries => return Err(err),
                Err(err) => {
                    attempts += 1;
                    debug!(target: TARGET_WEB_REQUEST, "Retrying {} ({}/{}) after: {}", source.url, attempts, self.options.retries, err);
                    sleep(self.options.retry_delay).await;
                }
            }
        }
    }

    async fn fetch_document(&self, url: &str) -> Result<Feed, FetchError> {
        let text = fetch_with_fallback(&self.client, url, FEED_ACCEPT, self.options.request_timeout)
            .await?
            .into_text(url)?;

        parse_feed(&text, url)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, |rx| *rx.borrow())
    }
}
