//! Writing scraped articles to a search index.
//!
//! Only the document-write contract is used: `upsert_document(id, fields)`.
//! The id is derived from the article's link, so scraping the same link again
//! replaces the earlier document. That is the only deduplication the
//! pipeline performs.

mod http;
mod memory;
mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;
use urlnorm::UrlNormalizer;

pub use self::http::HttpIndex;
pub use self::memory::MemoryIndex;
pub use self::sqlite::SqliteIndex;

use crate::error::IndexError;
use crate::scraper::Article;
use crate::TARGET_INDEX;

/// Fields stored for every article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexDocument {
    pub title: String,
    pub body: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub extracted_at: DateTime<Utc>,
}

impl From<&Article> for IndexDocument {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            body: article.body.clone(),
            link: article.source_link.clone(),
            published_at: article.published_at,
            extracted_at: article.extracted_at,
        }
    }
}

#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Human readable location, for logs.
    fn location(&self) -> String;

    /// Check that the index can be reached at all.
    async fn ping(&self) -> Result<(), IndexError>;

    /// Insert or replace the document stored under `id`.
    async fn upsert_document(&self, id: &str, document: &IndexDocument) -> Result<(), IndexError>;
}

/// Deterministic document id for a link: hex SHA-256 of its normalized form.
///
/// Normalization ignores scheme, `www.`, fragments and tracking parameters, so
/// trivially different spellings of one link share an id.
pub fn document_id(link: &str) -> String {
    let link = link.trim();
    let key = match Url::parse(link) {
        Ok(parsed) => UrlNormalizer::default().compute_normalization_string(&parsed),
        Err(_) => link.to_string(),
    };

    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Open the index named by `url`.
///
/// * `http://` or `https://`: an Elasticsearch-compatible HTTP index; the
///   first path segment names the index (default `news`).
/// * `sqlite:`: a local SQLite document table.
/// * `memory:`: a process-local index.
pub async fn connect(url: &str) -> Result<Arc<dyn DocumentIndex>, IndexError> {
    if url == "memory:" {
        return Ok(Arc::new(MemoryIndex::new()));
    }
    if url.starts_with("sqlite:") {
        return Ok(Arc::new(SqliteIndex::connect(url).await?));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(Arc::new(HttpIndex::from_url(url)?));
    }
    Err(IndexError::InvalidUrl(url.to_string()))
}

/// Writes articles to a [`DocumentIndex`] under their link-derived id.
#[derive(Clone)]
pub struct IndexWriter {
    index: Arc<dyn DocumentIndex>,
}

impl IndexWriter {
    pub fn new(index: Arc<dyn DocumentIndex>) -> Self {
        Self { index }
    }

    pub fn location(&self) -> String {
        self.index.location()
    }

    pub async fn ping(&self) -> Result<(), IndexError> {
        self.index.ping().await?;
        info!(target: TARGET_INDEX, "Index reachable at {}", self.index.location());
        Ok(())
    }

    /// Upsert `article`, returning the document id it was stored under.
    pub async fn write(&self, article: &Article) -> Result<String, IndexError> {
        let id = document_id(&article.source_link);
        self.index
            .upsert_document(&id, &IndexDocument::from(article))
            .await?;
        debug!(target: TARGET_INDEX, "Indexed {} as {}", article.source_link, id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(link: &str, body: &str) -> Article {
        Article {
            source_link: link.to_string(),
            title: "Title".to_string(),
            body: body.to_string(),
            published_at: None,
            extracted_at: Utc::now(),
            canonical_url: None,
            description: None,
        }
    }

    #[test]
    fn test_document_id_is_stable_hex() {
        let id = document_id("https://example.com/news/story-1");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, document_id("https://example.com/news/story-1"));
    }

    #[test]
    fn test_document_id_distinguishes_links() {
        assert_ne!(
            document_id("https://example.com/news/story-1"),
            document_id("https://example.com/news/story-2")
        );
    }

    #[test]
    fn test_document_id_ignores_surrounding_whitespace() {
        assert_eq!(
            document_id("  https://example.com/news/story-1\n"),
            document_id("https://example.com/news/story-1")
        );
    }

    #[tokio::test]
    async fn test_rewrite_overwrites_same_document() {
        let index = Arc::new(MemoryIndex::new());
        let writer = IndexWriter::new(index.clone());

        let first = writer.write(&article("https://example.com/a", "old body")).await.unwrap();
        let second = writer.write(&article("https://example.com/a", "new body")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(index.len().await, 1);
        assert_eq!(index.get(&first).await.unwrap().body, "new body");
    }

    #[tokio::test]
    async fn test_connect_rejects_unknown_scheme() {
        assert!(matches!(
            connect("ftp://example.com").await,
            Err(IndexError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_memory() {
        let index = connect("memory:").await.unwrap();
        assert!(index.ping().await.is_ok());
        assert_eq!(index.location(), "memory:");
    }
}
