use async_trait::async_trait;
use tokio::time::Duration;
use tracing::debug;
use url::Url;

use super::{DocumentIndex, IndexDocument};
use crate::error::IndexError;
use crate::TARGET_INDEX;

const DEFAULT_INDEX_NAME: &str = "news";
const INDEX_TIMEOUT: Duration = Duration::from_secs(30);

/// Elasticsearch-compatible document index reached over HTTP.
///
/// Documents are written with `PUT /{index}/_doc/{id}`, which creates or
/// replaces the document under that id.
pub struct HttpIndex {
    client: reqwest::Client,
    base: String,
    index: String,
}

impl HttpIndex {
    pub fn new(base: &str, index: &str) -> Result<Self, IndexError> {
        let client = reqwest::Client::builder()
            .timeout(INDEX_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            index: index.to_string(),
        })
    }

    /// `http://host:9200/articles` → base `http://host:9200`, index `articles`.
    pub fn from_url(url: &str) -> Result<Self, IndexError> {
        let parsed = Url::parse(url).map_err(|_| IndexError::InvalidUrl(url.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| IndexError::InvalidUrl(url.to_string()))?;

        let mut base = format!("{}://{}", parsed.scheme(), host);
        if let Some(port) = parsed.port() {
            base.push_str(&format!(":{}", port));
        }

        let index = parsed
            .path_segments()
            .and_then(|mut segments| segments.find(|s| !s.is_empty()))
            .unwrap_or(DEFAULT_INDEX_NAME)
            .to_string();

        Self::new(&base, &index)
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}/_doc/{}", self.base, self.index, id)
    }
}

#[async_trait]
impl DocumentIndex for HttpIndex {
    fn location(&self) -> String {
        format!("{}/{}", self.base, self.index)
    }

    async fn ping(&self) -> Result<(), IndexError> {
        let unreachable = |reason: String| IndexError::Unreachable {
            url: self.base.clone(),
            reason,
        };
        let response = self
            .client
            .get(&self.base)
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(unreachable(format!("HTTP {}", response.status())));
        }
        Ok(())
    }

    async fn upsert_document(&self, id: &str, document: &IndexDocument) -> Result<(), IndexError> {
        let url = self.document_url(id);
        debug!(target: TARGET_INDEX, "PUT {}", url);

        let response = self.client.put(&url).json(document).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(IndexError::Rejected {
            id: id.to_string(),
            status,
            body: body.chars().take(500).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_with_index() {
        let index = HttpIndex::from_url("http://localhost:9200/articles").unwrap();
        assert_eq!(index.location(), "http://localhost:9200/articles");
        assert_eq!(index.document_url("abc"), "http://localhost:9200/articles/_doc/abc");
    }

    #[test]
    fn test_from_url_defaults_index_name() {
        let index = HttpIndex::from_url("https://search.example.com/").unwrap();
        assert_eq!(index.location(), "https://search.example.com/news");
    }
}
