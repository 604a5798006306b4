//! Error taxonomy for the fetch and scrape pipelines.
//!
//! `ConfigError` and `StorageError` are fatal to a run. `FetchError` and
//! `IndexError` are recorded per feed or per article and only summarized.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input path {0} does not exist")]
    MissingInput(PathBuf),

    #[error("unknown timezone identifier '{0}'")]
    Timezone(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Failure of a single feed or article fetch. Never fatal to a batch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url '{0}'")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to decode response body")]
    Decode,

    #[error("failed to parse feed: {0}")]
    Parse(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("extracted body too short ({len} < {min} characters)")]
    TooShort { len: usize, min: usize },

    #[error("cancelled before the request was issued")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize day bucket {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to persist day bucket {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("unsupported index url '{0}'")]
    InvalidUrl(String),

    #[error("index unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("index rejected document {id}: HTTP {status}: {body}")]
    Rejected {
        id: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("index request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("index database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Fatal conditions of a scrape run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to load feed items: {0}")]
    Load(#[from] StorageError),

    #[error(transparent)]
    Index(#[from] IndexError),
}
