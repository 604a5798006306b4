use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, Row, Sqlite,
};
use std::str::FromStr;
use tokio::time::Duration;
use tracing::{info, instrument};

use super::{DocumentIndex, IndexDocument};
use crate::error::IndexError;
use crate::TARGET_INDEX;

/// Document table in a local SQLite database.
#[derive(Clone)]
pub struct SqliteIndex {
    pool: Pool<Sqlite>,
    url: String,
}

impl SqliteIndex {
    #[instrument(target = "index", level = "info")]
    pub async fn connect(url: &str) -> Result<Self, IndexError> {
        info!(target: TARGET_INDEX, "Opening SQLite index: {}", url);

        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        // Every connection to `:memory:` is its own database.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        let index = Self {
            pool,
            url: url.to_string(),
        };
        index.initialize_schema().await?;
        Ok(index)
    }

    async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                link TEXT NOT NULL,
                published_at TEXT,
                extracted_at TEXT NOT NULL,
                revision INTEGER NOT NULL DEFAULT 1
            );
            CREATE INDEX IF NOT EXISTS idx_documents_published_at ON documents (published_at);
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, IndexError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Fetch a stored document together with how many times it was written.
    pub async fn get(&self, id: &str) -> Result<Option<(IndexDocument, i64)>, IndexError> {
        let row = sqlx::query(
            "SELECT title, body, link, published_at, extracted_at, revision FROM documents WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let published_at: Option<String> = row.try_get("published_at")?;
        let extracted_at: String = row.try_get("extracted_at")?;
        let document = IndexDocument {
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            link: row.try_get("link")?,
            published_at: published_at.as_deref().and_then(parse_timestamp),
            extracted_at: parse_timestamp(&extracted_at).unwrap_or_default(),
        };
        Ok(Some((document, row.try_get("revision")?)))
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl DocumentIndex for SqliteIndex {
    fn location(&self) -> String {
        self.url.clone()
    }

    async fn ping(&self) -> Result<(), IndexError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert_document(&self, id: &str, document: &IndexDocument) -> Result<(), IndexError> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, title, body, link, published_at, extracted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                body = excluded.body,
                link = excluded.link,
                published_at = excluded.published_at,
                extracted_at = excluded.extracted_at,
                revision = documents.revision + 1
            "#,
        )
        .bind(id)
        .bind(&document.title)
        .bind(&document.body)
        .bind(&document.link)
        .bind(document.published_at.map(|d| d.to_rfc3339()))
        .bind(document.extracted_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
