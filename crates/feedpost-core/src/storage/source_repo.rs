use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::retry::with_retry;
use super::{Database, SourceStore};
use crate::feed::{NewSource, Source};
use crate::{Error, Result};

/// Repository for source CRUD operations
#[derive(Clone)]
pub struct SourceRepository {
    db: Database,
}

#[derive(FromRow)]
struct SourceRow {
    id: i64,
    name: String,
    feed_url: String,
    priority: i64,
    insecure: i32,
    created_at: DateTime<Utc>,
}

impl From<SourceRow> for Source {
    fn from(row: SourceRow) -> Self {
        Source {
            id: row.id,
            name: row.name,
            feed_url: row.feed_url,
            priority: row.priority,
            insecure: row.insecure != 0,
            created_at: row.created_at,
        }
    }
}

impl SourceRepository {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Add a source, returning its ID
    pub async fn add(&self, new_source: &NewSource) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO sources (name, feed_url, priority, insecure, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new_source.name)
        .bind(&new_source.feed_url)
        .bind(new_source.priority)
        .bind(new_source.insecure as i32)
        .bind(Utc::now())
        .execute(self.db.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Find a source by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Source>> {
        let row: Option<SourceRow> = with_retry(|| {
            sqlx::query_as(
                r#"
                SELECT id, name, feed_url, priority, insecure, created_at
                FROM sources
                WHERE id = ?
                "#,
            )
            .bind(id)
            .fetch_optional(self.db.pool())
        })
        .await?;

        Ok(row.map(Source::from))
    }

    /// Find a source by feed URL
    pub async fn find_by_url(&self, url: &str) -> Result<Option<Source>> {
        let row: Option<SourceRow> = sqlx::query_as(
            r#"
            SELECT id, name, feed_url, priority, insecure, created_at
            FROM sources
            WHERE feed_url = ?
            "#,
        )
        .bind(url)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Source::from))
    }

    /// List all sources, highest priority first
    pub async fn list_all(&self) -> Result<Vec<Source>> {
        let rows: Vec<SourceRow> = with_retry(|| {
            sqlx::query_as(
                r#"
                SELECT id, name, feed_url, priority, insecure, created_at
                FROM sources
                ORDER BY priority DESC, id ASC
                "#,
            )
            .fetch_all(self.db.pool())
        })
        .await?;

        Ok(rows.into_iter().map(Source::from).collect())
    }

    /// Change the priority of a source
    pub async fn set_priority(&self, id: i64, priority: i64) -> Result<()> {
        let result = sqlx::query("UPDATE sources SET priority = ? WHERE id = ?")
            .bind(priority)
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::SourceNotFound(id));
        }
        Ok(())
    }

    /// Delete a source. Its articles are kept.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sources WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl SourceStore for SourceRepository {
    async fn list_sources(&self) -> Result<Vec<Source>> {
        self.list_all().await
    }

    async fn source_by_id(&self, id: i64) -> Result<Source> {
        self.find_by_id(id).await?.ok_or(Error::SourceNotFound(id))
    }
}
