use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::retry::with_retry;
use super::{ArticleStore, Database};
use crate::feed::{Article, NewArticle};
use crate::Result;

/// Repository for article operations.
///
/// Articles are unique by `link`; re-inserting a known link is a no-op and
/// never touches its posted state.
#[derive(Clone)]
pub struct ArticleRepository {
    db: Database,
}

#[derive(FromRow)]
struct ArticleRow {
    id: i64,
    source_id: i64,
    title: String,
    link: String,
    summary: String,
    categories: String,
    published_at: DateTime<Utc>,
    posted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.id,
            source_id: row.source_id,
            title: row.title,
            link: row.link,
            summary: row.summary,
            categories: serde_json::from_str(&row.categories).unwrap_or_default(),
            published_at: row.published_at,
            posted_at: row.posted_at,
            created_at: row.created_at,
        }
    }
}

impl ArticleRepository {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Insert an article unless its link is already known.
    /// Returns true if a new row was created.
    pub async fn insert(&self, article: &NewArticle) -> Result<bool> {
        let categories = serde_json::to_string(&article.categories)?;
        let now = Utc::now();

        let result = with_retry(|| {
            sqlx::query(
                r#"
                INSERT INTO articles
                    (source_id, title, link, summary, categories, published_at, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(link) DO NOTHING
                "#,
            )
            .bind(article.source_id)
            .bind(&article.title)
            .bind(&article.link)
            .bind(&article.summary)
            .bind(&categories)
            .bind(article.published_at)
            .bind(now)
            .execute(self.db.pool())
        })
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Find an article by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Article>> {
        let row: Option<ArticleRow> = sqlx::query_as(
            r#"
            SELECT id, source_id, title, link, summary, categories,
                   published_at, posted_at, created_at
            FROM articles
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Article::from))
    }

    /// Unposted articles fetched at or after `since`, oldest publication first
    pub async fn list_unposted_since(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Article>> {
        let rows: Vec<ArticleRow> = with_retry(|| {
            sqlx::query_as(
                r#"
                SELECT id, source_id, title, link, summary, categories,
                       published_at, posted_at, created_at
                FROM articles
                WHERE posted_at IS NULL AND created_at >= ?
                ORDER BY published_at ASC, id ASC
                LIMIT ?
                "#,
            )
            .bind(since)
            .bind(limit)
            .fetch_all(self.db.pool())
        })
        .await?;

        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// Set `posted_at` once; later calls leave the first timestamp in place
    pub async fn set_posted(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        with_retry(|| {
            sqlx::query(
                r#"
                UPDATE articles
                SET posted_at = ?
                WHERE id = ? AND posted_at IS NULL
                "#,
            )
            .bind(at)
            .bind(id)
            .execute(self.db.pool())
        })
        .await?;

        Ok(())
    }

    /// Count all stored articles
    pub async fn count(&self) -> Result<u32> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0 as u32)
    }
}

#[async_trait::async_trait]
impl ArticleStore for ArticleRepository {
    async fn store(&self, article: &NewArticle) -> Result<bool> {
        self.insert(article).await
    }

    async fn list_unposted(&self, since: DateTime<Utc>, limit: u32) -> Result<Vec<Article>> {
        self.list_unposted_since(since, limit).await
    }

    async fn mark_posted(&self, article: &Article) -> Result<()> {
        self.set_posted(article.id, Utc::now()).await
    }
}
