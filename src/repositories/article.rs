//! Article/Moderation repositories - Articoli di gruppo e relative voci di moderazione

use super::Read;
use crate::entities::{Article, ModerationEntry, ModerationState};
use chrono::{DateTime, Utc};
use sqlx::{Error, SqliteConnection, SqlitePool};

const ARTICLE_COLUMNS: &str = "a.article_id AS article_id, a.group_id AS group_id, a.author_id AS author_id, \
     a.title AS title, a.content AS content, a.created_at AS created_at";
const ENTRY_COLUMNS: &str = "article_id, group_id, state, reviewed_by, reviewed_at, created_at";

#[derive(Clone)]
pub struct ArticleRepository {
    connection_pool: SqlitePool,
}

impl ArticleRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        group_id: i64,
        author_id: i64,
        title: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Article, Error> {
        let result = sqlx::query(
            "INSERT INTO articles (group_id, author_id, title, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(group_id)
        .bind(author_id)
        .bind(title)
        .bind(content)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(Article {
            article_id: result.last_insert_rowid(),
            group_id,
            author_id,
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Articles of a group in the given moderation state, newest first
    pub async fn list_by_state(
        &self,
        group_id: i64,
        state: ModerationState,
        limit: u32,
        offset: i64,
    ) -> Result<(Vec<Article>, i64), Error> {
        let items = sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a \
             JOIN moderation_entries m ON m.article_id = a.article_id \
             WHERE a.group_id = ? AND m.state = ? \
             ORDER BY a.created_at DESC, a.article_id DESC LIMIT ? OFFSET ?"
        ))
        .bind(group_id)
        .bind(state)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.connection_pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM moderation_entries WHERE group_id = ? AND state = ?",
        )
        .bind(group_id)
        .bind(state)
        .fetch_one(&self.connection_pool)
        .await?;

        Ok((items, total))
    }
}

impl Read<Article, i64> for ArticleRepository {
    async fn read(&self, id: &i64) -> Result<Option<Article>, Error> {
        sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a WHERE a.article_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

#[derive(Clone)]
pub struct ModerationRepository {
    connection_pool: SqlitePool,
}

impl ModerationRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    pub async fn insert_pending(
        &self,
        conn: &mut SqliteConnection,
        article_id: i64,
        group_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ModerationEntry, Error> {
        let state = ModerationState::Pending;
        sqlx::query(
            "INSERT INTO moderation_entries (article_id, group_id, state, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(article_id)
        .bind(group_id)
        .bind(state)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(ModerationEntry {
            article_id,
            group_id,
            state,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
        })
    }

    /// One-way move out of PENDING. Returns `None` if the entry is not pending
    /// anymore (or does not exist), leaving it untouched.
    pub async fn decide(
        &self,
        article_id: i64,
        state: ModerationState,
        reviewer_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ModerationEntry>, Error> {
        sqlx::query_as::<_, ModerationEntry>(&format!(
            "UPDATE moderation_entries SET state = ?, reviewed_by = ?, reviewed_at = ? \
             WHERE article_id = ? AND state = 'PENDING' RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(state)
        .bind(reviewer_id)
        .bind(now)
        .bind(article_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Entries for a set of articles, in article_id order
    pub async fn read_for_articles(&self, article_ids: &[i64]) -> Result<Vec<ModerationEntry>, Error> {
        if article_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder: sqlx::QueryBuilder<sqlx::Sqlite> = sqlx::QueryBuilder::new(format!(
            "SELECT {ENTRY_COLUMNS} FROM moderation_entries WHERE article_id IN ("
        ));
        let mut separated = query_builder.separated(", ");
        for id in article_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY article_id");

        query_builder
            .build_query_as::<ModerationEntry>()
            .fetch_all(&self.connection_pool)
            .await
    }
}

impl Read<ModerationEntry, i64> for ModerationRepository {
    async fn read(&self, id: &i64) -> Result<Option<ModerationEntry>, Error> {
        sqlx::query_as::<_, ModerationEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM moderation_entries WHERE article_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
