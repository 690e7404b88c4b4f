//! GroupRepository - Repository per i gruppi

use super::Read;
use crate::entities::Group;
use chrono::{DateTime, Utc};
use sqlx::{Error, SqliteConnection, SqlitePool};

#[derive(Clone)]
pub struct GroupRepository {
    connection_pool: SqlitePool,
}

impl GroupRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Insert the group row; the caller adds the OWNER membership in the same transaction
    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        name: &str,
        description: Option<&str>,
        creator_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Group, Error> {
        let result = sqlx::query(
            "INSERT INTO social_groups (name, description, creator_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(description)
        .bind(creator_id)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(Group {
            group_id: result.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
            creator_id,
            created_at: now,
        })
    }

    pub async fn read_in(
        &self,
        conn: &mut SqliteConnection,
        group_id: i64,
    ) -> Result<Option<Group>, Error> {
        sqlx::query_as::<_, Group>(
            "SELECT group_id, name, description, creator_id, created_at FROM social_groups WHERE group_id = ?",
        )
        .bind(group_id)
        .fetch_optional(conn)
        .await
    }
}

impl Read<Group, i64> for GroupRepository {
    async fn read(&self, id: &i64) -> Result<Option<Group>, Error> {
        sqlx::query_as::<_, Group>(
            "SELECT group_id, name, description, creator_id, created_at FROM social_groups WHERE group_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
