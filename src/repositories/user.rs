//! UserRepository - Repository per utenti, amicizie e gruppi salvati

use super::{Read, ReadMany};
use crate::entities::User;
use chrono::{DateTime, Utc};
use sqlx::{Error, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

// USER REPO
#[derive(Clone)]
pub struct UserRepository {
    connection_pool: SqlitePool,
}

impl UserRepository {
    pub fn new(connection_pool: SqlitePool) -> UserRepository {
        Self { connection_pool }
    }

    /// Check whether a user row exists, inside the caller's transaction
    pub async fn exists(&self, conn: &mut SqliteConnection, user_id: i64) -> Result<bool, Error> {
        let found: Option<i64> = sqlx::query_scalar("SELECT user_id FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
        Ok(found.is_some())
    }

    /// Friend ids of a user, ordered
    pub async fn friend_ids(&self, user_id: i64) -> Result<Vec<i64>, Error> {
        sqlx::query_scalar(
            "SELECT friend_id FROM friendships WHERE user_id = ? ORDER BY friend_id",
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    pub async fn are_friends(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        other_id: i64,
    ) -> Result<bool, Error> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT user_id FROM friendships WHERE user_id = ? AND friend_id = ?",
        )
        .bind(user_id)
        .bind(other_id)
        .fetch_optional(conn)
        .await?;
        Ok(found.is_some())
    }

    /// Union of both friend sets: each side gains the other at most once.
    /// Returns the number of rows actually inserted (0 when already friends).
    pub async fn add_friendship(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        other_id: i64,
        now: DateTime<Utc>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO friendships (user_id, friend_id, created_at)
            VALUES (?, ?, ?), (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(other_id)
        .bind(now)
        .bind(other_id)
        .bind(user_id)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Ids of the groups the user created
    pub async fn created_group_ids(&self, user_id: i64) -> Result<Vec<i64>, Error> {
        sqlx::query_scalar(
            "SELECT group_id FROM social_groups WHERE creator_id = ? ORDER BY group_id",
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Ids of the groups the user bookmarked
    pub async fn saved_group_ids(&self, user_id: i64) -> Result<Vec<i64>, Error> {
        sqlx::query_scalar("SELECT group_id FROM group_saves WHERE user_id = ? ORDER BY group_id")
            .bind(user_id)
            .fetch_all(&self.connection_pool)
            .await
    }

    pub async fn save_group(
        &self,
        user_id: i64,
        group_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO group_saves (user_id, group_id, saved_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(group_id)
        .bind(now)
        .execute(&self.connection_pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn unsave_group(&self, user_id: i64, group_id: i64) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM group_saves WHERE user_id = ? AND group_id = ?")
            .bind(user_id)
            .bind(group_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl Read<User, i64> for UserRepository {
    async fn read(&self, id: &i64) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            "SELECT user_id, username, display_name FROM users WHERE user_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl ReadMany<User, i64> for UserRepository {
    async fn read_many(&self, ids: &[i64]) -> Result<Vec<User>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT user_id, username, display_name FROM users WHERE user_id IN (");
        let mut separated = query_builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY user_id");

        query_builder
            .build_query_as::<User>()
            .fetch_all(&self.connection_pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("users")))]
    async fn test_add_friendship_is_idempotent(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = UserRepository::new(pool.clone());
        let now = Utc::now();

        let mut conn = pool.acquire().await?;
        assert_eq!(repo.add_friendship(&mut conn, 1, 2, now).await?, 2);
        assert_eq!(repo.add_friendship(&mut conn, 2, 1, now).await?, 0);
        drop(conn);

        assert_eq!(repo.friend_ids(1).await?, vec![2]);
        assert_eq!(repo.friend_ids(2).await?, vec![1]);
        Ok(())
    }

    #[sqlx::test(migrations = "./migrations", fixtures(path = "../../fixtures", scripts("users")))]
    async fn test_read_many_skips_missing_ids(pool: SqlitePool) -> sqlx::Result<()> {
        let repo = UserRepository::new(pool);
        let users = repo.read_many(&[3, 999, 1]).await?;
        let ids: Vec<i64> = users.iter().map(|u| u.user_id).collect();
        assert_eq!(ids, vec![1, 3]);
        Ok(())
    }
}
