//! MembershipRepository - Repository per le righe di membership (una per gruppo/utente)

use super::Read;
use crate::entities::{GroupMembership, MembershipKind, MembershipState};
use chrono::{DateTime, Utc};
use sqlx::{Error, SqliteConnection, SqlitePool};

const COLUMNS: &str = "group_id, user_id, kind, state, join_date";

#[derive(Clone)]
pub struct MembershipRepository {
    connection_pool: SqlitePool,
}

impl MembershipRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    pub async fn read_in(
        &self,
        conn: &mut SqliteConnection,
        group_id: i64,
        user_id: i64,
    ) -> Result<Option<GroupMembership>, Error> {
        sqlx::query_as::<_, GroupMembership>(&format!(
            "SELECT {COLUMNS} FROM group_memberships WHERE group_id = ? AND user_id = ?"
        ))
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await
    }

    /// Insert a fresh row. The (group_id, user_id) primary key rejects a second row.
    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        group_id: i64,
        user_id: i64,
        kind: MembershipKind,
        state: MembershipState,
        now: DateTime<Utc>,
    ) -> Result<GroupMembership, Error> {
        sqlx::query(
            "INSERT INTO group_memberships (group_id, user_id, kind, state, join_date) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(kind)
        .bind(state)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(GroupMembership {
            group_id,
            user_id,
            kind,
            state,
            join_date: now,
        })
    }

    /// Compare-and-set on the tagged row: moves `from` to `to` only if the row
    /// is still in `from`. Returns the updated row, or `None` when the row
    /// changed underneath (or never existed).
    pub async fn transition(
        &self,
        conn: &mut SqliteConnection,
        group_id: i64,
        user_id: i64,
        from: (MembershipKind, MembershipState),
        to: (MembershipKind, MembershipState),
        now: DateTime<Utc>,
    ) -> Result<Option<GroupMembership>, Error> {
        sqlx::query_as::<_, GroupMembership>(&format!(
            "UPDATE group_memberships SET kind = ?, state = ?, join_date = ? \
             WHERE group_id = ? AND user_id = ? AND kind = ? AND state = ? \
             RETURNING {COLUMNS}"
        ))
        .bind(to.0)
        .bind(to.1)
        .bind(now)
        .bind(group_id)
        .bind(user_id)
        .bind(from.0)
        .bind(from.1)
        .fetch_optional(conn)
        .await
    }

    /// Delete the row. Returns false when there was nothing to delete.
    pub async fn remove(
        &self,
        conn: &mut SqliteConnection,
        group_id: i64,
        user_id: i64,
    ) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM group_memberships WHERE group_id = ? AND user_id = ?")
            .bind(group_id)
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Every row of a group, owner first then by join date
    pub async fn find_many_by_group_id(&self, group_id: i64) -> Result<Vec<GroupMembership>, Error> {
        sqlx::query_as::<_, GroupMembership>(&format!(
            "SELECT {COLUMNS} FROM group_memberships WHERE group_id = ? \
             ORDER BY CASE kind WHEN 'OWNER' THEN 0 WHEN 'ADMIN' THEN 1 ELSE 2 END, join_date, user_id"
        ))
        .bind(group_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Rows of a given kind/state, newest first, with total count
    pub async fn list_by_kind_state(
        &self,
        group_id: i64,
        kind: MembershipKind,
        state: MembershipState,
        limit: u32,
        offset: i64,
    ) -> Result<(Vec<GroupMembership>, i64), Error> {
        let items = sqlx::query_as::<_, GroupMembership>(&format!(
            "SELECT {COLUMNS} FROM group_memberships \
             WHERE group_id = ? AND kind = ? AND state = ? \
             ORDER BY join_date DESC, user_id DESC LIMIT ? OFFSET ?"
        ))
        .bind(group_id)
        .bind(kind)
        .bind(state)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.connection_pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM group_memberships WHERE group_id = ? AND kind = ? AND state = ?",
        )
        .bind(group_id)
        .bind(kind)
        .bind(state)
        .fetch_one(&self.connection_pool)
        .await?;

        Ok((items, total))
    }

    /// Accepted administrators and owner of a group (notification fan-out)
    pub async fn moderator_ids(&self, group_id: i64) -> Result<Vec<i64>, Error> {
        sqlx::query_scalar(
            r#"
            SELECT user_id FROM group_memberships
            WHERE group_id = ? AND state = 'ACCEPTED' AND kind IN ('OWNER', 'ADMIN')
            ORDER BY user_id
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.connection_pool)
        .await
    }
}

impl Read<GroupMembership, (i64, i64)> for MembershipRepository {
    /// Key is (group_id, user_id)
    async fn read(&self, id: &(i64, i64)) -> Result<Option<GroupMembership>, Error> {
        sqlx::query_as::<_, GroupMembership>(&format!(
            "SELECT {COLUMNS} FROM group_memberships WHERE group_id = ? AND user_id = ?"
        ))
        .bind(id.0)
        .bind(id.1)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
