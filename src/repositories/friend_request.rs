//! FriendRequestRepository - Repository per le richieste di amicizia

use super::{Delete, Read};
use crate::dtos::CreateFriendRequestDTO;
use crate::entities::{FriendRequest, FriendRequestStatus};
use chrono::{DateTime, Utc};
use sqlx::{Error, SqliteConnection, SqlitePool};

const COLUMNS: &str = "request_id, sender_id, receiver_id, status, message, created_at, accepted_at";

//FRIEND REQUEST REPOSITORY
#[derive(Clone)]
pub struct FriendRequestRepository {
    connection_pool: SqlitePool,
}

impl FriendRequestRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Read a request inside the caller's transaction
    pub async fn read_in(
        &self,
        conn: &mut SqliteConnection,
        request_id: i64,
    ) -> Result<Option<FriendRequest>, Error> {
        sqlx::query_as::<_, FriendRequest>(&format!(
            "SELECT {COLUMNS} FROM friend_requests WHERE request_id = ?"
        ))
        .bind(request_id)
        .fetch_optional(conn)
        .await
    }

    /// Pending request for the ordered pair (sender, receiver), if any
    pub async fn find_pending(
        &self,
        conn: &mut SqliteConnection,
        sender_id: i64,
        receiver_id: i64,
    ) -> Result<Option<FriendRequest>, Error> {
        sqlx::query_as::<_, FriendRequest>(&format!(
            "SELECT {COLUMNS} FROM friend_requests \
             WHERE sender_id = ? AND receiver_id = ? AND status = 'PENDING'"
        ))
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_optional(conn)
        .await
    }

    /// Insert a new PENDING request. A concurrent pending request on the same
    /// unordered pair fails with a unique violation.
    pub async fn insert_pending(
        &self,
        conn: &mut SqliteConnection,
        data: &CreateFriendRequestDTO,
        now: DateTime<Utc>,
    ) -> Result<FriendRequest, Error> {
        let status = FriendRequestStatus::Pending;

        let result = sqlx::query(
            r#"
            INSERT INTO friend_requests (sender_id, receiver_id, status, message, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(data.sender_id)
        .bind(data.receiver_id)
        .bind(status)
        .bind(&data.message)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(FriendRequest {
            request_id: result.last_insert_rowid(),
            sender_id: data.sender_id,
            receiver_id: data.receiver_id,
            status,
            message: data.message.clone(),
            created_at: now,
            accepted_at: None,
        })
    }

    /// Move a PENDING request to `status`; `accepted_at` is stamped only for APPROVED.
    /// Returns false when the request is no longer pending (or does not exist).
    pub async fn resolve_pending(
        &self,
        conn: &mut SqliteConnection,
        request_id: i64,
        status: FriendRequestStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, Error> {
        let accepted_at = (status == FriendRequestStatus::Approved).then_some(now);

        let result = sqlx::query(
            "UPDATE friend_requests SET status = ?, accepted_at = ? \
             WHERE request_id = ? AND status = 'PENDING'",
        )
        .bind(status)
        .bind(accepted_at)
        .bind(request_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Pending requests sent by `sender_id`, newest first
    pub async fn list_pending_by_sender(
        &self,
        sender_id: i64,
        limit: u32,
        offset: i64,
    ) -> Result<(Vec<FriendRequest>, i64), Error> {
        self.list_pending_by("sender_id", sender_id, limit, offset).await
    }

    /// Pending requests received by `receiver_id`, newest first
    pub async fn list_pending_by_receiver(
        &self,
        receiver_id: i64,
        limit: u32,
        offset: i64,
    ) -> Result<(Vec<FriendRequest>, i64), Error> {
        self.list_pending_by("receiver_id", receiver_id, limit, offset).await
    }

    // `column` è sempre una costante interna, mai input del client
    async fn list_pending_by(
        &self,
        column: &'static str,
        user_id: i64,
        limit: u32,
        offset: i64,
    ) -> Result<(Vec<FriendRequest>, i64), Error> {
        let items = sqlx::query_as::<_, FriendRequest>(&format!(
            "SELECT {COLUMNS} FROM friend_requests \
             WHERE {column} = ? AND status = 'PENDING' \
             ORDER BY created_at DESC, request_id DESC LIMIT ? OFFSET ?"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.connection_pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM friend_requests WHERE {column} = ? AND status = 'PENDING'"
        ))
        .bind(user_id)
        .fetch_one(&self.connection_pool)
        .await?;

        Ok((items, total))
    }

    /// Every request involving the user, any status, newest first
    pub async fn list_involving(
        &self,
        user_id: i64,
        limit: u32,
        offset: i64,
    ) -> Result<(Vec<FriendRequest>, i64), Error> {
        let items = sqlx::query_as::<_, FriendRequest>(&format!(
            "SELECT {COLUMNS} FROM friend_requests \
             WHERE sender_id = ? OR receiver_id = ? \
             ORDER BY created_at DESC, request_id DESC LIMIT ? OFFSET ?"
        ))
        .bind(user_id)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.connection_pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM friend_requests WHERE sender_id = ? OR receiver_id = ?",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_one(&self.connection_pool)
        .await?;

        Ok((items, total))
    }
}

impl Read<FriendRequest, i64> for FriendRequestRepository {
    async fn read(&self, id: &i64) -> Result<Option<FriendRequest>, Error> {
        sqlx::query_as::<_, FriendRequest>(&format!(
            "SELECT {COLUMNS} FROM friend_requests WHERE request_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl Delete<i64> for FriendRequestRepository {
    /// Only pending rows can be deleted: resolved requests are the audit trail
    async fn delete(&self, id: &i64) -> Result<bool, Error> {
        let result =
            sqlx::query("DELETE FROM friend_requests WHERE request_id = ? AND status = 'PENDING'")
                .bind(id)
                .execute(&self.connection_pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
