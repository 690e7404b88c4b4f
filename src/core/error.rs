use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

/// Tassonomia degli errori esposta al livello HTTP
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    DuplicateRequest,
    Forbidden,
    Unauthorized,
    InvalidTransition,
    ParentNotFound,
    Validation,
    StoreUnavailable,
    Internal,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: &'static str,
    kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    status: StatusCode,
    message: &'static str,
    details: Option<String>,
}

impl AppError {
    pub fn new(kind: ErrorKind, status: StatusCode, message: &'static str) -> Self {
        Self {
            kind,
            status,
            message,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    // Common error constructors
    pub fn not_found(message: &'static str) -> Self {
        Self::new(ErrorKind::NotFound, StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: &'static str) -> Self {
        Self::new(ErrorKind::Validation, StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: &'static str) -> Self {
        Self::new(ErrorKind::Unauthorized, StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: &'static str) -> Self {
        Self::new(ErrorKind::Forbidden, StatusCode::FORBIDDEN, message)
    }

    pub fn duplicate_request(message: &'static str) -> Self {
        Self::new(ErrorKind::DuplicateRequest, StatusCode::CONFLICT, message)
    }

    pub fn invalid_transition(message: &'static str) -> Self {
        Self::new(ErrorKind::InvalidTransition, StatusCode::CONFLICT, message)
    }

    pub fn parent_not_found(message: &'static str) -> Self {
        Self::new(ErrorKind::ParentNotFound, StatusCode::NOT_FOUND, message)
    }

    pub fn internal_server_error(message: &'static str) -> Self {
        Self::new(ErrorKind::Internal, StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn store_unavailable(message: &'static str) -> Self {
        Self::new(
            ErrorKind::StoreUnavailable,
            StatusCode::SERVICE_UNAVAILABLE,
            message,
        )
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{:?}: {} ({})", self.kind, self.message, details),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for AppError {}

/// SQLITE_BUSY (5) e SQLITE_LOCKED (6): la transazione può essere ritentata
fn is_lock_contention(err: &dyn sqlx::error::DatabaseError) -> bool {
    matches!(err.code().as_deref(), Some("5") | Some("6") | Some("517") | Some("262"))
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::not_found("Resource not found"),

            sqlx::Error::Database(ref db_err) if is_lock_contention(&**db_err) => {
                Self::store_unavailable("Database busy, retry the operation")
            }

            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Self::invalid_transition("Conflicting record already exists")
            }

            sqlx::Error::Database(db_err) => {
                Self::bad_request("Database error").with_details(db_err.message().to_string())
            }

            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::store_unavailable("Database unavailable")
            }

            _ => Self::internal_server_error("Internal server error"),
        }
    }
}

impl From<axum::Error> for AppError {
    fn from(err: axum::Error) -> Self {
        Self::internal_server_error("Internal server error").with_details(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::bad_request("Validation error").with_details(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(ErrorResponse {
            success: false,
            error: self.message,
            kind: self.kind,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_pool_timeout_is_store_unavailable() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_conflict_kinds_share_status_but_not_kind() {
        let dup = AppError::duplicate_request("dup");
        let transition = AppError::invalid_transition("transition");
        assert_eq!(dup.status(), transition.status());
        assert_ne!(dup.kind(), transition.kind());
    }

    #[test]
    fn test_display_includes_details() {
        let err = AppError::parent_not_found("Page not found").with_details("page 7");
        assert_eq!(err.to_string(), "ParentNotFound: Page not found (page 7)");
    }
}
