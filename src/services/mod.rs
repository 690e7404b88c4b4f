//! Services module - Coordinatore per tutti i service handler HTTP
//!
//! Questo modulo organizza i service handlers in sotto-moduli separati per una migliore manutenibilità.
//! Ogni modulo gestisce gli endpoint HTTP per una specifica funzionalità; la logica
//! di dominio vive nei manager di `relations`.

pub mod articles;
pub mod friend_requests;
pub mod groups;
pub mod notifications;
pub mod pages;

// Re-exports per facilitare l'import
pub use articles::{group_feed, list_pending_articles, moderate_article, submit_article};
pub use friend_requests::{
    cancel_friend_request, get_friend_request, get_mutual_connections, list_friend_requests,
    list_received_requests, list_sent_requests, send_friend_request, update_friend_request,
};
pub use groups::{
    cancel_join_request, create_group, get_allowed_actions, leave_group, list_group_members,
    list_join_requests, request_join, save_group, unsave_group, update_member,
};
pub use notifications::stream_notifications;
pub use pages::{create_page, create_ticket, delete_ticket, get_page};

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}
