//! Server library - espone i moduli principali per i test

pub mod core;
pub mod dtos;
pub mod entities;
pub mod notifications;
pub mod relations;
pub mod repositories;
pub mod services;

// Re-export dei tipi principali per facilitare l'import
pub use core::{AppError, AppState, auth, config};
pub use services::root;

use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;

/// Crea il router principale dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .nest("/friend-requests", configure_friend_request_routes(state.clone()))
        .nest("/users", configure_user_routes(state.clone()))
        .nest("/groups", configure_group_routes(state.clone()))
        .merge(configure_page_routes(state.clone()))
        .merge(configure_notification_routes(state.clone()))
        .with_state(state)
}

/// Configura le routes per le richieste di amicizia
fn configure_friend_request_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_friend_requests).post(send_friend_request))
        .route("/sent", get(list_sent_requests))
        .route("/received", get(list_received_requests))
        .route(
            "/{request_id}",
            get(get_friend_request)
                .patch(update_friend_request)
                .delete(cancel_friend_request),
        )
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura le routes sugli altri utenti
fn configure_user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/{user_id}/mutual", get(get_mutual_connections))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura le routes per gruppi, membership e articoli
fn configure_group_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::{authentication_middleware, group_role_middleware};
    use services::*;

    // Rotte che NON richiedono un gruppo esistente (solo autenticazione)
    let public_routes = Router::new()
        .route("/", post(create_group))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authentication_middleware,
        ));

    // Rotte che richiedono il contesto di gruppo (autenticazione + group role middleware)
    let group_routes = Router::new()
        .route("/{group_id}/members", get(list_group_members))
        .route("/{group_id}/join", post(request_join).delete(cancel_join_request))
        .route("/{group_id}/join-requests", get(list_join_requests))
        .route("/{group_id}/members/{user_id}", patch(update_member))
        .route("/{group_id}/leave", post(leave_group))
        .route("/{group_id}/save", post(save_group).delete(unsave_group))
        .route("/{group_id}/actions/{user_id}", get(get_allowed_actions))
        .route("/{group_id}/articles", post(submit_article))
        .route("/{group_id}/articles/pending", get(list_pending_articles))
        .route("/{group_id}/articles/{article_id}", patch(moderate_article))
        .route("/{group_id}/feed", get(group_feed))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            group_role_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ));

    public_routes.merge(group_routes)
}

/// Configura le routes per pagine e ticket
fn configure_page_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/pages", post(create_page))
        .route("/pages/{page_id}", get(get_page))
        .route("/pages/{page_id}/tickets", post(create_ticket))
        .route("/tickets/{ticket_id}", delete(delete_ticket))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura lo stream delle notifiche
fn configure_notification_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/notifications", get(stream_notifications))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
