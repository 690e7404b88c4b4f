//! Notification services - Stream SSE delle notifiche dell'utente autenticato

use crate::core::AppState;
use crate::entities::User;
use axum::{
    Extension,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use std::sync::Arc;
use tracing::{info, instrument};

/// Ogni notifica arriva come evento `notification` con il JSON di [`crate::notifications::Notification`].
/// L'utente resta online finché la connessione è aperta.
#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn stream_notifications(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    info!("Opening notification stream");
    let (session, rx) = state.users_online.connect(current_user.user_id);

    // la sessione viaggia con lo stream: chiusa la connessione, viene droppata
    let events = stream::unfold((rx, session), |(mut rx, session)| async move {
        let notification = rx.recv().await?;
        let event = Event::default().event("notification").json_data(&notification);
        Some((event, (rx, session)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
