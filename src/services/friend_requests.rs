//! Friend request services - Endpoint per richieste di amicizia e connessioni in comune

use crate::core::{AppError, AppState};
use crate::dtos::{
    EnrichedFriendRequestDTO, MutationResponse, MutualConnectionsDTO, PageQuery, Paginated,
    SendFriendRequestDTO, UpdateFriendRequestDTO,
};
use crate::entities::{FriendRequest, User};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
};
use axum_macros::debug_handler;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use validator::Validate;

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, receiver_id = %body.receiver_id))]
pub async fn send_friend_request(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>, // ottenuto dall'autenticazione tramite token jwt
    Json(body): Json<SendFriendRequestDTO>,
) -> Result<Json<MutationResponse<FriendRequest>>, AppError> {
    debug!("Sending friend request");
    // 1. Validare il body (lunghezza del messaggio)
    // 2. Delegare al manager: esistenza destinatario, amicizia già presente, match reciproco, duplicato
    // 3. Se c'era la richiesta opposta la risposta contiene quella, ora APPROVED
    // 4. Ritornare la richiesta nella busta di mutazione
    body.validate()?;

    let outcome = state
        .friends
        .send_request(current_user.user_id, body.receiver_id, body.message)
        .await?;

    let message = if outcome.matched {
        "You are now friends"
    } else {
        "Friend request sent"
    };

    info!(matched = outcome.matched, "Friend request handled");
    Ok(Json(MutationResponse::ok(outcome.request, message)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_friend_requests(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<FriendRequest>>, AppError> {
    debug!("Listing every friend request of the user");
    let page = state.friends.list_all(current_user.user_id, &query).await?;
    Ok(Json(page))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_sent_requests(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<EnrichedFriendRequestDTO>>, AppError> {
    debug!("Listing pending requests sent by the user");
    // 1. Richieste PENDING inviate, dalla più recente
    // 2. Ognuna arricchita con i dati della controparte e le connessioni in comune
    let page = state.friends.list_sent(current_user.user_id, &query).await?;
    info!("Found {} sent requests", page.items.len());
    Ok(Json(page))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_received_requests(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<EnrichedFriendRequestDTO>>, AppError> {
    debug!("Listing pending requests received by the user");
    let page = state
        .friends
        .list_received(current_user.user_id, &query)
        .await?;
    info!("Found {} received requests", page.items.len());
    Ok(Json(page))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, request_id = %request_id))]
pub async fn get_friend_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<i64>,
    Extension(current_user): Extension<User>,
) -> Result<Json<FriendRequest>, AppError> {
    debug!("Reading friend request");
    let request = state.friends.get(current_user.user_id, request_id).await?;
    Ok(Json(request))
}

#[debug_handler]
#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, request_id = %request_id))]
pub async fn update_friend_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<i64>,
    Extension(current_user): Extension<User>,
    Json(body): Json<UpdateFriendRequestDTO>,
) -> Result<Json<MutationResponse<FriendRequest>>, AppError> {
    debug!("Responding to friend request with {:?}", body.status);
    // 1. Solo il destinatario può rispondere
    // 2. APPROVED aggiunge i due utenti alle rispettive liste amici nella stessa transazione
    // 3. Ripetere lo stesso esito è un no-op, cambiare esito è vietato
    let request = state
        .friends
        .resolve(current_user.user_id, request_id, body.status)
        .await?;

    info!("Friend request is now {:?}", request.status);
    Ok(Json(MutationResponse::ok(request, "Friend request updated")))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, request_id = %request_id))]
pub async fn cancel_friend_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<i64>,
    Extension(current_user): Extension<User>,
) -> Result<Json<MutationResponse<()>>, AppError> {
    debug!("Cancelling friend request");
    state.friends.cancel(current_user.user_id, request_id).await?;
    Ok(Json(MutationResponse::empty("Friend request cancelled")))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, other_id = %other_id))]
pub async fn get_mutual_connections(
    State(state): State<Arc<AppState>>,
    Path(other_id): Path<i64>,
    Extension(current_user): Extension<User>,
) -> Result<Json<MutualConnectionsDTO>, AppError> {
    debug!("Computing mutual connections");
    let mutual = state
        .friends
        .mutual_with(current_user.user_id, other_id)
        .await?;
    Ok(Json(mutual))
}
