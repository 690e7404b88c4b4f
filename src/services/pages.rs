//! Page services - Pagine e ticket collegati

use crate::core::{AppError, AppState};
use crate::dtos::{CreatePageDTO, CreateTicketDTO, MutationResponse, PageDTO};
use crate::entities::{Page, Ticket, User};
use axum::{
    Extension,
    extract::{Json, Path, State},
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use validator::Validate;

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_page(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<CreatePageDTO>,
) -> Result<Json<MutationResponse<Page>>, AppError> {
    debug!("Creating page");
    body.validate()?;
    let page = state.links.create_page(current_user.user_id, &body).await?;
    Ok(Json(MutationResponse::ok(page, "Page created")))
}

#[instrument(skip(state), fields(page_id = %page_id))]
pub async fn get_page(
    State(state): State<Arc<AppState>>,
    Path(page_id): Path<i64>,
) -> Result<Json<PageDTO>, AppError> {
    debug!("Reading page with its live tickets");
    let page = state.links.get_page(page_id).await?;
    Ok(Json(page))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, page_id = %page_id))]
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Path(page_id): Path<i64>,
    Extension(current_user): Extension<User>,
    Json(body): Json<CreateTicketDTO>,
) -> Result<Json<MutationResponse<Ticket>>, AppError> {
    debug!("Creating ticket");
    // 1. Validare nome e prezzo
    // 2. Solo il proprietario della pagina può aggiungere ticket
    // 3. Insert del ticket e push in list_ticket nella stessa transazione
    body.validate()?;

    let ticket = state
        .links
        .create_ticket(current_user.user_id, page_id, &body)
        .await?;

    info!("Ticket {} created", ticket.ticket_id);
    Ok(Json(MutationResponse::ok(ticket, "Ticket created")))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id, ticket_id = %ticket_id))]
pub async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<i64>,
    Extension(current_user): Extension<User>,
) -> Result<Json<MutationResponse<()>>, AppError> {
    debug!("Deleting ticket");
    // 1. Solo il proprietario della pagina può cancellare
    // 2. Soft delete del ticket e pull da list_ticket nella stessa transazione
    state
        .links
        .delete_ticket(current_user.user_id, ticket_id)
        .await?;
    Ok(Json(MutationResponse::empty("Ticket deleted")))
}
