//! Group services - Gestione gruppi, richieste di ingresso e ruoli

use crate::core::{AppError, AppState, GroupContext};
use crate::dtos::{
    ActionsQuery, AllowedActionsDTO, CreateGroupDTO, GroupDTO, GroupMembersDTO, MemberAction,
    MemberActionDTO, MemberDTO, MutationResponse, PageQuery, Paginated,
};
use crate::entities::{GroupMembership, User};
use crate::repositories::Read;
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
};
use axum_macros::debug_handler;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Riga di membership con i dati dell'utente, per le risposte delle mutazioni
async fn member_view(state: &AppState, row: GroupMembership) -> Result<MemberDTO, AppError> {
    let user = state.user.read(&row.user_id).await?;
    Ok(MemberDTO::from_parts(row, user.as_ref()))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>, // ottenuto dall'autenticazione tramite token jwt
    Json(body): Json<CreateGroupDTO>,
) -> Result<Json<MutationResponse<GroupDTO>>, AppError> {
    debug!("Creating new group");
    // 1. Validare il body
    // 2. Creare il gruppo e la riga OWNER del creatore in un'unica transazione
    // 3. Ritornare il GroupDTO
    body.validate()?;

    let group = state.groups.create_group(current_user.user_id, &body).await?;

    info!("Group {} created", group.group_id);
    Ok(Json(MutationResponse::ok(GroupDTO::from(group), "Group created")))
}

#[instrument(skip(state, ctx), fields(group_id = %ctx.group.group_id))]
pub async fn list_group_members(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<GroupContext>, // ottenuto dal group_role_middleware
) -> Result<Json<GroupMembersDTO>, AppError> {
    debug!("Listing group members by role");
    let view = state.groups.members_by_role(ctx.group.group_id).await?;
    Ok(Json(view))
}

#[instrument(skip(state, current_user, ctx), fields(user_id = %current_user.user_id, group_id = %ctx.group.group_id))]
pub async fn request_join(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(ctx): Extension<GroupContext>,
) -> Result<Json<MutationResponse<MemberDTO>>, AppError> {
    debug!("Requesting to join group");
    let actor = ctx.actor(current_user.user_id);
    let row = state.groups.request_join(&actor, ctx.group.group_id).await?;
    let member = MemberDTO::from_parts(row, Some(&current_user));
    Ok(Json(MutationResponse::ok(member, "Join request sent")))
}

#[instrument(skip(state, current_user, ctx), fields(user_id = %current_user.user_id, group_id = %ctx.group.group_id))]
pub async fn cancel_join_request(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(ctx): Extension<GroupContext>,
) -> Result<Json<MutationResponse<()>>, AppError> {
    debug!("Cancelling own join request");
    let actor = ctx.actor(current_user.user_id);
    state
        .groups
        .cancel_join_request(&actor, ctx.group.group_id)
        .await?;
    Ok(Json(MutationResponse::empty("Join request cancelled")))
}

#[instrument(skip(state, current_user, ctx), fields(user_id = %current_user.user_id, group_id = %ctx.group.group_id))]
pub async fn list_join_requests(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(ctx): Extension<GroupContext>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<MemberDTO>>, AppError> {
    debug!("Listing pending join requests");
    let actor = ctx.actor(current_user.user_id);
    let page = state
        .groups
        .list_pending_join_requests(&actor, ctx.group.group_id, &query)
        .await?;
    info!("Found {} pending join requests", page.items.len());
    Ok(Json(page))
}

#[debug_handler]
#[instrument(skip(state, current_user, ctx, body), fields(group_id = %group_id, acting_user = %current_user.user_id, target_user = %user_id, action = ?body.action))]
pub async fn update_member(
    State(state): State<Arc<AppState>>,
    Path((group_id, user_id)): Path<(i64, i64)>,
    Extension(current_user): Extension<User>,
    Extension(ctx): Extension<GroupContext>, // ottenuto dal group_role_middleware
    Json(body): Json<MemberActionDTO>,
) -> Result<Json<MutationResponse<MemberDTO>>, AppError> {
    debug!("Applying membership action");
    // 1. Costruire l'attore con il ruolo risolto dal middleware
    // 2. accept_admin / decline_admin valgono solo sulla propria riga
    // 3. Tutte le altre azioni sono autorizzate dal motore tramite allowed_actions
    // 4. Ritornare la riga risultante (null se l'utente non è più nel gruppo)
    let actor = ctx.actor(current_user.user_id);

    let self_only = matches!(body.action, MemberAction::AcceptAdmin | MemberAction::DeclineAdmin);
    if self_only && user_id != current_user.user_id {
        warn!("Attempted to answer an administrator invitation of another user");
        return Err(AppError::forbidden(
            "You can only answer your own administrator invitation",
        ));
    }

    let (row, message) = match body.action {
        MemberAction::Accept => (
            Some(state.groups.accept_join(&actor, group_id, user_id).await?),
            "Join request accepted",
        ),
        MemberAction::Reject => {
            state.groups.reject_join(&actor, group_id, user_id).await?;
            (None, "Join request rejected")
        }
        MemberAction::InviteAdmin => (
            Some(state.groups.invite_admin(&actor, group_id, user_id).await?),
            "Administrator invitation sent",
        ),
        MemberAction::RemoveAdmin => (
            state.groups.remove_admin(&actor, group_id, user_id).await?,
            "Administrator removed",
        ),
        MemberAction::AcceptAdmin => (
            Some(state.groups.accept_admin(&actor, group_id).await?),
            "You are now an administrator",
        ),
        MemberAction::DeclineAdmin => (
            Some(state.groups.decline_admin(&actor, group_id).await?),
            "Administrator invitation declined",
        ),
        MemberAction::Remove => {
            state.groups.remove_member(&actor, group_id, user_id).await?;
            (None, "Member removed")
        }
    };

    info!("{}", message);
    let response = match row {
        Some(row) => MutationResponse::ok(member_view(&state, row).await?, message),
        None => MutationResponse::empty(message),
    };
    Ok(Json(response))
}

#[instrument(skip(state, current_user, ctx), fields(user_id = %current_user.user_id, group_id = %ctx.group.group_id))]
pub async fn leave_group(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(ctx): Extension<GroupContext>,
) -> Result<Json<MutationResponse<()>>, AppError> {
    debug!("Leaving group");
    let actor = ctx.actor(current_user.user_id);
    state.groups.leave_group(&actor, ctx.group.group_id).await?;
    Ok(Json(MutationResponse::empty("You left the group")))
}

#[instrument(skip(state, current_user, ctx), fields(user_id = %current_user.user_id, group_id = %ctx.group.group_id))]
pub async fn save_group(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(ctx): Extension<GroupContext>,
) -> Result<Json<MutationResponse<()>>, AppError> {
    let created = state
        .groups
        .save_group(current_user.user_id, ctx.group.group_id)
        .await?;
    let message = if created {
        "Group saved"
    } else {
        "Group was already saved"
    };
    Ok(Json(MutationResponse::empty(message)))
}

#[instrument(skip(state, current_user, ctx), fields(user_id = %current_user.user_id, group_id = %ctx.group.group_id))]
pub async fn unsave_group(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(ctx): Extension<GroupContext>,
) -> Result<Json<MutationResponse<()>>, AppError> {
    let removed = state
        .groups
        .unsave_group(current_user.user_id, ctx.group.group_id)
        .await?;
    let message = if removed {
        "Group removed from saved groups"
    } else {
        "Group was not saved"
    };
    Ok(Json(MutationResponse::empty(message)))
}

#[instrument(skip(state, current_user, ctx), fields(group_id = %group_id, user_id = %current_user.user_id, target_user = %target_id))]
pub async fn get_allowed_actions(
    State(state): State<Arc<AppState>>,
    Path((group_id, target_id)): Path<(i64, i64)>,
    Extension(current_user): Extension<User>,
    Extension(ctx): Extension<GroupContext>,
    Query(query): Query<ActionsQuery>,
) -> Result<Json<AllowedActionsDTO>, AppError> {
    debug!("Computing allowed actions for {:?}", query.section);
    let actor = ctx.actor(current_user.user_id);
    let actions = state
        .groups
        .allowed_actions_on(&actor, group_id, target_id, query.section)
        .await?;
    Ok(Json(actions))
}
