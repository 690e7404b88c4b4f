//! Article services - Proposta, moderazione e feed degli articoli di gruppo

use crate::core::{AppError, AppState, GroupContext};
use crate::dtos::{
    ArticleDTO, CreateArticleDTO, ModerationDecisionDTO, MutationResponse, PageQuery, Paginated,
};
use crate::entities::User;
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use validator::Validate;

#[instrument(skip(state, current_user, ctx, body), fields(user_id = %current_user.user_id, group_id = %ctx.group.group_id))]
pub async fn submit_article(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(ctx): Extension<GroupContext>, // ottenuto dal group_role_middleware
    Json(body): Json<CreateArticleDTO>,
) -> Result<Json<MutationResponse<ArticleDTO>>, AppError> {
    debug!("Submitting article");
    // 1. Validare titolo e contenuto
    // 2. Il ruolo (almeno Member) lo verifica la pipeline
    // 3. L'articolo nasce PENDING e non compare nel feed finché non viene approvato
    body.validate()?;

    let actor = ctx.actor(current_user.user_id);
    let article = state
        .moderation
        .submit_article(&actor, ctx.group.group_id, &body)
        .await?;

    info!("Article {} waiting for approval", article.article_id);
    Ok(Json(MutationResponse::ok(
        article,
        "Article submitted for approval",
    )))
}

#[instrument(skip(state, current_user, ctx), fields(user_id = %current_user.user_id, group_id = %ctx.group.group_id))]
pub async fn list_pending_articles(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Extension(ctx): Extension<GroupContext>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<ArticleDTO>>, AppError> {
    debug!("Listing moderation queue");
    let actor = ctx.actor(current_user.user_id);
    let page = state
        .moderation
        .list_pending(&actor, ctx.group.group_id, &query)
        .await?;
    Ok(Json(page))
}

#[instrument(skip(state, current_user, ctx, body), fields(group_id = %group_id, article_id = %article_id, reviewer = %current_user.user_id, decision = ?body.state))]
pub async fn moderate_article(
    State(state): State<Arc<AppState>>,
    Path((group_id, article_id)): Path<(i64, i64)>,
    Extension(current_user): Extension<User>,
    Extension(ctx): Extension<GroupContext>,
    Json(body): Json<ModerationDecisionDTO>,
) -> Result<Json<MutationResponse<ArticleDTO>>, AppError> {
    debug!("Moderating article");
    let actor = ctx.actor(current_user.user_id);
    let article = state
        .moderation
        .decide(&actor, group_id, article_id, body.state)
        .await?;

    info!("Article moderated as {:?}", article.state);
    Ok(Json(MutationResponse::ok(article, "Article moderated")))
}

#[instrument(skip(state, ctx), fields(group_id = %ctx.group.group_id))]
pub async fn group_feed(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<GroupContext>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<ArticleDTO>>, AppError> {
    debug!("Reading group feed");
    let page = state
        .moderation
        .group_feed(ctx.group.group_id, &query)
        .await?;
    Ok(Json(page))
}
