//! ContentModerationPipeline - Articoli di gruppo visibili solo dopo approvazione

use super::begin_write;
use super::roles::{Actor, Role};
use crate::core::AppError;
use crate::dtos::{ArticleDTO, CreateArticleDTO, PageQuery, Paginated};
use crate::entities::{Article, ModerationEntry, ModerationState};
use crate::notifications::{NotificationContext, NotificationDispatch, dispatch};
use crate::repositories::{
    ArticleRepository, GroupRepository, MembershipRepository, ModerationRepository, Read,
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Clone)]
pub struct ContentModerationPipeline {
    pool: SqlitePool,
    articles: ArticleRepository,
    moderation: ModerationRepository,
    memberships: MembershipRepository,
    groups: GroupRepository,
    notifier: Arc<dyn NotificationDispatch>,
}

impl ContentModerationPipeline {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn NotificationDispatch>) -> Self {
        Self {
            articles: ArticleRepository::new(pool.clone()),
            moderation: ModerationRepository::new(pool.clone()),
            memberships: MembershipRepository::new(pool.clone()),
            groups: GroupRepository::new(pool.clone()),
            pool,
            notifier,
        }
    }

    /// Un membro (o più) del gruppo propone un articolo: parte PENDING
    #[instrument(skip(self, actor, data), fields(actor_id = actor.user_id))]
    pub async fn submit_article(
        &self,
        actor: &Actor,
        group_id: i64,
        data: &CreateArticleDTO,
    ) -> Result<ArticleDTO, AppError> {
        debug!("Submitting article");
        // 1. Verificare che l'autore sia almeno Member nel gruppo
        // 2. Inserire articolo e voce di moderazione PENDING nella stessa transazione
        // 3. Notificare owner e amministratori dopo il commit
        if actor.role < Role::Member {
            warn!("Guest attempted to submit an article");
            return Err(AppError::forbidden("Only group members can submit articles"));
        }

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;
        let article = self
            .articles
            .insert(&mut tx, group_id, actor.user_id, &data.title, &data.content, now)
            .await?;
        let entry = self
            .moderation
            .insert_pending(&mut tx, article.article_id, group_id, now)
            .await?;
        tx.commit().await?;

        let article_id = article.article_id;
        for moderator_id in self.memberships.moderator_ids(group_id).await? {
            dispatch(
                self.notifier.as_ref(),
                actor.user_id,
                moderator_id,
                "A new article is waiting for approval",
                NotificationContext::ArticleSubmitted {
                    group_id,
                    article_id,
                },
            );
        }

        info!("Article {} submitted for moderation", article_id);
        Ok(ArticleDTO::from_parts(article, entry))
    }

    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn approve(
        &self,
        actor: &Actor,
        group_id: i64,
        article_id: i64,
    ) -> Result<ArticleDTO, AppError> {
        self.decide(actor, group_id, article_id, ModerationState::Approved)
            .await
    }

    /// L'articolo rifiutato resta salvato, semplicemente non compare nel feed
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn reject(
        &self,
        actor: &Actor,
        group_id: i64,
        article_id: i64,
    ) -> Result<ArticleDTO, AppError> {
        self.decide(actor, group_id, article_id, ModerationState::Rejected)
            .await
    }

    /// PENDING -> APPROVED | REJECTED, una volta sola
    pub async fn decide(
        &self,
        actor: &Actor,
        group_id: i64,
        article_id: i64,
        state: ModerationState,
    ) -> Result<ArticleDTO, AppError> {
        debug!("Moderating article as {:?}", state);
        if !actor.role.is_moderator() {
            warn!("Role {:?} cannot moderate articles", actor.role);
            return Err(AppError::forbidden(
                "Only the owner or an administrator can moderate articles",
            ));
        }

        if state == ModerationState::Pending {
            return Err(AppError::invalid_transition(
                "An article cannot be moved back to pending",
            ));
        }

        let entry = self
            .moderation
            .read(&article_id)
            .await?
            .filter(|e| e.group_id == group_id)
            .ok_or_else(|| {
                warn!("Article {} not found in group {}", article_id, group_id);
                AppError::not_found("Article not found")
            })?;

        if entry.state != ModerationState::Pending {
            warn!("Article already moderated as {:?}", entry.state);
            return Err(AppError::invalid_transition("Article has already been moderated"));
        }

        let entry = self
            .moderation
            .decide(article_id, state, actor.user_id, Utc::now())
            .await?
            .ok_or_else(|| {
                warn!("Article moderated concurrently");
                AppError::invalid_transition("Article has already been moderated")
            })?;

        let article = self
            .articles
            .read(&article_id)
            .await?
            .ok_or_else(|| AppError::not_found("Article not found"))?;

        let (message, context) = match state {
            ModerationState::Approved => (
                "Your article was approved",
                NotificationContext::ArticleApproved {
                    group_id,
                    article_id,
                },
            ),
            _ => (
                "Your article was rejected",
                NotificationContext::ArticleRejected {
                    group_id,
                    article_id,
                },
            ),
        };
        dispatch(
            self.notifier.as_ref(),
            actor.user_id,
            article.author_id,
            message,
            context,
        );

        info!("Article {} moderated as {:?}", article_id, state);
        Ok(ArticleDTO::from_parts(article, entry))
    }

    /// Coda di moderazione, dal più recente. Solo Owner/Admin.
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn list_pending(
        &self,
        actor: &Actor,
        group_id: i64,
        query: &PageQuery,
    ) -> Result<Paginated<ArticleDTO>, AppError> {
        if !actor.role.is_moderator() {
            warn!("Role {:?} cannot read the moderation queue", actor.role);
            return Err(AppError::forbidden(
                "Only the owner or an administrator can see pending articles",
            ));
        }
        self.list_by_state(group_id, ModerationState::Pending, query)
            .await
    }

    /// Feed pubblico del gruppo: solo articoli approvati, dal più recente
    #[instrument(skip(self))]
    pub async fn group_feed(
        &self,
        group_id: i64,
        query: &PageQuery,
    ) -> Result<Paginated<ArticleDTO>, AppError> {
        if self.groups.read(&group_id).await?.is_none() {
            return Err(AppError::not_found("Group not found"));
        }
        self.list_by_state(group_id, ModerationState::Approved, query)
            .await
    }

    async fn list_by_state(
        &self,
        group_id: i64,
        state: ModerationState,
        query: &PageQuery,
    ) -> Result<Paginated<ArticleDTO>, AppError> {
        let (articles, total) = self
            .articles
            .list_by_state(group_id, state, query.limit(), query.offset())
            .await?;

        let ids: Vec<i64> = articles.iter().map(|a| a.article_id).collect();
        let mut entries: HashMap<i64, ModerationEntry> = self
            .moderation
            .read_for_articles(&ids)
            .await?
            .into_iter()
            .map(|e| (e.article_id, e))
            .collect();

        // l'entry può essere cambiata tra le due letture: la si scarta se non è più nello stato cercato
        let items: Vec<ArticleDTO> = articles
            .into_iter()
            .filter_map(|article: Article| {
                let entry = entries.remove(&article.article_id)?;
                (entry.state == state).then(|| ArticleDTO::from_parts(article, entry))
            })
            .collect();

        debug!("Found {} articles in state {:?}", items.len(), state);
        Ok(Paginated::new(items, query, total))
    }
}
