//! Article DTOs - Data Transfer Objects per articoli e moderazione

use crate::entities::{Article, ModerationEntry, ModerationState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateArticleDTO {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 20000, message = "Content must be between 1 and 20000 characters"))]
    pub content: String,
}

/// Body di PATCH /groups/{group_id}/articles/{article_id}
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ModerationDecisionDTO {
    pub state: ModerationState,
}

/// Articolo con il suo stato di moderazione
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ArticleDTO {
    pub article_id: i64,
    pub group_id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub state: ModerationState,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ArticleDTO {
    pub fn from_parts(article: Article, entry: ModerationEntry) -> Self {
        Self {
            article_id: article.article_id,
            group_id: article.group_id,
            author_id: article.author_id,
            title: article.title,
            content: article.content,
            created_at: article.created_at,
            state: entry.state,
            reviewed_by: entry.reviewed_by,
            reviewed_at: entry.reviewed_at,
        }
    }
}
