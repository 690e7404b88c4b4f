//! Group DTOs - Data Transfer Objects per gruppi e membership

use crate::entities::{Group, GroupMembership, MembershipKind, MembershipState, User};
use crate::relations::{Capability, Role, Section};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateGroupDTO {
    #[validate(length(min = 1, max = 100, message = "Group name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GroupDTO {
    pub group_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Group> for GroupDTO {
    fn from(value: Group) -> Self {
        Self {
            group_id: value.group_id,
            name: value.name,
            description: value.description,
            creator_id: value.creator_id,
            created_at: value.created_at,
        }
    }
}

/// Un utente in un gruppo con il suo tag di membership
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MemberDTO {
    pub user_id: i64,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub kind: MembershipKind,
    pub state: MembershipState,
    pub join_date: DateTime<Utc>,
}

impl MemberDTO {
    /// username/display_name vanno popolati con l'utente se disponibile
    pub fn from_parts(membership: GroupMembership, user: Option<&User>) -> Self {
        Self {
            user_id: membership.user_id,
            username: user.map(|u| u.username.clone()),
            display_name: user.and_then(|u| u.display_name.clone()),
            kind: membership.kind,
            state: membership.state,
            join_date: membership.join_date,
        }
    }
}

/// Vista per ruolo: owner, amministratori, membri
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GroupMembersDTO {
    pub group_id: i64,
    pub owner: Option<MemberDTO>,
    pub administrators: Vec<MemberDTO>,
    pub pending_administrators: Vec<MemberDTO>,
    pub members: Vec<MemberDTO>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberAction {
    Accept,
    Reject,
    InviteAdmin,
    RemoveAdmin,
    AcceptAdmin,
    DeclineAdmin,
    Remove,
}

/// Body di PATCH /groups/{group_id}/members/{user_id}
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MemberActionDTO {
    pub action: MemberAction,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ActionsQuery {
    pub section: Section,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AllowedActionsDTO {
    pub actor_role: Role,
    pub target_role: Role,
    pub section: Section,
    pub actions: BTreeSet<Capability>,
}
