//! Group entity - Entità gruppo e riga di membership

use super::enums::{MembershipKind, MembershipState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Group {
    pub group_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: i64, // owner immutabile
    pub created_at: DateTime<Utc>,
}

/// Una riga per coppia (group_id, user_id): un utente non può stare
/// contemporaneamente tra gli amministratori e tra i membri
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct GroupMembership {
    pub group_id: i64,
    pub user_id: i64,
    pub kind: MembershipKind,
    pub state: MembershipState,
    pub join_date: DateTime<Utc>,
}

impl GroupMembership {
    pub fn is(&self, kind: MembershipKind, state: MembershipState) -> bool {
        self.kind == kind && self.state == state
    }
}
