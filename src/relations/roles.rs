//! Ruoli derivati e capability
//!
//! Il ruolo di un utente in un gruppo non è mai salvato: si calcola dalla riga
//! di membership e dal creatore del gruppo.

use crate::entities::{Group, GroupMembership, MembershipKind, MembershipState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ordinati dal più debole al più forte, così `>=` esprime "almeno"
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    Member,
    Admin,
    Owner,
}

impl Role {
    pub fn is_moderator(&self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

/// Ruolo effettivo di `user_id` nel gruppo, dato la sua eventuale riga di membership
pub fn role(user_id: i64, group: &Group, membership: Option<&GroupMembership>) -> Role {
    if user_id == group.creator_id {
        return Role::Owner;
    }

    match membership {
        Some(m) if m.user_id == user_id && m.state == MembershipState::Accepted => match m.kind {
            MembershipKind::Owner => Role::Owner,
            MembershipKind::Admin => Role::Admin,
            MembershipKind::Member => Role::Member,
        },
        _ => Role::Guest,
    }
}

/// Utente che agisce, con il ruolo già derivato per il gruppo dell'operazione
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Sezione della vista membri in cui si trova il target
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    JoinRequests,
    Members,
    Administrators,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewProfile,
    AcceptJoin,
    RejectJoin,
    InviteAdmin,
    RemoveAdmin,
    RemoveMember,
}

/// Dove finisce un amministratore rimosso
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DemotionTarget {
    /// torna membro accettato
    #[default]
    Member,
    /// esce dal gruppo
    Guest,
}

impl std::str::FromStr for DemotionTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(DemotionTarget::Member),
            "guest" => Ok(DemotionTarget::Guest),
            other => Err(format!("unknown demotion target '{}'", other)),
        }
    }
}

/// Azioni che `actor_role` può compiere su un target con `target_role` nella sezione data.
/// Il motore delle membership autorizza le transizioni con questa stessa funzione.
pub fn allowed_actions(actor_role: Role, target_role: Role, section: Section) -> BTreeSet<Capability> {
    let mut actions = BTreeSet::from([Capability::ViewProfile]);

    match (section, actor_role) {
        // le richieste pendenti hanno sempre target Guest
        (Section::JoinRequests, Role::Owner | Role::Admin) if target_role == Role::Guest => {
            actions.insert(Capability::AcceptJoin);
            actions.insert(Capability::RejectJoin);
        }
        (Section::Members, Role::Owner) if target_role == Role::Member => {
            actions.insert(Capability::InviteAdmin);
            actions.insert(Capability::RemoveMember);
        }
        (Section::Members, Role::Admin) if target_role == Role::Member => {
            actions.insert(Capability::RemoveMember);
        }
        // un invito admin pendente ha target Guest: l'owner può revocarlo
        (Section::Administrators, Role::Owner)
            if matches!(target_role, Role::Admin | Role::Guest) =>
        {
            actions.insert(Capability::RemoveAdmin);
            actions.insert(Capability::RemoveMember);
        }
        _ => {}
    }

    actions
}
