//! UserDirectory - Vista sugli utenti usata per le connessioni in comune

use crate::core::AppError;
use crate::dtos::MutualConnectionsDTO;
use crate::repositories::UserRepository;
use std::collections::BTreeSet;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupSets {
    pub created: BTreeSet<i64>,
    pub saved: BTreeSet<i64>,
}

impl GroupSets {
    /// Gruppi creati o salvati
    pub fn all(&self) -> BTreeSet<i64> {
        self.created.union(&self.saved).copied().collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub friends: BTreeSet<i64>,
    pub groups: GroupSets,
}

/// Source of the social profile of a user.
///
/// `Ok(None)` means the user is unknown to the directory, which callers treat
/// as an empty profile.
pub trait UserDirectory {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserProfile>, AppError>;
}

impl UserDirectory for UserRepository {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserProfile>, AppError> {
        use crate::repositories::Read;

        if self.read(&user_id).await?.is_none() {
            return Ok(None);
        }

        let friends = self.friend_ids(user_id).await?.into_iter().collect();
        let created = self.created_group_ids(user_id).await?.into_iter().collect();
        let saved = self.saved_group_ids(user_id).await?.into_iter().collect();

        Ok(Some(UserProfile {
            friends,
            groups: GroupSets { created, saved },
        }))
    }
}

/// Amici e gruppi (creati ∪ salvati) in comune tra due utenti.
/// Un profilo mancante conta come vuoto; un errore della directory degrada a insiemi vuoti.
#[instrument(skip(directory))]
pub async fn mutual_connections<D: UserDirectory>(
    directory: &D,
    user_id: i64,
    other_id: i64,
) -> MutualConnectionsDTO {
    debug!("Computing mutual connections");

    let (user, other) = match (
        directory.get_user(user_id).await,
        directory.get_user(other_id).await,
    ) {
        (Ok(user), Ok(other)) => (user.unwrap_or_default(), other.unwrap_or_default()),
        (Err(e), _) | (_, Err(e)) => {
            warn!("User directory unavailable, mutual connections left empty: {}", e);
            return MutualConnectionsDTO::default();
        }
    };

    let mutual_friends = user.friends.intersection(&other.friends).copied().collect();
    let mutual_groups = user
        .groups
        .all()
        .intersection(&other.groups.all())
        .copied()
        .collect();

    MutualConnectionsDTO {
        mutual_friends,
        mutual_groups,
    }
}
