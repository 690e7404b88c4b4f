//! FriendRequest DTOs - Data Transfer Objects per richieste di amicizia

use crate::dtos::UserDTO;
use crate::entities::{FriendRequest, FriendRequestStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body di POST /friend-requests
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct SendFriendRequestDTO {
    pub receiver_id: i64,

    #[validate(length(max = 500, message = "Message must be at most 500 characters"))]
    pub message: Option<String>,
}

/// DTO per creare una nuova richiesta (senza request_id, status e created_at)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateFriendRequestDTO {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub message: Option<String>,
}

/// DTO per aggiornare una richiesta (solo lo stato è modificabile)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateFriendRequestDTO {
    pub status: FriendRequestStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MutualConnectionsDTO {
    pub mutual_friends: Vec<i64>,
    pub mutual_groups: Vec<i64>,
}

/// DTO arricchito con i dati della controparte e le connessioni in comune
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EnrichedFriendRequestDTO {
    pub request_id: i64,
    pub status: FriendRequestStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sender: Option<UserDTO>,
    pub receiver: Option<UserDTO>,
    pub mutual: MutualConnectionsDTO,
}

impl EnrichedFriendRequestDTO {
    pub fn from_parts(
        request: FriendRequest,
        sender: Option<UserDTO>,
        receiver: Option<UserDTO>,
        mutual: MutualConnectionsDTO,
    ) -> Self {
        Self {
            request_id: request.request_id,
            status: request.status,
            message: request.message,
            created_at: request.created_at,
            sender,
            receiver,
            mutual,
        }
    }
}
