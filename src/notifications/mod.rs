//! Notifications Module - Consegna fire-and-forget degli eventi di stato
//!
//! I manager pubblicano un evento dopo il commit della transazione tramite il
//! trait [`NotificationDispatch`]. Un errore di consegna viene solo loggato: non
//! annulla mai la transizione che l'ha generato.

pub mod online;

pub use online::{OnlineSession, OnlineUsers};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Contesto dell'evento, utile al client per capire cosa aggiornare
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationContext {
    FriendRequestReceived { request_id: i64 },
    FriendRequestAccepted { request_id: i64 },
    FriendRequestRejected { request_id: i64 },
    JoinRequested { group_id: i64 },
    JoinAccepted { group_id: i64 },
    JoinRejected { group_id: i64 },
    AdminInvited { group_id: i64 },
    AdminAccepted { group_id: i64 },
    AdminRemoved { group_id: i64 },
    RemovedFromGroup { group_id: i64 },
    ArticleSubmitted { group_id: i64, article_id: i64 },
    ArticleApproved { group_id: i64, article_id: i64 },
    ArticleRejected { group_id: i64, article_id: i64 },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Notification {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub message: String,
    pub context: NotificationContext,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// Il destinatario non ha un canale registrato
    Offline(i64),
    /// Il canale esiste ma il ricevitore è stato chiuso
    ChannelClosed(i64),
    Other(String),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::Offline(user_id) => write!(f, "user {} is offline", user_id),
            NotifyError::ChannelClosed(user_id) => {
                write!(f, "notification channel of user {} is closed", user_id)
            }
            NotifyError::Other(reason) => write!(f, "{}", reason),
        }
    }
}

impl std::error::Error for NotifyError {}

pub trait NotificationDispatch: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Invia e dimentica: il fallimento viene loggato e ignorato
pub fn dispatch(
    notifier: &dyn NotificationDispatch,
    sender_id: i64,
    receiver_id: i64,
    message: impl Into<String>,
    context: NotificationContext,
) {
    if sender_id == receiver_id {
        return;
    }

    let notification = Notification {
        sender_id,
        receiver_id,
        message: message.into(),
        context,
    };

    match notifier.notify(notification) {
        Ok(()) => debug!("Notification delivered to user {}", receiver_id),
        Err(e) => warn!("Notification to user {} not delivered: {}", receiver_id, e),
    }
}
