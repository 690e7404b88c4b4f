use super::{Notification, NotificationDispatch, NotifyError};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{info, instrument};

/// Canali in-process degli utenti connessi: user_id -> sender della loro coda
pub struct OnlineUsers {
    users_online: DashMap<i64, UnboundedSender<Notification>>,
}

impl OnlineUsers {
    pub fn new() -> Self {
        OnlineUsers {
            users_online: DashMap::new(),
        }
    }

    #[instrument(skip(self, tx))]
    pub fn register_online(&self, user_id: i64, tx: UnboundedSender<Notification>) {
        info!("Registering user {} as online", user_id);
        self.users_online.insert(user_id, tx);
        info!("Total online users: {}", self.users_online.len());
    }

    /// Rimuove il canale solo se è ancora quello registrato: una connessione
    /// più recente dello stesso utente resta online
    #[instrument(skip(self, tx))]
    pub fn remove_from_online(&self, user_id: i64, tx: &UnboundedSender<Notification>) {
        if self
            .users_online
            .remove_if(&user_id, |_, current| current.same_channel(tx))
            .is_some()
        {
            info!("Removing user from online");
        }
    }

    /// Apre un canale per l'utente; resta registrato finché vive la [`OnlineSession`]
    pub fn connect(self: &Arc<Self>, user_id: i64) -> (OnlineSession, UnboundedReceiver<Notification>) {
        let (tx, rx) = unbounded_channel();
        self.register_online(user_id, tx.clone());
        let session = OnlineSession {
            users: Arc::clone(self),
            user_id,
            tx,
        };
        (session, rx)
    }

    pub fn online_count(&self) -> usize {
        self.users_online.len()
    }

    pub fn is_user_online(&self, user_id: i64) -> bool {
        self.users_online.contains_key(&user_id)
    }
}

impl Default for OnlineUsers {
    fn default() -> Self {
        Self::new()
    }
}

/// Registrazione legata a una connessione aperta: al drop l'utente torna offline
pub struct OnlineSession {
    users: Arc<OnlineUsers>,
    user_id: i64,
    tx: UnboundedSender<Notification>,
}

impl Drop for OnlineSession {
    fn drop(&mut self) {
        self.users.remove_from_online(self.user_id, &self.tx);
    }
}

impl NotificationDispatch for OnlineUsers {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        let receiver_id = notification.receiver_id;
        let entry = self
            .users_online
            .get(&receiver_id)
            .ok_or(NotifyError::Offline(receiver_id))?;

        entry
            .value()
            .send(notification)
            .map_err(|_| NotifyError::ChannelClosed(receiver_id))
    }
}
