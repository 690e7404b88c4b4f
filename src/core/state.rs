//! Application State - Stato globale dell'applicazione
//!
//! Contiene i repository, i manager di dominio, le configurazioni e lo stato
//! condiviso necessario per gestire l'applicazione.

use crate::notifications::{NotificationDispatch, OnlineUsers};
use crate::relations::{
    ContentModerationPipeline, DemotionTarget, FriendRequestManager, GroupMembershipEngine,
    TransactionalLinkManager,
};
use crate::repositories::UserRepository;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Stato globale dell'applicazione condiviso tra tutte le route e middleware
pub struct AppState {
    /// Repository per la gestione degli utenti (autenticazione e arricchimento)
    pub user: UserRepository,

    /// Richieste di amicizia e connessioni in comune
    pub friends: FriendRequestManager,

    /// Ruoli e membership nei gruppi
    pub groups: GroupMembershipEngine,

    /// Moderazione degli articoli di gruppo
    pub moderation: ContentModerationPipeline,

    /// Collegamento transazionale pagina/ticket
    pub links: TransactionalLinkManager,

    /// Secret key per JWT token
    pub jwt_secret: String,

    /// Canali in-process degli utenti online, destinazione delle notifiche
    pub users_online: Arc<OnlineUsers>,
}

impl AppState {
    /// Crea una nuova istanza di AppState con le notifiche consegnate agli utenti online
    ///
    /// # Arguments
    /// * `pool` - Pool di connessioni SQLite condiviso
    /// * `jwt_secret` - Chiave segreta per la verifica dei token JWT
    pub fn new(pool: SqlitePool, jwt_secret: String) -> Self {
        let users_online = Arc::new(OnlineUsers::new());
        Self::with_notifier(pool, jwt_secret, users_online.clone(), users_online)
    }

    /// Come `new`, ma con un dispatcher di notifiche esplicito
    pub fn with_notifier(
        pool: SqlitePool,
        jwt_secret: String,
        notifier: Arc<dyn NotificationDispatch>,
        users_online: Arc<OnlineUsers>,
    ) -> Self {
        Self {
            user: UserRepository::new(pool.clone()),
            friends: FriendRequestManager::new(pool.clone(), notifier.clone()),
            groups: GroupMembershipEngine::new(pool.clone(), notifier.clone()),
            moderation: ContentModerationPipeline::new(pool.clone(), notifier),
            links: TransactionalLinkManager::new(pool),
            jwt_secret,
            users_online,
        }
    }

    /// Imposta dove finisce un amministratore rimosso
    pub fn with_demotion(mut self, demotion: DemotionTarget) -> Self {
        self.groups = self.groups.with_demotion(demotion);
        self
    }
}
