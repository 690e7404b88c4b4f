//! Relations Module - Logica di dominio delle relazioni sociali
//!
//! Qui vivono le macchine a stati: richieste di amicizia, membership e ruoli nei
//! gruppi, moderazione degli articoli e collegamento transazionale pagina/ticket.
//! I manager lavorano su transazioni sqlx e non conoscono axum: l'utente che agisce
//! (e il suo ruolo nel gruppo) arriva sempre come parametro esplicito.

pub mod directory;
pub mod friend_requests;
pub mod linking;
pub mod membership;
pub mod moderation;
pub mod roles;

use sqlx::{Sqlite, SqlitePool, Transaction};

// Re-exports per facilitare l'import
pub use directory::{GroupSets, UserDirectory, UserProfile, mutual_connections};
pub use friend_requests::{FriendRequestManager, SendOutcome};
pub use linking::{LinkedChild, PAGE_TICKETS, ParentArray, TransactionalLinkManager};
pub use membership::GroupMembershipEngine;
pub use moderation::ContentModerationPipeline;
pub use roles::{Actor, Capability, DemotionTarget, Role, Section, allowed_actions, role};

/// Transazione con `BEGIN IMMEDIATE`: il lock di scrittura si prende all'apertura,
/// quindi le letture iniziali vedono già lo stato committato da chi scriveva prima
/// e una transazione concorrente attende (busy_timeout) invece di fallire sull'upgrade.
pub(crate) async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}
