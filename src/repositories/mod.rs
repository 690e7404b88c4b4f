//! Repositories module - Coordinatore per tutti i repository del progetto
//!
//! Questo modulo organizza i repository in sotto-moduli separati per una migliore manutenibilità.
//! Ogni repository gestisce le operazioni di database per una specifica entità.

// ************************* NOTA SULLE QUERY ************************* //

/*
   Le query usano sqlx::query / sqlx::query_as con struct che derivano FromRow:
   il controllo statico di query! richiederebbe un database raggiungibile (o la cache
   offline) in fase di compilazione, cosa che non vogliamo imporre alla build.
   Regole della casa:
   - i metodi dei trait (Create, Read, ...) lavorano sul pool e fanno una sola query
   - i metodi che prendono `conn: &mut SqliteConnection` sono pensati per girare
     dentro una transazione aperta dal chiamante (modulo relations), che decide il commit
   - gli errori restano sqlx::Error: la conversione in AppError avviene più su
*/

// ************************* MODULI REPOSITORY ************************* //

pub mod article;
pub mod friend_request;
pub mod group;
pub mod membership;
pub mod page;
pub mod traits;
pub mod user;

// Re-esportazione dei trait per facilitare l'import
pub use traits::{Create, Delete, Read, ReadMany};

// Re-esportazione delle struct dei repository per facilitare l'import
pub use article::{ArticleRepository, ModerationRepository};
pub use friend_request::FriendRequestRepository;
pub use group::GroupRepository;
pub use membership::MembershipRepository;
pub use page::{PageRepository, TicketRepository};
pub use user::UserRepository;
