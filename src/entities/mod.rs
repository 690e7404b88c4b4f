//! Entities module - Entità del dominio applicativo
//!
//! Questo modulo contiene tutte le entità (models) che rappresentano i dati persistiti nel database.
//! Ogni entity corrisponde a una tabella nel database.

pub mod article;
pub mod enums;
pub mod friend_request;
pub mod group;
pub mod page;
pub mod user;

// Re-exports per facilitare l'import
pub use article::{Article, ModerationEntry};
pub use enums::{FriendRequestStatus, MembershipKind, MembershipState, ModerationState};
pub use friend_request::FriendRequest;
pub use group::{Group, GroupMembership};
pub use page::{Page, Ticket};
pub use user::User;
