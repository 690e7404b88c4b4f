//! Core Module - Componenti infrastrutturali dell'applicazione
//!
//! Questo modulo contiene tutti i componenti "core" dell'applicazione:
//! - Verifica JWT e contesto di gruppo
//! - Configurazione
//! - Gestione errori
//! - Stato applicazione

pub mod auth;
pub mod config;
pub mod error;
pub mod state;

// Re-exports per facilitare l'import
pub use auth::{Claims, GroupContext, authentication_middleware, decode_jwt, group_role_middleware};
pub use config::Config;
pub use error::{AppError, ErrorKind};
pub use state::AppState;
