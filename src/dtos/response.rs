//! Response DTO - Busta comune delle operazioni che modificano lo stato

use serde::{Deserialize, Serialize};

/// Ogni endpoint mutante risponde con flag di successo, record modificato (o null) e messaggio
#[derive(Serialize, Deserialize, Debug)]
pub struct MutationResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

impl<T> MutationResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
        }
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: message.into(),
        }
    }
}
