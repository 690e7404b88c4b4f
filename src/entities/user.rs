//! User entity - Entità utente (profilo di sola lettura per questo sottosistema)

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub display_name: Option<String>,
}

impl User {
    /// Nome da mostrare nelle liste: display_name se presente, altrimenti username
    pub fn shown_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}
