//! Page/Ticket entities - Pagina con lista di ticket e ticket figlio

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Page {
    pub page_id: i64,
    pub owner_id: i64,
    pub name: String,
    // array di ticket_id, tenuto allineato ai ticket vivi dal link manager
    pub list_ticket: Json<Vec<i64>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Ticket {
    pub ticket_id: i64,
    pub page_id: i64,
    pub name: String,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub destroyed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn is_live(&self) -> bool {
        self.destroyed_at.is_none()
    }
}
