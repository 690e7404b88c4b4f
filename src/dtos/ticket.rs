//! Page/Ticket DTOs - Data Transfer Objects per pagine e ticket

use crate::entities::{Page, Ticket};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreatePageDTO {
    #[validate(length(min = 1, max = 200, message = "Page name must be between 1 and 200 characters"))]
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateTicketDTO {
    #[validate(length(min = 1, max = 120, message = "Ticket name must be between 1 and 120 characters"))]
    pub name: String,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
}

/// Pagina con i ticket vivi risolti a partire da list_ticket
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PageDTO {
    pub page_id: i64,
    pub owner_id: i64,
    pub name: String,
    pub list_ticket: Vec<i64>,
    pub tickets: Vec<Ticket>,
    pub created_at: DateTime<Utc>,
}

impl PageDTO {
    pub fn from_parts(page: Page, tickets: Vec<Ticket>) -> Self {
        Self {
            page_id: page.page_id,
            owner_id: page.owner_id,
            name: page.name,
            list_ticket: page.list_ticket.0,
            tickets,
            created_at: page.created_at,
        }
    }
}
