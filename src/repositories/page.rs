//! Page/Ticket repositories - Pagine (genitore con array di riferimenti) e ticket (figlio)

use super::{Create, Read};
use crate::entities::{Page, Ticket};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Error, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

const TICKET_COLUMNS: &str = "ticket_id, page_id, name, price, created_at, destroyed_at";

/// DTO interno per creare una pagina vuota
#[derive(Debug, Clone)]
pub struct NewPage {
    pub owner_id: i64,
    pub name: String,
}

#[derive(Clone)]
pub struct PageRepository {
    connection_pool: SqlitePool,
}

impl PageRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }
}

impl Create<Page, NewPage> for PageRepository {
    async fn create(&self, data: &NewPage) -> Result<Page, Error> {
        let now = Utc::now();
        let list_ticket: Json<Vec<i64>> = Json(Vec::new());

        let result = sqlx::query(
            "INSERT INTO pages (owner_id, name, list_ticket, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(data.owner_id)
        .bind(&data.name)
        .bind(&list_ticket)
        .bind(now)
        .execute(&self.connection_pool)
        .await?;

        Ok(Page {
            page_id: result.last_insert_rowid(),
            owner_id: data.owner_id,
            name: data.name.clone(),
            list_ticket,
            created_at: now,
        })
    }
}

impl Read<Page, i64> for PageRepository {
    async fn read(&self, id: &i64) -> Result<Option<Page>, Error> {
        sqlx::query_as::<_, Page>(
            "SELECT page_id, owner_id, name, list_ticket, created_at FROM pages WHERE page_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

#[derive(Clone)]
pub struct TicketRepository {
    connection_pool: SqlitePool,
}

impl TicketRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    pub async fn insert(
        conn: &mut SqliteConnection,
        page_id: i64,
        name: &str,
        price: f64,
        now: DateTime<Utc>,
    ) -> Result<Ticket, Error> {
        let result = sqlx::query(
            "INSERT INTO tickets (page_id, name, price, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(page_id)
        .bind(name)
        .bind(price)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(Ticket {
            ticket_id: result.last_insert_rowid(),
            page_id,
            name: name.to_string(),
            price,
            created_at: now,
            destroyed_at: None,
        })
    }

    /// Live tickets among `ids`, in ticket_id order
    pub async fn read_live(&self, ids: &[i64]) -> Result<Vec<Ticket>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE destroyed_at IS NULL AND ticket_id IN ("
        ));
        let mut separated = query_builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY ticket_id");

        query_builder
            .build_query_as::<Ticket>()
            .fetch_all(&self.connection_pool)
            .await
    }
}

impl Read<Ticket, i64> for TicketRepository {
    /// Reads destroyed tickets too: soft-deleted rows stay for audit
    async fn read(&self, id: &i64) -> Result<Option<Ticket>, Error> {
        sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
