//! TransactionalLinkManager - Figlio e array di riferimenti del genitore aggiornati insieme
//!
//! Creazione: insert del figlio, poi push del suo id nell'array del genitore.
//! Cancellazione: soft delete del figlio (destroyed_at), poi pull dall'array.
//! Entrambe in una sola transazione: se il genitore manca si fa rollback e il
//! figlio resta com'era.

use super::begin_write;
use crate::core::AppError;
use crate::dtos::{CreatePageDTO, CreateTicketDTO, PageDTO};
use crate::entities::{Page, Ticket};
use crate::repositories::page::NewPage;
use crate::repositories::{Create, PageRepository, Read, TicketRepository};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, instrument, warn};

/// Colonna JSON (array di id) sul documento genitore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentArray {
    pub table: &'static str,
    pub key: &'static str,
    pub column: &'static str,
}

/// `pages.list_ticket`
pub const PAGE_TICKETS: ParentArray = ParentArray {
    table: "pages",
    key: "page_id",
    column: "list_ticket",
};

/// A child record whose id lives in a parent's JSON array.
///
/// The child table must have a nullable `destroyed_at` column; deletion is soft.
pub trait LinkedChild: Sized {
    type Draft;

    const TABLE: &'static str;
    const KEY: &'static str;
    /// Column of the child holding the parent id
    const PARENT_KEY: &'static str;

    fn id(&self) -> i64;

    async fn insert(
        conn: &mut SqliteConnection,
        draft: &Self::Draft,
        parent_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>;
}

impl LinkedChild for Ticket {
    type Draft = CreateTicketDTO;

    const TABLE: &'static str = "tickets";
    const KEY: &'static str = "ticket_id";
    const PARENT_KEY: &'static str = "page_id";

    fn id(&self) -> i64 {
        self.ticket_id
    }

    async fn insert(
        conn: &mut SqliteConnection,
        draft: &CreateTicketDTO,
        parent_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        TicketRepository::insert(conn, parent_id, &draft.name, draft.price, now).await
    }
}

async fn read_array(
    conn: &mut SqliteConnection,
    field: ParentArray,
    parent_id: i64,
) -> Result<Option<Vec<i64>>, sqlx::Error> {
    let ids: Option<Json<Vec<i64>>> = sqlx::query_scalar(&format!(
        "SELECT {} FROM {} WHERE {} = ?",
        field.column, field.table, field.key
    ))
    .bind(parent_id)
    .fetch_optional(conn)
    .await?;
    Ok(ids.map(|Json(ids)| ids))
}

async fn write_array(
    conn: &mut SqliteConnection,
    field: ParentArray,
    parent_id: i64,
    ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "UPDATE {} SET {} = ? WHERE {} = ?",
        field.table, field.column, field.key
    ))
    .bind(Json(ids))
    .bind(parent_id)
    .execute(conn)
    .await?;
    Ok(())
}

#[derive(Clone)]
pub struct TransactionalLinkManager {
    pool: SqlitePool,
    pages: PageRepository,
    tickets: TicketRepository,
}

impl TransactionalLinkManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pages: PageRepository::new(pool.clone()),
            tickets: TicketRepository::new(pool.clone()),
            pool,
        }
    }

    /// Crea il figlio e aggiunge il suo id a `field` del genitore `parent_id`
    pub async fn create_linked<C: LinkedChild>(
        &self,
        draft: &C::Draft,
        parent_id: i64,
        field: ParentArray,
    ) -> Result<C, AppError> {
        debug!("Creating {} linked to {} {}", C::TABLE, field.table, parent_id);
        // la prima istruzione è una scrittura: il lock di scrittura serializza il read-modify-write dell'array
        let mut tx = begin_write(&self.pool).await?;
        let child = C::insert(&mut tx, draft, parent_id, Utc::now()).await?;

        let mut ids = read_array(&mut tx, field, parent_id).await?.ok_or_else(|| {
            warn!("Parent {} {} not found, rolling back", field.table, parent_id);
            AppError::parent_not_found("Parent record not found")
        })?;

        if !ids.contains(&child.id()) {
            ids.push(child.id());
        }
        write_array(&mut tx, field, parent_id, &ids).await?;
        tx.commit().await?;

        info!("{} {} linked to {} {}", C::TABLE, child.id(), field.table, parent_id);
        Ok(child)
    }

    /// Soft delete del figlio e rimozione del suo id da `field` del genitore.
    /// Restituisce l'id del genitore aggiornato.
    pub async fn delete_linked<C: LinkedChild>(
        &self,
        child_id: i64,
        field: ParentArray,
    ) -> Result<i64, AppError> {
        debug!("Deleting {} {}", C::TABLE, child_id);
        let mut tx = begin_write(&self.pool).await?;

        let parent_id: Option<i64> = sqlx::query_scalar(&format!(
            "UPDATE {} SET destroyed_at = ? WHERE {} = ? AND destroyed_at IS NULL RETURNING {}",
            C::TABLE,
            C::KEY,
            C::PARENT_KEY
        ))
        .bind(Utc::now())
        .bind(child_id)
        .fetch_optional(&mut *tx)
        .await?;

        let parent_id = parent_id.ok_or_else(|| {
            warn!("{} {} not found or already destroyed", C::TABLE, child_id);
            AppError::not_found("Record not found")
        })?;

        let mut ids = read_array(&mut tx, field, parent_id).await?.ok_or_else(|| {
            warn!("Parent {} {} not found, rolling back", field.table, parent_id);
            AppError::parent_not_found("Parent record not found")
        })?;

        ids.retain(|id| *id != child_id);
        write_array(&mut tx, field, parent_id, &ids).await?;
        tx.commit().await?;

        info!("{} {} unlinked from {} {}", C::TABLE, child_id, field.table, parent_id);
        Ok(parent_id)
    }

    // ********************* PAGINE E TICKET **********************//

    #[instrument(skip(self, data), fields(name = %data.name))]
    pub async fn create_page(&self, owner_id: i64, data: &CreatePageDTO) -> Result<Page, AppError> {
        let page = self
            .pages
            .create(&NewPage {
                owner_id,
                name: data.name.clone(),
            })
            .await?;
        info!("Page {} created", page.page_id);
        Ok(page)
    }

    /// Pagina con i ticket vivi risolti da list_ticket
    #[instrument(skip(self))]
    pub async fn get_page(&self, page_id: i64) -> Result<PageDTO, AppError> {
        let page = self
            .pages
            .read(&page_id)
            .await?
            .ok_or_else(|| AppError::not_found("Page not found"))?;
        let tickets = self.tickets.read_live(&page.list_ticket).await?;
        Ok(PageDTO::from_parts(page, tickets))
    }

    /// Solo il proprietario della pagina aggiunge ticket
    #[instrument(skip(self, draft))]
    pub async fn create_ticket(
        &self,
        actor_id: i64,
        page_id: i64,
        draft: &CreateTicketDTO,
    ) -> Result<Ticket, AppError> {
        let page = self
            .pages
            .read(&page_id)
            .await?
            .ok_or_else(|| AppError::parent_not_found("Page not found"))?;

        if page.owner_id != actor_id {
            warn!("User is not the owner of the page");
            return Err(AppError::forbidden("Only the page owner can add tickets"));
        }

        self.create_linked::<Ticket>(draft, page_id, PAGE_TICKETS)
            .await
    }

    /// Solo il proprietario della pagina cancella i suoi ticket
    #[instrument(skip(self))]
    pub async fn delete_ticket(&self, actor_id: i64, ticket_id: i64) -> Result<(), AppError> {
        let ticket = self
            .tickets
            .read(&ticket_id)
            .await?
            .filter(Ticket::is_live)
            .ok_or_else(|| AppError::not_found("Ticket not found"))?;

        // con genitore mancante decide delete_linked (ParentNotFound e rollback)
        if let Some(page) = self.pages.read(&ticket.page_id).await? {
            if page.owner_id != actor_id {
                warn!("User is not the owner of the page");
                return Err(AppError::forbidden("Only the page owner can delete tickets"));
            }
        }

        self.delete_linked::<Ticket>(ticket_id, PAGE_TICKETS).await?;
        Ok(())
    }
}
