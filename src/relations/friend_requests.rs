//! FriendRequestManager - Richieste di amicizia, match reciproco e connessioni in comune

use super::begin_write;
use super::directory::mutual_connections;
use crate::core::AppError;
use crate::dtos::{
    CreateFriendRequestDTO, EnrichedFriendRequestDTO, MutualConnectionsDTO, PageQuery, Paginated,
    UserDTO,
};
use crate::entities::{FriendRequest, FriendRequestStatus, User};
use crate::notifications::{NotificationContext, NotificationDispatch, dispatch};
use crate::repositories::{Delete, FriendRequestRepository, Read, ReadMany, UserRepository};
use chrono::Utc;
use futures::future::join_all;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Esito di `send_request`: `matched` indica che esisteva già la richiesta
/// opposta ed è stata approvata al posto di crearne una nuova
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub request: FriendRequest,
    pub matched: bool,
}

enum Attempt {
    Done(SendOutcome),
    // violazione dell'indice sulla coppia pending: qualcun altro ha appena scritto
    Conflict,
}

#[derive(Clone)]
pub struct FriendRequestManager {
    pool: SqlitePool,
    requests: FriendRequestRepository,
    users: UserRepository,
    notifier: Arc<dyn NotificationDispatch>,
}

impl FriendRequestManager {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn NotificationDispatch>) -> Self {
        Self {
            requests: FriendRequestRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
            notifier,
        }
    }

    #[instrument(skip(self, message))]
    pub async fn send_request(
        &self,
        sender_id: i64,
        receiver_id: i64,
        message: Option<String>,
    ) -> Result<SendOutcome, AppError> {
        debug!("Sending friend request");
        if sender_id == receiver_id {
            warn!("User attempted to befriend themselves");
            return Err(AppError::bad_request("Cannot send a friend request to yourself"));
        }

        let data = CreateFriendRequestDTO {
            sender_id,
            receiver_id,
            message,
        };

        // al secondo tentativo lo stato concorrente è già committato: o diventa un match o un duplicato
        let outcome = match self.attempt_send(&data).await? {
            Attempt::Done(outcome) => outcome,
            Attempt::Conflict => {
                warn!("Concurrent pending request on the same pair, re-running decision");
                match self.attempt_send(&data).await? {
                    Attempt::Done(outcome) => outcome,
                    Attempt::Conflict => {
                        return Err(AppError::duplicate_request(
                            "A pending friend request already exists",
                        ));
                    }
                }
            }
        };

        if outcome.matched {
            info!(request_id = outcome.request.request_id, "Reciprocal request matched");
            dispatch(
                self.notifier.as_ref(),
                sender_id,
                outcome.request.sender_id,
                "Your friend request was accepted",
                NotificationContext::FriendRequestAccepted {
                    request_id: outcome.request.request_id,
                },
            );
        } else {
            info!(request_id = outcome.request.request_id, "Friend request created");
            dispatch(
                self.notifier.as_ref(),
                sender_id,
                receiver_id,
                "You received a new friend request",
                NotificationContext::FriendRequestReceived {
                    request_id: outcome.request.request_id,
                },
            );
        }

        Ok(outcome)
    }

    async fn attempt_send(&self, data: &CreateFriendRequestDTO) -> Result<Attempt, AppError> {
        // 1. Aprire la transazione
        // 2. Verificare che il destinatario esista, altrimenti NOT_FOUND
        // 3. Verificare che i due utenti non siano già amici
        // 4. Se esiste la richiesta opposta pending: approvarla e unire le liste amici (match)
        // 5. Se esiste già la stessa richiesta pending: DUPLICATE
        // 6. Altrimenti inserire la nuova richiesta pending e fare commit
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        if !self.users.exists(&mut tx, data.receiver_id).await? {
            warn!("Receiver {} not found", data.receiver_id);
            return Err(AppError::not_found("Receiver not found"));
        }

        if self
            .users
            .are_friends(&mut tx, data.sender_id, data.receiver_id)
            .await?
        {
            warn!("Users are already friends");
            return Err(AppError::invalid_transition("Users are already friends"));
        }

        if let Some(reverse) = self
            .requests
            .find_pending(&mut tx, data.receiver_id, data.sender_id)
            .await?
        {
            debug!("Found reverse pending request {}", reverse.request_id);
            if !self
                .requests
                .resolve_pending(&mut tx, reverse.request_id, FriendRequestStatus::Approved, now)
                .await?
            {
                return Ok(Attempt::Conflict);
            }
            self.users
                .add_friendship(&mut tx, data.sender_id, data.receiver_id, now)
                .await?;
            tx.commit().await?;

            return Ok(Attempt::Done(SendOutcome {
                request: FriendRequest {
                    status: FriendRequestStatus::Approved,
                    accepted_at: Some(now),
                    ..reverse
                },
                matched: true,
            }));
        }

        if self
            .requests
            .find_pending(&mut tx, data.sender_id, data.receiver_id)
            .await?
            .is_some()
        {
            warn!("Duplicate pending friend request");
            return Err(AppError::duplicate_request(
                "A pending friend request already exists",
            ));
        }

        let request = match self.requests.insert_pending(&mut tx, data, now).await {
            Ok(request) => request,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Ok(Attempt::Conflict);
            }
            Err(e) => return Err(e.into()),
        };
        tx.commit().await?;

        Ok(Attempt::Done(SendOutcome {
            request,
            matched: false,
        }))
    }

    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        actor_id: i64,
        request_id: i64,
        new_status: FriendRequestStatus,
    ) -> Result<FriendRequest, AppError> {
        debug!("Resolving friend request");
        // 1. Leggere la richiesta nella transazione, altrimenti NOT_FOUND
        // 2. Solo il destinatario può rispondere
        // 3. PENDING non è uno stato di arrivo valido
        // 4. Stesso stato terminale: no-op idempotente (per APPROVED si riapplica l'unione)
        // 5. Stato terminale diverso: INVALID_TRANSITION
        // 6. PENDING -> APPROVED/REJECTED, con unione delle liste amici se APPROVED
        // 7. Commit e notifica al mittente
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let request = self
            .requests
            .read_in(&mut tx, request_id)
            .await?
            .ok_or_else(|| {
                warn!("Friend request not found");
                AppError::not_found("Friend request not found")
            })?;

        if request.receiver_id != actor_id {
            warn!("User is not the receiver of the request");
            return Err(AppError::forbidden(
                "Only the receiver can respond to a friend request",
            ));
        }

        if new_status == FriendRequestStatus::Pending {
            warn!("Attempted to move request back to pending");
            return Err(AppError::invalid_transition(
                "A friend request cannot be set back to pending",
            ));
        }

        if request.status.is_terminal() {
            if request.status != new_status {
                warn!("Request already resolved as {:?}", request.status);
                return Err(AppError::invalid_transition(
                    "Friend request has already been resolved",
                ));
            }

            if new_status == FriendRequestStatus::Approved {
                self.users
                    .add_friendship(&mut tx, request.sender_id, request.receiver_id, now)
                    .await?;
            }
            tx.commit().await?;
            debug!("Request already {:?}, nothing to do", new_status);
            return Ok(request);
        }

        if !self
            .requests
            .resolve_pending(&mut tx, request_id, new_status, now)
            .await?
        {
            warn!("Request resolved concurrently");
            return Err(AppError::invalid_transition(
                "Friend request has already been resolved",
            ));
        }

        if new_status == FriendRequestStatus::Approved {
            self.users
                .add_friendship(&mut tx, request.sender_id, request.receiver_id, now)
                .await?;
        }
        tx.commit().await?;

        let resolved = FriendRequest {
            status: new_status,
            accepted_at: (new_status == FriendRequestStatus::Approved).then_some(now),
            ..request
        };

        let (message, context) = match new_status {
            FriendRequestStatus::Approved => (
                "Your friend request was accepted",
                NotificationContext::FriendRequestAccepted { request_id },
            ),
            _ => (
                "Your friend request was rejected",
                NotificationContext::FriendRequestRejected { request_id },
            ),
        };
        dispatch(
            self.notifier.as_ref(),
            actor_id,
            resolved.sender_id,
            message,
            context,
        );

        info!("Friend request resolved as {:?}", new_status);
        Ok(resolved)
    }

    /// Solo i partecipanti possono leggere una richiesta, anche se già risolta
    #[instrument(skip(self))]
    pub async fn get(&self, actor_id: i64, request_id: i64) -> Result<FriendRequest, AppError> {
        let request = self
            .requests
            .read(&request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Friend request not found"))?;

        if !request.involves(actor_id) {
            warn!("User is not a participant of the request");
            return Err(AppError::forbidden("You are not part of this friend request"));
        }

        Ok(request)
    }

    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        actor_id: i64,
        query: &PageQuery,
    ) -> Result<Paginated<FriendRequest>, AppError> {
        let (items, total) = self
            .requests
            .list_involving(actor_id, query.limit(), query.offset())
            .await?;
        debug!("Found {} requests out of {}", items.len(), total);
        Ok(Paginated::new(items, query, total))
    }

    #[instrument(skip(self))]
    pub async fn list_sent(
        &self,
        actor_id: i64,
        query: &PageQuery,
    ) -> Result<Paginated<EnrichedFriendRequestDTO>, AppError> {
        let (items, total) = self
            .requests
            .list_pending_by_sender(actor_id, query.limit(), query.offset())
            .await?;
        let enriched = self.enrich(actor_id, items).await?;
        Ok(Paginated::new(enriched, query, total))
    }

    #[instrument(skip(self))]
    pub async fn list_received(
        &self,
        actor_id: i64,
        query: &PageQuery,
    ) -> Result<Paginated<EnrichedFriendRequestDTO>, AppError> {
        let (items, total) = self
            .requests
            .list_pending_by_receiver(actor_id, query.limit(), query.offset())
            .await?;
        let enriched = self.enrich(actor_id, items).await?;
        Ok(Paginated::new(enriched, query, total))
    }

    async fn enrich(
        &self,
        actor_id: i64,
        requests: Vec<FriendRequest>,
    ) -> Result<Vec<EnrichedFriendRequestDTO>, AppError> {
        let mut ids: Vec<i64> = requests
            .iter()
            .flat_map(|r| [r.sender_id, r.receiver_id])
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let users: HashMap<i64, User> = self
            .users
            .read_many(&ids)
            .await?
            .into_iter()
            .map(|u| (u.user_id, u))
            .collect();

        let mutuals = join_all(requests.iter().map(|request| {
            mutual_connections(&self.users, actor_id, request.counterpart_of(actor_id))
        }))
        .await;

        let enriched = requests
            .into_iter()
            .zip(mutuals)
            .map(|(request, mutual)| {
                let sender = users.get(&request.sender_id).cloned().map(UserDTO::from);
                let receiver = users.get(&request.receiver_id).cloned().map(UserDTO::from);
                EnrichedFriendRequestDTO::from_parts(request, sender, receiver, mutual)
            })
            .collect();

        Ok(enriched)
    }

    /// Il mittente ritira la propria richiesta pending
    #[instrument(skip(self))]
    pub async fn cancel(&self, actor_id: i64, request_id: i64) -> Result<(), AppError> {
        debug!("Cancelling friend request");
        let request = self
            .requests
            .read(&request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Friend request not found"))?;

        if request.sender_id != actor_id {
            warn!("Only the sender can cancel the request");
            return Err(AppError::forbidden("Only the sender can cancel a friend request"));
        }

        if request.status.is_terminal() || !self.requests.delete(&request_id).await? {
            warn!("Attempted to cancel a resolved request");
            return Err(AppError::invalid_transition(
                "Resolved friend requests cannot be deleted",
            ));
        }

        info!("Friend request cancelled");
        Ok(())
    }

    /// Connessioni in comune tra l'utente corrente e `other_id`, che deve esistere
    #[instrument(skip(self))]
    pub async fn mutual_with(
        &self,
        actor_id: i64,
        other_id: i64,
    ) -> Result<MutualConnectionsDTO, AppError> {
        if self.users.read(&other_id).await?.is_none() {
            return Err(AppError::not_found("User not found"));
        }
        Ok(mutual_connections(&self.users, actor_id, other_id).await)
    }
}
