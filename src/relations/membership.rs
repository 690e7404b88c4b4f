//! GroupMembershipEngine - Ruoli nei gruppi, richieste di ingresso e deleghe amministrative
//!
//! Ogni transizione è un compare-and-set sulla singola riga (group_id, user_id):
//! se la riga è cambiata nel frattempo la transizione fallisce con INVALID_TRANSITION.
//! L'autorizzazione passa sempre da [`allowed_actions`], la stessa funzione che
//! alimenta i pulsanti lato client.

use super::begin_write;
use super::roles::{Actor, Capability, DemotionTarget, Role, Section, allowed_actions, role};
use crate::core::AppError;
use crate::dtos::{
    AllowedActionsDTO, CreateGroupDTO, GroupMembersDTO, MemberDTO, PageQuery, Paginated,
};
use crate::entities::{Group, GroupMembership, MembershipKind, MembershipState, User};
use crate::notifications::{NotificationContext, NotificationDispatch, dispatch};
use crate::repositories::{GroupRepository, MembershipRepository, Read, ReadMany, UserRepository};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const MEMBER_PENDING: (MembershipKind, MembershipState) =
    (MembershipKind::Member, MembershipState::Pending);
const MEMBER_ACCEPTED: (MembershipKind, MembershipState) =
    (MembershipKind::Member, MembershipState::Accepted);
const ADMIN_PENDING: (MembershipKind, MembershipState) =
    (MembershipKind::Admin, MembershipState::Pending);
const ADMIN_ACCEPTED: (MembershipKind, MembershipState) =
    (MembershipKind::Admin, MembershipState::Accepted);

/// Ruolo del target e sezione della vista membri in cui compare la sua riga
fn placement(group: &Group, row: &GroupMembership) -> (Role, Section) {
    let target_role = role(row.user_id, group, Some(row));
    let section = match (row.kind, row.state) {
        (MembershipKind::Member, MembershipState::Pending) => Section::JoinRequests,
        (MembershipKind::Member, MembershipState::Accepted) => Section::Members,
        _ => Section::Administrators,
    };
    (target_role, section)
}

fn authorize(
    actor: &Actor,
    target_role: Role,
    section: Section,
    capability: Capability,
) -> Result<(), AppError> {
    if allowed_actions(actor.role, target_role, section).contains(&capability) {
        Ok(())
    } else {
        warn!(
            "Role {:?} cannot {:?} a {:?} in {:?}",
            actor.role, capability, target_role, section
        );
        Err(AppError::forbidden("You are not allowed to perform this action"))
    }
}

fn index_users(users: Vec<User>) -> HashMap<i64, User> {
    users.into_iter().map(|u| (u.user_id, u)).collect()
}

#[derive(Clone)]
pub struct GroupMembershipEngine {
    pool: SqlitePool,
    groups: GroupRepository,
    memberships: MembershipRepository,
    users: UserRepository,
    notifier: Arc<dyn NotificationDispatch>,
    demotion: DemotionTarget,
}

impl GroupMembershipEngine {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn NotificationDispatch>) -> Self {
        Self {
            groups: GroupRepository::new(pool.clone()),
            memberships: MembershipRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
            notifier,
            demotion: DemotionTarget::default(),
        }
    }

    /// Dove finisce un amministratore rimosso (default: torna membro)
    pub fn with_demotion(mut self, demotion: DemotionTarget) -> Self {
        self.demotion = demotion;
        self
    }

    fn notify(&self, sender_id: i64, receiver_id: i64, message: &str, context: NotificationContext) {
        dispatch(self.notifier.as_ref(), sender_id, receiver_id, message, context);
    }

    async fn load_group(
        &self,
        conn: &mut SqliteConnection,
        group_id: i64,
    ) -> Result<Group, AppError> {
        self.groups.read_in(conn, group_id).await?.ok_or_else(|| {
            warn!("Group {} not found", group_id);
            AppError::not_found("Group not found")
        })
    }

    async fn load_row(
        &self,
        conn: &mut SqliteConnection,
        group_id: i64,
        user_id: i64,
    ) -> Result<GroupMembership, AppError> {
        self.memberships
            .read_in(conn, group_id, user_id)
            .await?
            .ok_or_else(|| {
                warn!("No membership row for user {} in group {}", user_id, group_id);
                AppError::not_found("Membership not found")
            })
    }

    /// Compare-and-set della riga; `None` dal repository significa che qualcun altro l'ha cambiata
    async fn move_row(
        &self,
        conn: &mut SqliteConnection,
        row: &GroupMembership,
        to: (MembershipKind, MembershipState),
    ) -> Result<GroupMembership, AppError> {
        self.memberships
            .transition(
                conn,
                row.group_id,
                row.user_id,
                (row.kind, row.state),
                to,
                Utc::now(),
            )
            .await?
            .ok_or_else(|| {
                warn!("Membership row changed concurrently");
                AppError::invalid_transition("Membership changed, retry the operation")
            })
    }

    // ********************* LETTURE **********************//

    /// Gruppo e ruolo effettivo di `user_id` al suo interno
    #[instrument(skip(self))]
    pub async fn role_of(&self, group_id: i64, user_id: i64) -> Result<(Group, Role), AppError> {
        let group = self
            .groups
            .read(&group_id)
            .await?
            .ok_or_else(|| AppError::not_found("Group not found"))?;
        let membership = self.memberships.read(&(group_id, user_id)).await?;
        let user_role = role(user_id, &group, membership.as_ref());
        debug!("User {} has role {:?}", user_id, user_role);
        Ok((group, user_role))
    }

    /// Vista per ruolo: owner, amministratori (accettati e invitati) e membri accettati.
    /// Le richieste di ingresso pendenti si leggono con `list_pending_join_requests`.
    #[instrument(skip(self))]
    pub async fn members_by_role(&self, group_id: i64) -> Result<GroupMembersDTO, AppError> {
        let group = self
            .groups
            .read(&group_id)
            .await?
            .ok_or_else(|| AppError::not_found("Group not found"))?;

        let rows = self.memberships.find_many_by_group_id(group_id).await?;
        let ids: Vec<i64> = rows.iter().map(|m| m.user_id).collect();
        let users = index_users(self.users.read_many(&ids).await?);

        let mut view = GroupMembersDTO {
            group_id,
            owner: None,
            administrators: Vec::new(),
            pending_administrators: Vec::new(),
            members: Vec::new(),
        };

        for row in rows {
            let (target_role, _) = placement(&group, &row);
            let pending_admin = row.is(MembershipKind::Admin, MembershipState::Pending);
            let user = users.get(&row.user_id);
            let member = MemberDTO::from_parts(row, user);

            match target_role {
                Role::Owner => view.owner = Some(member),
                Role::Admin => view.administrators.push(member),
                Role::Member => view.members.push(member),
                Role::Guest if pending_admin => view.pending_administrators.push(member),
                Role::Guest => {}
            }
        }

        debug!(
            "Group has {} administrators and {} members",
            view.administrators.len(),
            view.members.len()
        );
        Ok(view)
    }

    /// Richieste di ingresso pendenti, dalla più recente. Solo Owner/Admin.
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn list_pending_join_requests(
        &self,
        actor: &Actor,
        group_id: i64,
        query: &PageQuery,
    ) -> Result<Paginated<MemberDTO>, AppError> {
        authorize(actor, Role::Guest, Section::JoinRequests, Capability::AcceptJoin)?;

        let (rows, total) = self
            .memberships
            .list_by_kind_state(
                group_id,
                MembershipKind::Member,
                MembershipState::Pending,
                query.limit(),
                query.offset(),
            )
            .await?;

        let ids: Vec<i64> = rows.iter().map(|m| m.user_id).collect();
        let users = index_users(self.users.read_many(&ids).await?);

        let items = rows
            .into_iter()
            .map(|row| {
                let user = users.get(&row.user_id);
                MemberDTO::from_parts(row, user)
            })
            .collect();

        Ok(Paginated::new(items, query, total))
    }

    /// Capability dell'attore su `target_id` nella sezione indicata
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn allowed_actions_on(
        &self,
        actor: &Actor,
        group_id: i64,
        target_id: i64,
        section: Section,
    ) -> Result<AllowedActionsDTO, AppError> {
        let (_, target_role) = self.role_of(group_id, target_id).await?;
        Ok(AllowedActionsDTO {
            actor_role: actor.role,
            target_role,
            section,
            actions: allowed_actions(actor.role, target_role, section),
        })
    }

    // ********************* CREAZIONE **********************//

    #[instrument(skip(self, data), fields(name = %data.name))]
    pub async fn create_group(
        &self,
        creator_id: i64,
        data: &CreateGroupDTO,
    ) -> Result<Group, AppError> {
        debug!("Creating group");
        // 1. Inserire il gruppo con creator_id immutabile
        // 2. Inserire la riga OWNER/ACCEPTED del creatore nella stessa transazione
        // 3. Commit
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let group = self
            .groups
            .insert(&mut tx, &data.name, data.description.as_deref(), creator_id, now)
            .await?;
        self.memberships
            .insert(
                &mut tx,
                group.group_id,
                creator_id,
                MembershipKind::Owner,
                MembershipState::Accepted,
                now,
            )
            .await?;
        tx.commit().await?;

        info!("Group {} created", group.group_id);
        Ok(group)
    }

    // ********************* INGRESSO **********************//

    /// Guest -> MEMBER/PENDING
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn request_join(
        &self,
        actor: &Actor,
        group_id: i64,
    ) -> Result<GroupMembership, AppError> {
        debug!("Requesting to join group");
        let mut tx = begin_write(&self.pool).await?;
        let group = self.load_group(&mut tx, group_id).await?;

        if actor.user_id == group.creator_id
            || self
                .memberships
                .read_in(&mut tx, group_id, actor.user_id)
                .await?
                .is_some()
        {
            warn!("User already has a membership row");
            return Err(AppError::invalid_transition(
                "You already belong to this group or have a pending request",
            ));
        }

        let row = self
            .memberships
            .insert(
                &mut tx,
                group_id,
                actor.user_id,
                MembershipKind::Member,
                MembershipState::Pending,
                Utc::now(),
            )
            .await?;
        tx.commit().await?;

        // fan-out agli amministratori dopo il commit
        for moderator_id in self.memberships.moderator_ids(group_id).await? {
            self.notify(
                actor.user_id,
                moderator_id,
                "New request to join your group",
                NotificationContext::JoinRequested { group_id },
            );
        }

        info!("Join request created");
        Ok(row)
    }

    /// Il richiedente ritira la propria richiesta pendente
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn cancel_join_request(&self, actor: &Actor, group_id: i64) -> Result<(), AppError> {
        let mut tx = begin_write(&self.pool).await?;
        let row = self.load_row(&mut tx, group_id, actor.user_id).await?;

        if (row.kind, row.state) != MEMBER_PENDING {
            warn!("No pending join request to cancel");
            return Err(AppError::invalid_transition("No pending join request to cancel"));
        }

        self.memberships.remove(&mut tx, group_id, actor.user_id).await?;
        tx.commit().await?;

        info!("Join request cancelled");
        Ok(())
    }

    /// MEMBER/PENDING -> MEMBER/ACCEPTED
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn accept_join(
        &self,
        actor: &Actor,
        group_id: i64,
        user_id: i64,
    ) -> Result<GroupMembership, AppError> {
        debug!("Accepting join request");
        authorize(actor, Role::Guest, Section::JoinRequests, Capability::AcceptJoin)?;

        let mut tx = begin_write(&self.pool).await?;
        let row = self.load_row(&mut tx, group_id, user_id).await?;
        if (row.kind, row.state) != MEMBER_PENDING {
            warn!("Target has no pending join request");
            return Err(AppError::invalid_transition("User has no pending join request"));
        }

        let accepted = self.move_row(&mut tx, &row, MEMBER_ACCEPTED).await?;
        tx.commit().await?;

        self.notify(
            actor.user_id,
            user_id,
            "Your request to join the group was accepted",
            NotificationContext::JoinAccepted { group_id },
        );
        info!("Join request accepted");
        Ok(accepted)
    }

    /// MEMBER/PENDING -> nessuna riga
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn reject_join(
        &self,
        actor: &Actor,
        group_id: i64,
        user_id: i64,
    ) -> Result<(), AppError> {
        debug!("Rejecting join request");
        authorize(actor, Role::Guest, Section::JoinRequests, Capability::RejectJoin)?;

        let mut tx = begin_write(&self.pool).await?;
        let row = self.load_row(&mut tx, group_id, user_id).await?;
        if (row.kind, row.state) != MEMBER_PENDING {
            warn!("Target has no pending join request");
            return Err(AppError::invalid_transition("User has no pending join request"));
        }

        self.memberships.remove(&mut tx, group_id, user_id).await?;
        tx.commit().await?;

        self.notify(
            actor.user_id,
            user_id,
            "Your request to join the group was rejected",
            NotificationContext::JoinRejected { group_id },
        );
        info!("Join request rejected");
        Ok(())
    }

    // ********************* AMMINISTRATORI **********************//

    /// MEMBER/ACCEPTED -> ADMIN/PENDING, la stessa riga cambia tag
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn invite_admin(
        &self,
        actor: &Actor,
        group_id: i64,
        user_id: i64,
    ) -> Result<GroupMembership, AppError> {
        debug!("Inviting member to become administrator");
        authorize(actor, Role::Member, Section::Members, Capability::InviteAdmin)?;

        let mut tx = begin_write(&self.pool).await?;
        let row = self.load_row(&mut tx, group_id, user_id).await?;
        if (row.kind, row.state) != MEMBER_ACCEPTED {
            warn!("Target is not an accepted member");
            return Err(AppError::invalid_transition(
                "Only accepted members can be invited as administrators",
            ));
        }

        let invited = self.move_row(&mut tx, &row, ADMIN_PENDING).await?;
        tx.commit().await?;

        self.notify(
            actor.user_id,
            user_id,
            "You were invited to become an administrator",
            NotificationContext::AdminInvited { group_id },
        );
        info!("Administrator invitation sent");
        Ok(invited)
    }

    /// ADMIN/PENDING -> ADMIN/ACCEPTED, solo sulla propria riga
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn accept_admin(
        &self,
        actor: &Actor,
        group_id: i64,
    ) -> Result<GroupMembership, AppError> {
        debug!("Accepting administrator invitation");
        let mut tx = begin_write(&self.pool).await?;
        let group = self.load_group(&mut tx, group_id).await?;
        let row = self.load_row(&mut tx, group_id, actor.user_id).await?;
        if (row.kind, row.state) != ADMIN_PENDING {
            warn!("No pending administrator invitation");
            return Err(AppError::invalid_transition(
                "No pending administrator invitation",
            ));
        }

        let accepted = self.move_row(&mut tx, &row, ADMIN_ACCEPTED).await?;
        tx.commit().await?;

        self.notify(
            actor.user_id,
            group.creator_id,
            "Your administrator invitation was accepted",
            NotificationContext::AdminAccepted { group_id },
        );
        info!("Administrator invitation accepted");
        Ok(accepted)
    }

    /// ADMIN/PENDING -> MEMBER/ACCEPTED, solo sulla propria riga
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn decline_admin(
        &self,
        actor: &Actor,
        group_id: i64,
    ) -> Result<GroupMembership, AppError> {
        debug!("Declining administrator invitation");
        let mut tx = begin_write(&self.pool).await?;
        let row = self.load_row(&mut tx, group_id, actor.user_id).await?;
        if (row.kind, row.state) != ADMIN_PENDING {
            warn!("No pending administrator invitation");
            return Err(AppError::invalid_transition(
                "No pending administrator invitation",
            ));
        }

        let member = self.move_row(&mut tx, &row, MEMBER_ACCEPTED).await?;
        tx.commit().await?;

        info!("Administrator invitation declined");
        Ok(member)
    }

    /// ADMIN/* -> destinazione di demozione configurata. Restituisce la riga
    /// risultante, o `None` se l'utente è uscito dal gruppo.
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn remove_admin(
        &self,
        actor: &Actor,
        group_id: i64,
        user_id: i64,
    ) -> Result<Option<GroupMembership>, AppError> {
        debug!("Removing administrator");
        authorize(actor, Role::Admin, Section::Administrators, Capability::RemoveAdmin)?;

        let mut tx = begin_write(&self.pool).await?;
        let row = self.load_row(&mut tx, group_id, user_id).await?;
        if row.kind != MembershipKind::Admin {
            warn!("Target is not an administrator");
            return Err(AppError::invalid_transition("User is not an administrator"));
        }

        let result = match self.demotion {
            DemotionTarget::Member => Some(self.move_row(&mut tx, &row, MEMBER_ACCEPTED).await?),
            DemotionTarget::Guest => {
                if !self.memberships.remove(&mut tx, group_id, user_id).await? {
                    return Err(AppError::invalid_transition(
                        "Membership changed, retry the operation",
                    ));
                }
                None
            }
        };
        tx.commit().await?;

        self.notify(
            actor.user_id,
            user_id,
            "You are no longer an administrator of the group",
            NotificationContext::AdminRemoved { group_id },
        );
        info!("Administrator removed, demoted to {:?}", self.demotion);
        Ok(result)
    }

    // ********************* USCITA **********************//

    /// Cancella la riga di un membro o amministratore (in qualsiasi stato).
    /// L'owner rimuove chiunque tranne sé stesso, un admin solo i membri semplici.
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn remove_member(
        &self,
        actor: &Actor,
        group_id: i64,
        user_id: i64,
    ) -> Result<(), AppError> {
        debug!("Removing member from group");
        let mut tx = begin_write(&self.pool).await?;
        let group = self.load_group(&mut tx, group_id).await?;
        let row = self.load_row(&mut tx, group_id, user_id).await?;

        let (target_role, section) = placement(&group, &row);
        // una richiesta pendente si toglie con la stessa capability del rifiuto
        let capability = match section {
            Section::JoinRequests => Capability::RejectJoin,
            _ => Capability::RemoveMember,
        };
        authorize(actor, target_role, section, capability)?;

        if !self.memberships.remove(&mut tx, group_id, user_id).await? {
            return Err(AppError::invalid_transition(
                "Membership changed, retry the operation",
            ));
        }
        tx.commit().await?;

        self.notify(
            actor.user_id,
            user_id,
            "You were removed from the group",
            NotificationContext::RemovedFromGroup { group_id },
        );
        info!("Member removed");
        Ok(())
    }

    /// Chiunque tranne l'owner può uscire dal gruppo
    #[instrument(skip(self, actor), fields(actor_id = actor.user_id))]
    pub async fn leave_group(&self, actor: &Actor, group_id: i64) -> Result<(), AppError> {
        debug!("Leaving group");
        let mut tx = begin_write(&self.pool).await?;
        let group = self.load_group(&mut tx, group_id).await?;

        if actor.user_id == group.creator_id {
            warn!("Owner attempted to leave the group");
            return Err(AppError::invalid_transition("The owner cannot leave the group"));
        }

        if !self.memberships.remove(&mut tx, group_id, actor.user_id).await? {
            warn!("User is not part of the group");
            return Err(AppError::not_found("Membership not found"));
        }
        tx.commit().await?;

        info!("User left the group");
        Ok(())
    }

    // ********************* SALVATAGGI **********************//

    /// Salva il gruppo tra i preferiti; `false` se era già salvato
    #[instrument(skip(self))]
    pub async fn save_group(&self, user_id: i64, group_id: i64) -> Result<bool, AppError> {
        if self.groups.read(&group_id).await?.is_none() {
            return Err(AppError::not_found("Group not found"));
        }
        Ok(self.users.save_group(user_id, group_id, Utc::now()).await?)
    }

    /// `false` se il gruppo non era salvato
    #[instrument(skip(self))]
    pub async fn unsave_group(&self, user_id: i64, group_id: i64) -> Result<bool, AppError> {
        Ok(self.users.unsave_group(user_id, group_id).await?)
    }
}
