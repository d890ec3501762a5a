use crate::core::{
    AssigneeSummary, Principal, Priority, Role, Status, Ticket, TicketId, TicketUpdate,
    UpdateGuard, User, UserId,
};
use crate::error::{Result, TriageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which tickets a caller may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketScope {
    All,
    CreatedBy(UserId),
    AssignedTo(UserId),
}

impl TicketScope {
    /// Scope derived from the caller's role
    ///
    /// Users see what they created, moderators what is assigned to them,
    /// admins everything.
    #[must_use]
    pub const fn for_principal(principal: &Principal) -> Self {
        match principal.role {
            Role::User => Self::CreatedBy(principal.user_id),
            Role::Moderator => Self::AssignedTo(principal.user_id),
            Role::Admin => Self::All,
        }
    }

    #[must_use]
    pub fn permits(&self, ticket: &Ticket) -> bool {
        match self {
            Self::All => true,
            Self::CreatedBy(user) => ticket.created_by == *user,
            Self::AssignedTo(user) => ticket.assigned_to == Some(*user),
        }
    }
}

/// Repository trait for ticket storage operations
///
/// Every mutation goes through [`TicketRepository::update`], which checks its
/// [`UpdateGuard`] and writes the document as one atomic step.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Persist a new `OPEN` ticket
    async fn create(&self, title: String, description: String, created_by: UserId)
    -> Result<Ticket>;

    /// Loads a ticket by ID
    async fn find(&self, id: &TicketId) -> Result<Option<Ticket>>;

    /// Tickets within `scope`, newest first
    async fn list(&self, scope: TicketScope) -> Result<Vec<Ticket>>;

    /// Conditionally apply a partial update
    ///
    /// Fails with `NotFound` for an unknown id and `Conflict` when the guard
    /// rejects the ticket's current status.
    async fn update(&self, id: &TicketId, guard: UpdateGuard, update: TicketUpdate)
    -> Result<Ticket>;

    /// Number of open (`AI_PROCESSED`/`IN_PROGRESS`) tickets per assignee
    async fn open_load(&self) -> Result<HashMap<UserId, usize>>;

    /// `OPEN` tickets created before `cutoff`, oldest first
    async fn stale_open(&self, cutoff: DateTime<Utc>) -> Result<Vec<Ticket>>;

    /// Load a ticket if it exists and lies inside `scope`
    async fn get_scoped(&self, id: &TicketId, scope: TicketScope) -> Result<Ticket> {
        match self.find(id).await? {
            Some(ticket) if scope.permits(&ticket) => Ok(ticket),
            _ => Err(TriageError::ticket_not_found(id)),
        }
    }
}

/// Repository trait for user profiles
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user; fails with `AlreadyExists` on a duplicate email
    async fn create_user(&self, user: User) -> Result<User>;

    async fn find_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Case-insensitive email lookup
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// All users, oldest first
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Change role and/or skills
    async fn update_user_profile(
        &self,
        id: &UserId,
        role: Option<Role>,
        skills: Option<Vec<String>>,
    ) -> Result<User>;

    /// Users holding the moderator role, oldest first
    async fn moderators(&self) -> Result<Vec<User>> {
        Ok(self
            .list_users()
            .await?
            .into_iter()
            .filter(|u| u.role == Role::Moderator)
            .collect())
    }
}

/// A triage run that gave up after exhausting its retries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageFailure {
    pub ticket_id: TicketId,
    pub attempts: u32,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// Durable record of triage runs that need manual follow-up
#[async_trait]
pub trait FailureLog: Send + Sync {
    async fn record_failure(&self, failure: &TriageFailure) -> Result<()>;

    async fn failures(&self) -> Result<Vec<TriageFailure>>;
}

/// Ticket joined with its assigned moderator, as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    pub id: TicketId,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub created_by: UserId,
    pub assigned_to: Option<AssigneeSummary>,
    pub summary: Option<String>,
    pub required_skills: Vec<String>,
    pub helpful_notes: Option<String>,
    pub priority: Option<Priority>,
    pub solution: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketView {
    #[must_use]
    pub fn new(ticket: Ticket, assignee: Option<&User>) -> Self {
        Self {
            id: ticket.id,
            title: ticket.title,
            description: ticket.description,
            status: ticket.status,
            created_by: ticket.created_by,
            assigned_to: assignee.map(User::assignee_summary),
            summary: ticket.summary,
            required_skills: ticket.required_skills,
            helpful_notes: ticket.helpful_notes,
            priority: ticket.priority,
            solution: ticket.solution,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}

/// Join tickets with their assigned moderators
///
/// A dangling `assignedTo` (deleted user) is rendered as unassigned.
pub async fn join_assignees(
    users: &dyn UserRepository,
    tickets: Vec<Ticket>,
) -> Result<Vec<TicketView>> {
    let directory: HashMap<UserId, User> = users
        .list_users()
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(tickets
        .into_iter()
        .map(|ticket| {
            let assignee = ticket.assigned_to.and_then(|id| directory.get(&id));
            TicketView::new(ticket, assignee)
        })
        .collect())
}

/// Join a single ticket with its assigned moderator
pub async fn join_assignee(users: &dyn UserRepository, ticket: Ticket) -> Result<TicketView> {
    let assignee = match ticket.assigned_to {
        Some(id) => users.find_user(&id).await?,
        None => None,
    };
    Ok(TicketView::new(ticket, assignee.as_ref()))
}
