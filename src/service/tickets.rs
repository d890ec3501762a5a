use crate::auth::Operation;
use crate::core::{Principal, Status, TicketId, TicketUpdate, UpdateGuard};
use crate::error::{Result, TriageError};
use crate::events::{EventBus, TicketEvent};
use crate::storage::{
    TicketRepository, TicketScope, TicketView, UserRepository, join_assignee, join_assignees,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// New ticket input
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTicket {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Human status change; a patch with only `solution` means "solve"
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketPatch {
    pub status: Option<Status>,
    pub solution: Option<String>,
}

impl TicketPatch {
    fn target(&self) -> Option<Status> {
        self.status
            .or_else(|| self.solution.as_ref().map(|_| Status::Solved))
    }
}

/// Ticket operations behind the role gate
#[derive(Clone)]
pub struct TicketService {
    tickets: Arc<dyn TicketRepository>,
    users: Arc<dyn UserRepository>,
    bus: Arc<dyn EventBus>,
}

impl TicketService {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        users: Arc<dyn UserRepository>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            tickets,
            users,
            bus,
        }
    }

    /// Create an `OPEN` ticket and queue it for triage
    ///
    /// A failed publish is logged and left to the sweep; the ticket stays.
    pub async fn create(&self, principal: &Principal, input: NewTicket) -> Result<TicketView> {
        Operation::CreateTicket.authorize(principal)?;

        let title = input.title.trim();
        let description = input.description.trim();
        if title.is_empty() || description.is_empty() {
            return Err(TriageError::validation("Title and description are required"));
        }

        let ticket = self
            .tickets
            .create(title.to_string(), description.to_string(), principal.user_id)
            .await?;
        info!(ticket_id = %ticket.id, created_by = %principal.user_id, "Ticket created");

        if let Err(e) = self
            .bus
            .publish(TicketEvent::Created {
                ticket_id: ticket.id,
            })
            .await
        {
            warn!(ticket_id = %ticket.id, error = %e, "Could not queue ticket for triage; the sweep will pick it up");
        }

        Ok(TicketView::new(ticket, None))
    }

    /// Tickets visible to the caller, newest first
    pub async fn list_for(&self, principal: &Principal) -> Result<Vec<TicketView>> {
        Operation::ListTickets.authorize(principal)?;
        let tickets = self
            .tickets
            .list(TicketScope::for_principal(principal))
            .await?;
        join_assignees(self.users.as_ref(), tickets).await
    }

    /// A single ticket, `NotFound` when outside the caller's scope
    pub async fn get_for(&self, principal: &Principal, id: &TicketId) -> Result<TicketView> {
        Operation::GetTicket.authorize(principal)?;
        let ticket = self
            .tickets
            .get_scoped(id, TicketScope::for_principal(principal))
            .await?;
        join_assignee(self.users.as_ref(), ticket).await
    }

    /// Apply a human status transition
    pub async fn patch(
        &self,
        principal: &Principal,
        id: &TicketId,
        patch: TicketPatch,
    ) -> Result<TicketView> {
        Operation::PatchTicket.authorize(principal)?;
        let current = self
            .tickets
            .get_scoped(id, TicketScope::for_principal(principal))
            .await?;

        let target = patch
            .target()
            .ok_or_else(|| TriageError::validation("Provide a status or a solution"))?;
        current
            .status
            .check_transition(target, patch.solution.as_deref())?;

        let update = TicketUpdate {
            status: Some(target),
            solution: patch
                .solution
                .filter(|_| target == Status::Solved)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            ..TicketUpdate::default()
        };
        let ticket = self
            .tickets
            .update(id, UpdateGuard::status(current.status), update)
            .await?;
        info!(ticket_id = %id, from = %current.status, to = %target, by = %principal.user_id, "Ticket status changed");

        join_assignee(self.users.as_ref(), ticket).await
    }

    /// Queue an `AI_PROCESSED` ticket for another triage run
    pub async fn retriage(&self, principal: &Principal, id: &TicketId) -> Result<()> {
        Operation::RetriageTicket.authorize(principal)?;
        let ticket = self.tickets.get_scoped(id, TicketScope::All).await?;
        if ticket.status != Status::AiProcessed {
            return Err(TriageError::InvalidTransition {
                from: ticket.status,
                to: Status::AiProcessed,
                reason: "only tickets awaiting pickup can be re-triaged".to_string(),
            });
        }

        self.bus.publish(TicketEvent::Retriage { ticket_id: *id }).await?;
        info!(ticket_id = %id, "Ticket queued for re-triage");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Role, User};
    use crate::test_utils::{TestDesk, principal};

    fn service(desk: &TestDesk) -> TicketService {
        TicketService::new(desk.storage.clone(), desk.storage.clone(), desk.bus.clone())
    }

    fn new_ticket(title: &str) -> NewTicket {
        NewTicket {
            title: title.to_string(),
            description: "Blank screen after login".to_string(),
        }
    }

    async fn assign(desk: &TestDesk, id: &TicketId, moderator: &User) {
        desk.storage
            .update(
                id,
                UpdateGuard::Any,
                TicketUpdate {
                    status: Some(Status::AiProcessed),
                    assigned_to: Some(Some(moderator.id)),
                    ..TicketUpdate::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_publishes_event() {
        let desk = TestDesk::new();
        let alice = desk.user("alice@example.com", Role::User, &[]).await;
        let service = service(&desk);

        let ticket = service
            .create(&principal(&alice), new_ticket("  Login broken "))
            .await
            .unwrap();
        assert_eq!(ticket.title, "Login broken");
        assert_eq!(ticket.status, Status::Open);
        assert!(ticket.assigned_to.is_none());
        assert_eq!(
            desk.bus.published().await,
            vec![TicketEvent::Created {
                ticket_id: ticket.id
            }]
        );
    }

    #[tokio::test]
    async fn test_create_validates_and_survives_bus_outage() {
        let desk = TestDesk::new();
        let alice = desk.user("alice@example.com", Role::User, &[]).await;
        let service = service(&desk);

        let err = service
            .create(&principal(&alice), new_ticket("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Validation(_)));

        desk.bus.go_down();
        let ticket = service
            .create(&principal(&alice), new_ticket("Still saved"))
            .await
            .unwrap();
        assert!(desk.storage.find(&ticket.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_visibility_is_scoped_by_role() {
        let desk = TestDesk::new();
        let alice = desk.user("alice@example.com", Role::User, &[]).await;
        let bob = desk.user("bob@example.com", Role::User, &[]).await;
        let mod1 = desk.user("m1@example.com", Role::Moderator, &["React"]).await;
        let mod2 = desk.user("m2@example.com", Role::Moderator, &["Go"]).await;
        let admin = desk.user("root@example.com", Role::Admin, &[]).await;
        let service = service(&desk);

        let mine = service
            .create(&principal(&alice), new_ticket("alice's"))
            .await
            .unwrap();
        service
            .create(&principal(&bob), new_ticket("bob's"))
            .await
            .unwrap();
        assign(&desk, &mine.id, &mod1).await;

        let seen = service.list_for(&principal(&alice)).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, mine.id);

        let seen = service.list_for(&principal(&mod1)).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].assigned_to.as_ref().map(|a| a.email.as_str()),
            Some("m1@example.com")
        );
        assert!(service.list_for(&principal(&mod2)).await.unwrap().is_empty());
        assert_eq!(service.list_for(&principal(&admin)).await.unwrap().len(), 2);

        let err = service
            .get_for(&principal(&bob), &mine.id)
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_patch_lifecycle() {
        let desk = TestDesk::new();
        let alice = desk.user("alice@example.com", Role::User, &[]).await;
        let moderator = desk.user("m@example.com", Role::Moderator, &[]).await;
        let other = desk.user("o@example.com", Role::Moderator, &[]).await;
        let service = service(&desk);
        let ticket = service
            .create(&principal(&alice), new_ticket("Login broken"))
            .await
            .unwrap();

        // users may not patch
        let err = service
            .patch(
                &principal(&alice),
                &ticket.id,
                TicketPatch {
                    status: Some(Status::InProgress),
                    solution: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Forbidden { .. }));

        assign(&desk, &ticket.id, &moderator).await;

        // a moderator only reaches tickets assigned to them
        let err = service
            .patch(
                &principal(&other),
                &ticket.id,
                TicketPatch {
                    status: Some(Status::InProgress),
                    solution: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::NotFound { .. }));

        let err = service
            .patch(
                &principal(&moderator),
                &ticket.id,
                TicketPatch {
                    status: Some(Status::Solved),
                    solution: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::InvalidTransition { .. }));

        let view = service
            .patch(
                &principal(&moderator),
                &ticket.id,
                TicketPatch {
                    status: Some(Status::InProgress),
                    solution: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(view.status, Status::InProgress);

        let view = service
            .patch(
                &principal(&moderator),
                &ticket.id,
                TicketPatch {
                    status: None,
                    solution: Some(" Cleared the stale bundle ".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(view.status, Status::Solved);
        assert_eq!(view.solution.as_deref(), Some("Cleared the stale bundle"));

        let err = service
            .patch(
                &principal(&moderator),
                &ticket.id,
                TicketPatch {
                    status: Some(Status::InProgress),
                    solution: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_retriage_is_admin_only() {
        let desk = TestDesk::new();
        let alice = desk.user("alice@example.com", Role::User, &[]).await;
        let moderator = desk.user("m@example.com", Role::Moderator, &[]).await;
        let admin = desk.user("root@example.com", Role::Admin, &[]).await;
        let service = service(&desk);
        let ticket = service
            .create(&principal(&alice), new_ticket("Login broken"))
            .await
            .unwrap();

        let err = service
            .retriage(&principal(&admin), &ticket.id)
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::InvalidTransition { .. }));

        assign(&desk, &ticket.id, &moderator).await;
        let err = service
            .retriage(&principal(&moderator), &ticket.id)
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Forbidden { .. }));

        service
            .retriage(&principal(&admin), &ticket.id)
            .await
            .unwrap();
        assert_eq!(
            desk.bus.published().await.last(),
            Some(&TicketEvent::Retriage {
                ticket_id: ticket.id
            })
        );
    }
}
