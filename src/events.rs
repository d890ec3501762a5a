//! Triage event bus
//!
//! Ticket creation hands work to the triage worker through this boundary.
//! Delivery is at-least-once: the same ticket id may arrive more than once
//! (client retries, sweeps), and the consumer is idempotent.

use crate::core::TicketId;
use crate::error::{Result, TriageError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events consumed by the triage worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum TicketEvent {
    /// A ticket was created and needs triage
    #[serde(rename = "ticket.created", rename_all = "camelCase")]
    Created { ticket_id: TicketId },
    /// An admin asked for an already-processed ticket to be triaged again
    #[serde(rename = "ticket.retriage", rename_all = "camelCase")]
    Retriage { ticket_id: TicketId },
}

impl TicketEvent {
    #[must_use]
    pub const fn ticket_id(&self) -> TicketId {
        match self {
            Self::Created { ticket_id } | Self::Retriage { ticket_id } => *ticket_id,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "ticket.created",
            Self::Retriage { .. } => "ticket.retriage",
        }
    }
}

/// Publisher side of the event boundary
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Enqueue an event; fails with `UpstreamUnavailable` if it cannot be accepted
    async fn publish(&self, event: TicketEvent) -> Result<()>;
}

/// Bounded in-process queue feeding the triage worker
#[derive(Debug, Clone)]
pub struct ChannelBus {
    sender: mpsc::Sender<TicketEvent>,
}

impl ChannelBus {
    /// Create a bus and the receiver the worker consumes
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TicketEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventBus for ChannelBus {
    async fn publish(&self, event: TicketEvent) -> Result<()> {
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                TriageError::UpstreamUnavailable("triage queue is full".to_string())
            },
            mpsc::error::TrySendError::Closed(_) => {
                TriageError::UpstreamUnavailable("triage worker is not running".to_string())
            },
        })?;
        tracing::debug!(event = event.name(), ticket_id = %event.ticket_id(), "Event published");
        Ok(())
    }
}
