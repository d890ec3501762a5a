use crate::core::TicketId;
use crate::error::Result;
use crate::events::{EventBus, TicketEvent};
use crate::storage::{FailureLog, TicketRepository};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Re-emits `ticket.created` for tickets stuck in `OPEN`
///
/// Covers events lost to a full queue or a crash between persisting a ticket
/// and publishing its event. Tickets in the failure log already used up
/// their retries and are left for an operator.
#[derive(Clone)]
pub struct Sweeper {
    tickets: Arc<dyn TicketRepository>,
    failures: Arc<dyn FailureLog>,
    bus: Arc<dyn EventBus>,
    stale_after: Duration,
}

impl Sweeper {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        failures: Arc<dyn FailureLog>,
        bus: Arc<dyn EventBus>,
        stale_after: Duration,
    ) -> Self {
        Self {
            tickets,
            failures,
            bus,
            stale_after,
        }
    }

    /// Publish one event per stale ticket; returns how many were published
    pub async fn sweep_once(&self) -> Result<usize> {
        let stale = stale_open_ids(
            self.tickets.as_ref(),
            Some(self.failures.as_ref()),
            self.stale_after,
        )
        .await?;
        let mut published = 0;
        for ticket_id in stale {
            match self.bus.publish(TicketEvent::Created { ticket_id }).await {
                Ok(()) => published += 1,
                Err(e) => {
                    warn!(%ticket_id, error = %e, "Sweep could not publish; stopping this round");
                    break;
                },
            }
        }
        if published > 0 {
            info!(published, "Sweep re-queued stale tickets");
        } else {
            debug!("Sweep found nothing to re-queue");
        }
        Ok(published)
    }

    /// Sweep every `interval` until `shutdown`; a zero interval disables it
    pub async fn run(self, interval: Duration, shutdown: CancellationToken) {
        if interval.is_zero() {
            info!("Periodic sweep disabled");
            return;
        }

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        warn!(error = %e, "Sweep failed");
                    }
                },
            }
        }
        debug!("Sweeper stopped");
    }
}

/// Ids of `OPEN` tickets created more than `age` ago, oldest first
///
/// With a failure log, tickets that already exhausted their retries are
/// skipped.
pub async fn stale_open_ids(
    tickets: &dyn TicketRepository,
    failures: Option<&dyn FailureLog>,
    age: Duration,
) -> Result<Vec<TicketId>> {
    let failed: HashSet<TicketId> = match failures {
        Some(log) => log.failures().await?.into_iter().map(|f| f.ticket_id).collect(),
        None => HashSet::new(),
    };
    let stale: Vec<TicketId> = tickets
        .stale_open(cutoff(Utc::now(), age))
        .await?
        .into_iter()
        .map(|ticket| ticket.id)
        .collect();

    let skipped = stale.iter().filter(|id| failed.contains(id)).count();
    if skipped > 0 {
        debug!(skipped, "Sweep skipped tickets with exhausted retries");
    }
    Ok(stale.into_iter().filter(|id| !failed.contains(id)).collect())
}

fn cutoff(now: DateTime<Utc>, age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
