use super::pipeline::{Triage, TriageOutcome};
use crate::core::TicketId;
use crate::events::TicketEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

/// Per-ticket async locks, so two runs for one ticket never interleave
#[derive(Clone, Default)]
struct TicketLocks {
    inner: Arc<Mutex<HashMap<TicketId, Arc<Mutex<()>>>>>,
}

impl TicketLocks {
    async fn entry(&self, id: TicketId) -> Arc<Mutex<()>> {
        self.inner.lock().await.entry(id).or_default().clone()
    }

    /// Drop the entry once nobody else is waiting on it
    async fn release(&self, id: TicketId) {
        let mut locks = self.inner.lock().await;
        if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&id);
        }
    }
}

/// Consumes triage events with bounded concurrency
#[derive(Clone)]
pub struct TriageWorker {
    triage: Triage,
    permits: Arc<Semaphore>,
    workers: usize,
    locks: TicketLocks,
}

impl TriageWorker {
    #[must_use]
    pub fn new(triage: Triage, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            triage,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            locks: TicketLocks::default(),
        }
    }

    /// Process one event while holding its ticket's lock
    pub async fn process(&self, event: TicketEvent) -> TriageOutcome {
        let ticket_id = event.ticket_id();
        let lock = self.locks.entry(ticket_id).await;
        let outcome = {
            let _guard = lock.lock().await;
            debug!(%ticket_id, event = event.name(), "Triage run started");
            self.triage.handle(event).await
        };
        drop(lock);
        self.locks.release(ticket_id).await;
        outcome
    }

    /// Consume `events` until the channel closes or `shutdown` fires, then
    /// wait for in-flight runs
    pub async fn run(self, mut events: mpsc::Receiver<TicketEvent>, shutdown: CancellationToken) {
        let tracker = TaskTracker::new();
        info!(workers = self.workers, "Triage worker started");

        loop {
            let event = tokio::select! {
                () = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let Ok(permit) = self.permits.clone().acquire_owned().await else {
                break;
            };
            let worker = self.clone();
            tracker.spawn(async move {
                let _permit = permit;
                worker.process(event).await;
            });
        }

        tracker.close();
        if !tracker.is_empty() {
            info!(in_flight = tracker.len(), "Waiting for in-flight triage runs");
        }
        tracker.wait().await;
        info!("Triage worker stopped");
    }
}
