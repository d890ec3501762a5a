use super::retry::{GaveUp, RetryPolicy, with_deadline};
use crate::ai::{Analysis, Analyzer};
use crate::config::{AiConfig, TriageConfig};
use crate::core::{Status, Ticket, TicketId, TicketUpdate, UpdateGuard, UserId};
use crate::error::TriageError;
use crate::events::TicketEvent;
use crate::matcher::SkillMatcher;
use crate::storage::{FailureLog, TicketRepository, TriageFailure, UserRepository};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// What a triage run did with its ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriageOutcome {
    /// Enrichment stored and assignment decided
    Triaged { assigned_to: Option<UserId> },
    /// Nothing to do: replay, vanished ticket, or a concurrent human edit
    Unchanged { reason: &'static str },
    /// Retries exhausted; the ticket keeps its previous state
    GaveUp { attempts: u32 },
}

/// Enrichment and assignment of a single ticket
///
/// Each step is retried on its own under the configured [`RetryPolicy`] and
/// every write is a conditional update on the status the run started from,
/// so a human edit made in the meantime is never overwritten.
#[derive(Clone)]
pub struct Triage {
    tickets: Arc<dyn TicketRepository>,
    analyzer: Arc<dyn Analyzer>,
    matcher: SkillMatcher,
    failures: Arc<dyn FailureLog>,
    retry: RetryPolicy,
    ai_timeout: Duration,
    store_timeout: Duration,
}

impl Triage {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        users: Arc<dyn UserRepository>,
        analyzer: Arc<dyn Analyzer>,
        failures: Arc<dyn FailureLog>,
    ) -> Self {
        let defaults = TriageConfig::default();
        Self {
            matcher: SkillMatcher::new(users, tickets.clone()),
            tickets,
            analyzer,
            failures,
            retry: RetryPolicy::from_config(&defaults),
            ai_timeout: AiConfig::default().timeout(),
            store_timeout: Duration::from_millis(defaults.store_timeout_ms),
        }
    }

    /// Apply timeouts, retry policy and matcher fallback from configuration
    #[must_use]
    pub fn configure(mut self, triage: &TriageConfig, ai: &AiConfig) -> Self {
        self.retry = RetryPolicy::from_config(triage);
        self.ai_timeout = ai.timeout();
        self.store_timeout = Duration::from_millis(triage.store_timeout_ms);
        self.matcher = self.matcher.with_fallback(triage.fallback_to_least_loaded);
        self
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Process one event to completion
    ///
    /// Never fails: conflicts and replays are acknowledged, exhausted retries
    /// are logged and written to the failure log.
    pub async fn handle(&self, event: TicketEvent) -> TriageOutcome {
        let ticket_id = event.ticket_id();
        let result = match event {
            TicketEvent::Created { .. } => self.triage_new(ticket_id).await,
            TicketEvent::Retriage { .. } => self.retriage(ticket_id).await,
        };

        match result {
            Ok(outcome) => outcome,
            Err(GaveUp {
                error: TriageError::Conflict { actual, .. },
                ..
            }) => {
                info!(%ticket_id, status = %actual, "Ticket changed during triage; leaving it as is");
                TriageOutcome::Unchanged {
                    reason: "concurrent update",
                }
            },
            Err(GaveUp { attempts, error }) => {
                error!(%ticket_id, attempts, error = %error, "Triage gave up");
                let failure = TriageFailure {
                    ticket_id,
                    attempts,
                    error: error.to_string(),
                    failed_at: Utc::now(),
                };
                if let Err(log_err) = self.failures.record_failure(&failure).await {
                    error!(%ticket_id, error = %log_err, "Failed to record triage failure");
                }
                TriageOutcome::GaveUp { attempts }
            },
        }
    }

    async fn triage_new(&self, id: TicketId) -> Result<TriageOutcome, GaveUp> {
        let Some(ticket) = self.load(id).await? else {
            return Ok(missing(id));
        };
        if ticket.status != Status::Open {
            debug!(ticket_id = %id, status = %ticket.status, "Replayed event for a triaged ticket");
            return Ok(TriageOutcome::Unchanged {
                reason: "already triaged",
            });
        }

        // Enrichment left by an earlier run that stopped before assigning is
        // overwritten with the fresh result
        let analysis = self.analyze(&ticket).await?;
        self.store(id, Status::Open, enrichment(&analysis)).await?;
        debug!(ticket_id = %id, skills = ?analysis.required_skills, "Enrichment stored");

        let assignee = self.pick_moderator(&analysis).await?;
        self.store(
            id,
            Status::Open,
            TicketUpdate {
                status: Some(Status::AiProcessed),
                assigned_to: Some(assignee),
                ..TicketUpdate::default()
            },
        )
        .await?;

        info!(ticket_id = %id, assigned_to = ?assignee, "Ticket triaged");
        Ok(TriageOutcome::Triaged {
            assigned_to: assignee,
        })
    }

    async fn retriage(&self, id: TicketId) -> Result<TriageOutcome, GaveUp> {
        let Some(ticket) = self.load(id).await? else {
            return Ok(missing(id));
        };
        if ticket.status != Status::AiProcessed {
            debug!(ticket_id = %id, status = %ticket.status, "Retriage skipped; ticket is being worked on");
            return Ok(TriageOutcome::Unchanged {
                reason: "not awaiting pickup",
            });
        }

        let analysis = self.analyze(&ticket).await?;
        let assignee = self.pick_moderator(&analysis).await?;
        self.store(
            id,
            Status::AiProcessed,
            TicketUpdate {
                assigned_to: Some(assignee),
                ..enrichment(&analysis)
            },
        )
        .await?;

        info!(ticket_id = %id, assigned_to = ?assignee, "Ticket re-triaged");
        Ok(TriageOutcome::Triaged {
            assigned_to: assignee,
        })
    }

    async fn load(&self, id: TicketId) -> Result<Option<Ticket>, GaveUp> {
        let tickets = self.tickets.as_ref();
        self.retry
            .run("load ticket", || {
                with_deadline("load ticket", self.store_timeout, tickets.find(&id))
            })
            .await
    }

    async fn analyze(&self, ticket: &Ticket) -> Result<Analysis, GaveUp> {
        let analyzer = self.analyzer.as_ref();
        self.retry
            .run("analyze", || {
                with_deadline(
                    "AI labeling",
                    self.ai_timeout,
                    analyzer.analyze(&ticket.title, &ticket.description),
                )
            })
            .await
            .map(Analysis::normalized)
    }

    async fn pick_moderator(&self, analysis: &Analysis) -> Result<Option<UserId>, GaveUp> {
        let matcher = &self.matcher;
        let required = analysis.required_skills.as_slice();
        self.retry
            .run("match moderator", || {
                with_deadline("match moderator", self.store_timeout, matcher.assign(required))
            })
            .await
    }

    async fn store(&self, id: TicketId, expected: Status, update: TicketUpdate) -> Result<(), GaveUp> {
        let tickets = self.tickets.as_ref();
        let update = &update;
        self.retry
            .run("update ticket", || {
                with_deadline(
                    "update ticket",
                    self.store_timeout,
                    tickets.update(&id, UpdateGuard::status(expected), update.clone()),
                )
            })
            .await
            .map(|_| ())
    }
}

fn missing(id: TicketId) -> TriageOutcome {
    debug!(ticket_id = %id, "Event for unknown ticket ignored");
    TriageOutcome::Unchanged {
        reason: "unknown ticket",
    }
}

/// Enrichment fields; skills overwrite any previous value
fn enrichment(analysis: &Analysis) -> TicketUpdate {
    TicketUpdate {
        summary: Some(analysis.summary.clone()).filter(|s| !s.is_empty()),
        required_skills: Some(analysis.required_skills.clone()),
        helpful_notes: Some(analysis.helpful_notes.clone()).filter(|s| !s.is_empty()),
        priority: analysis.priority,
        ..TicketUpdate::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockAnalyzer;
    use crate::core::{Priority, Role, UserBuilder};
    use crate::storage::FileStorage;
    use tempfile::TempDir;

    fn analysis(skills: &[&str]) -> Analysis {
        Analysis {
            summary: "Login page renders blank".into(),
            required_skills: skills.iter().map(|s| (*s).to_string()).collect(),
            helpful_notes: "Check the CSS bundle".into(),
            priority: Some(Priority::High),
        }
    }

    async fn setup(analyzer: MockAnalyzer) -> (TempDir, Arc<FileStorage>, Triage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(FileStorage::new(temp_dir.path()));
        let triage = Triage::new(
            storage.clone(),
            storage.clone(),
            Arc::new(analyzer),
            storage.clone(),
        )
        .with_retry(RetryPolicy::immediate(3));
        (temp_dir, storage, triage)
    }

    #[tokio::test]
    async fn test_triage_assigns_best_moderator() {
        let mut analyzer = MockAnalyzer::new();
        analyzer
            .expect_analyze()
            .returning(|_, _| Ok(analysis(&["React", "react", "CSS"])));
        let (_temp_dir, storage, triage) = setup(analyzer).await;

        let moderator = storage
            .create_user(
                UserBuilder::new()
                    .role(Role::Moderator)
                    .skills(["React", "CSS", "Node"])
                    .build(),
            )
            .await
            .unwrap();
        let ticket = storage
            .create("Login broken".into(), "Blank screen".into(), UserId::new())
            .await
            .unwrap();

        let outcome = triage
            .handle(TicketEvent::Created {
                ticket_id: ticket.id,
            })
            .await;
        assert_eq!(
            outcome,
            TriageOutcome::Triaged {
                assigned_to: Some(moderator.id)
            }
        );

        let stored = storage.find(&ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::AiProcessed);
        assert_eq!(stored.assigned_to, Some(moderator.id));
        assert_eq!(stored.required_skills, vec!["React", "CSS"]);
        assert_eq!(stored.priority, Some(Priority::High));
    }

    #[tokio::test]
    async fn test_replay_is_acknowledged_without_changes() {
        let mut analyzer = MockAnalyzer::new();
        analyzer
            .expect_analyze()
            .times(1)
            .returning(|_, _| Ok(analysis(&["Go"])));
        let (_temp_dir, storage, triage) = setup(analyzer).await;

        let ticket = storage
            .create("t".into(), "d".into(), UserId::new())
            .await
            .unwrap();
        let event = TicketEvent::Created {
            ticket_id: ticket.id,
        };
        triage.handle(event).await;
        let first = storage.find(&ticket.id).await.unwrap().unwrap();

        let outcome = triage.handle(event).await;
        assert!(matches!(outcome, TriageOutcome::Unchanged { .. }));
        let second = storage.find(&ticket.id).await.unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_exhausted_retries_leave_ticket_open() {
        let mut analyzer = MockAnalyzer::new();
        analyzer
            .expect_analyze()
            .times(3)
            .returning(|_, _| Err(TriageError::UpstreamUnavailable("AI down".into())));
        let (_temp_dir, storage, triage) = setup(analyzer).await;

        let ticket = storage
            .create("t".into(), "d".into(), UserId::new())
            .await
            .unwrap();
        let outcome = triage
            .handle(TicketEvent::Created {
                ticket_id: ticket.id,
            })
            .await;
        assert_eq!(outcome, TriageOutcome::GaveUp { attempts: 3 });

        let stored = storage.find(&ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::Open);
        assert_eq!(stored.assigned_to, None);

        let failures = storage.failures().await.unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].ticket_id, ticket.id);
        assert_eq!(failures[0].attempts, 3);
    }

    #[tokio::test]
    async fn test_open_ticket_with_stale_enrichment_is_reanalyzed() {
        let mut analyzer = MockAnalyzer::new();
        analyzer
            .expect_analyze()
            .times(1)
            .returning(|_, _| Ok(analysis(&["Go"])));
        let (_temp_dir, storage, triage) = setup(analyzer).await;

        let _css = storage
            .create_user(UserBuilder::new().role(Role::Moderator).skills(["CSS"]).build())
            .await
            .unwrap();
        let moderator = storage
            .create_user(UserBuilder::new().role(Role::Moderator).skills(["go"]).build())
            .await
            .unwrap();
        let ticket = storage
            .create("t".into(), "d".into(), UserId::new())
            .await
            .unwrap();
        storage
            .update(&ticket.id, UpdateGuard::Any, enrichment(&analysis(&["css"])))
            .await
            .unwrap();

        let outcome = triage
            .handle(TicketEvent::Created {
                ticket_id: ticket.id,
            })
            .await;
        assert_eq!(
            outcome,
            TriageOutcome::Triaged {
                assigned_to: Some(moderator.id)
            }
        );
        let stored = storage.find(&ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.required_skills, vec!["Go".to_string()]);
    }

    #[tokio::test]
    async fn test_no_moderators_leaves_ticket_unassigned() {
        let mut analyzer = MockAnalyzer::new();
        analyzer
            .expect_analyze()
            .returning(|_, _| Ok(analysis(&["React"])));
        let (_temp_dir, storage, triage) = setup(analyzer).await;

        let ticket = storage
            .create("t".into(), "d".into(), UserId::new())
            .await
            .unwrap();
        let outcome = triage
            .handle(TicketEvent::Created {
                ticket_id: ticket.id,
            })
            .await;
        assert_eq!(outcome, TriageOutcome::Triaged { assigned_to: None });

        let stored = storage.find(&ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::AiProcessed);
        assert_eq!(stored.assigned_to, None);
    }

    #[tokio::test]
    async fn test_retriage_only_touches_ai_processed() {
        let mut analyzer = MockAnalyzer::new();
        analyzer
            .expect_analyze()
            .returning(|_, _| Ok(analysis(&["Postgres"])));
        let (_temp_dir, storage, triage) = setup(analyzer).await;

        let dba = storage
            .create_user(
                UserBuilder::new()
                    .role(Role::Moderator)
                    .skills(["Postgres"])
                    .build(),
            )
            .await
            .unwrap();
        let ticket = storage
            .create("t".into(), "d".into(), UserId::new())
            .await
            .unwrap();

        // still OPEN: retriage does nothing
        let outcome = triage
            .handle(TicketEvent::Retriage {
                ticket_id: ticket.id,
            })
            .await;
        assert!(matches!(outcome, TriageOutcome::Unchanged { .. }));

        storage
            .update(
                &ticket.id,
                UpdateGuard::Any,
                TicketUpdate {
                    status: Some(Status::AiProcessed),
                    required_skills: Some(vec!["Cobol".into()]),
                    ..TicketUpdate::default()
                },
            )
            .await
            .unwrap();
        let outcome = triage
            .handle(TicketEvent::Retriage {
                ticket_id: ticket.id,
            })
            .await;
        assert_eq!(
            outcome,
            TriageOutcome::Triaged {
                assigned_to: Some(dba.id)
            }
        );
        let stored = storage.find(&ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::AiProcessed);
        assert_eq!(stored.required_skills, vec!["Postgres"]);
    }
}
