use super::UserId;
use crate::error::{Result, TriageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Generate a fresh ticket id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight characters, for log lines
    #[must_use]
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TicketId {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| TriageError::ticket_not_found(s))
    }
}

/// Ticket lifecycle status
///
/// `OPEN` tickets belong to the triage worker. The worker performs the single
/// move to `AI_PROCESSED`; after that only moderators and admins move tickets
/// forward, and nothing leaves `SOLVED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Open,
    AiProcessed,
    InProgress,
    Solved,
}

impl Status {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::AiProcessed => "AI_PROCESSED",
            Self::InProgress => "IN_PROGRESS",
            Self::Solved => "SOLVED",
        }
    }

    /// Tickets that count toward a moderator's current load
    #[must_use]
    pub const fn is_open_work(&self) -> bool {
        matches!(self, Self::AiProcessed | Self::InProgress)
    }

    /// Validate a human-requested status change
    ///
    /// `solution` is the solution text supplied in the same update, if any.
    pub fn check_transition(self, to: Self, solution: Option<&str>) -> Result<()> {
        let reject = |reason: &str| {
            Err(TriageError::InvalidTransition {
                from: self,
                to,
                reason: reason.to_string(),
            })
        };

        let has_solution = solution.is_some_and(|s| !s.trim().is_empty());
        match (self, to) {
            (Self::Solved, _) => reject("solved tickets cannot change status"),
            (_, target) if target != Self::Solved && has_solution => {
                reject("a solution can only be given when solving a ticket")
            },
            (Self::AiProcessed | Self::InProgress, Self::Solved) => {
                if has_solution {
                    Ok(())
                } else {
                    reject("a non-empty solution is required to solve a ticket")
                }
            },
            (Self::AiProcessed, Self::InProgress) => Ok(()),
            (Self::Open, _) => reject("ticket has not been triaged yet"),
            (_, Self::Open | Self::AiProcessed) => reject("status is set by triage only"),
            _ => reject("transition is not allowed"),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "OPEN" => Ok(Self::Open),
            "AI_PROCESSED" => Ok(Self::AiProcessed),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "SOLVED" => Ok(Self::Solved),
            other => Err(TriageError::validation(format!("Unknown status '{other}'"))),
        }
    }
}

/// Priority assigned by the AI labeling service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Parse labels as the AI service tends to emit them ("High", "urgent", ...)
    #[must_use]
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" | "minor" => Some(Self::Low),
            "medium" | "normal" | "moderate" => Some(Self::Medium),
            "high" | "major" => Some(Self::High),
            "critical" | "urgent" | "blocker" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// A support ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub created_by: UserId,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub helpful_notes: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub solution: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Create an `OPEN` ticket with empty enrichment fields
    #[must_use]
    pub fn new(title: String, description: String, created_by: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: TicketId::new(),
            title,
            description,
            status: Status::Open,
            created_by,
            assigned_to: None,
            summary: None,
            required_skills: Vec::new(),
            helpful_notes: None,
            priority: None,
            solution: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, update: TicketUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(solution) = update.solution {
            self.solution = Some(solution);
        }
        if let Some(assigned_to) = update.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(summary) = update.summary {
            self.summary = Some(summary);
        }
        if let Some(skills) = update.required_skills {
            self.required_skills = skills;
        }
        if let Some(notes) = update.helpful_notes {
            self.helpful_notes = Some(notes);
        }
        if let Some(priority) = update.priority {
            self.priority = Some(priority);
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update of the mutable ticket fields
///
/// Title, description, creator and creation time are not representable here
/// and therefore cannot change after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketUpdate {
    pub status: Option<Status>,
    pub solution: Option<String>,
    /// `Some(None)` clears the assignee
    pub assigned_to: Option<Option<UserId>>,
    pub summary: Option<String>,
    pub required_skills: Option<Vec<String>>,
    pub helpful_notes: Option<String>,
    pub priority: Option<Priority>,
}

impl TicketUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Precondition checked atomically with an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateGuard {
    /// Apply unconditionally
    Any,
    /// Apply only while the ticket is in one of these states
    StatusIn(Vec<Status>),
}

impl UpdateGuard {
    #[must_use]
    pub fn status(status: Status) -> Self {
        Self::StatusIn(vec![status])
    }

    #[must_use]
    pub fn permits(&self, status: Status) -> bool {
        match self {
            Self::Any => true,
            Self::StatusIn(allowed) => allowed.contains(&status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ticket_is_open_and_unassigned() {
        let ticket = Ticket::new("Login broken".into(), "blank screen".into(), UserId::new());
        assert_eq!(ticket.status, Status::Open);
        assert!(ticket.assigned_to.is_none());
        assert!(ticket.required_skills.is_empty());
    }

    #[test]
    fn test_status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&Status::AiProcessed).unwrap();
        assert_eq!(json, "\"AI_PROCESSED\"");
        let parsed: Status = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(parsed, Status::InProgress);
        assert_eq!("in-progress".parse::<Status>().unwrap(), Status::InProgress);
    }

    #[test]
    fn test_allowed_transitions() {
        assert!(Status::AiProcessed.check_transition(Status::InProgress, None).is_ok());
        assert!(
            Status::AiProcessed
                .check_transition(Status::Solved, Some("restarted the pod"))
                .is_ok()
        );
        assert!(
            Status::InProgress
                .check_transition(Status::Solved, Some("fixed"))
                .is_ok()
        );
    }

    #[test]
    fn test_solving_requires_solution() {
        for solution in [None, Some(""), Some("   ")] {
            let err = Status::InProgress
                .check_transition(Status::Solved, solution)
                .unwrap_err();
            assert!(matches!(err, TriageError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_solution_only_allowed_when_solving() {
        let err = Status::AiProcessed
            .check_transition(Status::InProgress, Some("restart it"))
            .unwrap_err();
        assert!(matches!(
            err,
            TriageError::InvalidTransition {
                to: Status::InProgress,
                ..
            }
        ));
        assert!(
            Status::AiProcessed
                .check_transition(Status::InProgress, Some("  "))
                .is_ok()
        );
    }

    #[test]
    fn test_no_transition_out_of_solved() {
        for to in [Status::Open, Status::AiProcessed, Status::InProgress, Status::Solved] {
            assert!(Status::Solved.check_transition(to, Some("again")).is_err());
        }
    }

    #[test]
    fn test_open_and_backward_transitions_rejected() {
        assert!(Status::Open.check_transition(Status::InProgress, None).is_err());
        assert!(Status::Open.check_transition(Status::Solved, Some("x")).is_err());
        assert!(Status::InProgress.check_transition(Status::AiProcessed, None).is_err());
        assert!(Status::InProgress.check_transition(Status::Open, None).is_err());
        assert!(Status::InProgress.check_transition(Status::InProgress, None).is_err());
    }

    #[test]
    fn test_apply_update_only_touches_given_fields() {
        let mut ticket = Ticket::new("t".into(), "d".into(), UserId::new());
        let moderator = UserId::new();
        ticket.apply(TicketUpdate {
            status: Some(Status::AiProcessed),
            assigned_to: Some(Some(moderator)),
            ..TicketUpdate::default()
        });
        assert_eq!(ticket.status, Status::AiProcessed);
        assert_eq!(ticket.assigned_to, Some(moderator));
        assert_eq!(ticket.title, "t");
        assert!(ticket.solution.is_none());
    }

    #[test]
    fn test_priority_lenient_parse() {
        assert_eq!(Priority::parse_lenient("High"), Some(Priority::High));
        assert_eq!(Priority::parse_lenient(" urgent "), Some(Priority::Critical));
        assert_eq!(Priority::parse_lenient("whenever"), None);
    }

    #[test]
    fn test_update_guard() {
        let guard = UpdateGuard::status(Status::Open);
        assert!(guard.permits(Status::Open));
        assert!(!guard.permits(Status::AiProcessed));
        assert!(UpdateGuard::Any.permits(Status::Solved));
    }
}
