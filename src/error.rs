//! Error types for ticket-triage
//!
//! A single error enum covers the request layer, the triage worker and the
//! storage backend. Each variant knows which HTTP status it maps to, whether
//! the worker should retry it, and what message is safe to show a client.

use crate::core::Status;
use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, TriageError>;

/// Main error type for ticket-triage
#[derive(Error, Debug)]
pub enum TriageError {
    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing, malformed or expired bearer token
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Caller role is not in the operation's allowed set
    #[error("Forbidden: {operation} is not permitted for role '{role}'")]
    Forbidden { operation: String, role: String },

    /// Unknown id, or an id outside the caller's scope
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Illegal status change
    #[error("Invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: Status,
        to: Status,
        reason: String,
    },

    /// A conditional update found the document in an unexpected state
    #[error("Ticket {id} changed concurrently (status is now {actual})")]
    Conflict { id: String, actual: Status },

    /// Unique constraint violated
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// AI collaborator or event bus unreachable
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A suspending operation exceeded its deadline
    #[error("Timed out after {millis}ms: {operation}")]
    Timeout { operation: String, millis: u64 },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML document errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token signing errors
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Password hashing errors
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

impl TriageError {
    /// Create a custom error
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not-found error for a ticket id
    pub fn ticket_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "Ticket",
            id: id.to_string(),
        }
    }

    /// Create a not-found error for a user id or email
    pub fn user_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "User",
            id: id.to_string(),
        }
    }

    /// Whether the triage worker should retry the failed step
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable(_) | Self::Timeout { .. } | Self::Io(_)
        )
    }

    /// Whether this error comes from configuration
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Whether this error is caused by the client rather than the server
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Unauthenticated(_)
                | Self::Forbidden { .. }
                | Self::NotFound { .. }
                | Self::InvalidTransition { .. }
                | Self::Conflict { .. }
                | Self::AlreadyExists(_)
        )
    }

    /// Message that is safe to return to an API client
    ///
    /// Client errors carry their own description. Anything else is reported
    /// generically so storage paths and upstream details do not leak.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Unauthenticated(msg) => msg.clone(),
            Self::Forbidden { .. } => "You are not authorized to perform this action".to_string(),
            Self::NotFound { kind, .. } => format!("No {} found", kind.to_lowercase()),
            Self::InvalidTransition { .. } | Self::Conflict { .. } | Self::AlreadyExists(_) => {
                self.to_string()
            },
            Self::UpstreamUnavailable(_) | Self::Timeout { .. } => {
                "A dependent service is temporarily unavailable".to_string()
            },
            _ => "Internal server error".to_string(),
        }
    }

    /// Get suggestions for resolving the error on the command line
    #[must_use]
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(_) => vec![
                "Check the file passed with --config".to_string(),
                "Environment overrides use the TRIAGE__SECTION__KEY form".to_string(),
            ],
            Self::NotFound { kind: "User", .. } => {
                vec!["Run 'ticket-triage user list' to see registered emails".to_string()]
            },
            Self::Io(_) => vec!["Check that the storage data_dir is writable".to_string()],
            Self::UpstreamUnavailable(_) | Self::Timeout { .. } => {
                vec!["Verify the ai.endpoint setting and that the service is reachable".to_string()]
            },
            _ => vec![],
        }
    }
}

impl From<config::ConfigError> for TriageError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<reqwest::Error> for TriageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                operation: "AI labeling request".to_string(),
                millis: 0,
            }
        } else {
            Self::UpstreamUnavailable(err.to_string())
        }
    }
}
