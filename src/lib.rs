//! ticket-triage - support-ticket tracker with asynchronous AI triage
//!
//! Tickets are created through the HTTP API and handed to a background
//! worker over an event queue. The worker asks an AI labeling service for a
//! summary, required skills and a priority, then routes the ticket to the
//! moderator whose skills match best. Moderators and admins move the ticket
//! to `IN_PROGRESS` and `SOLVED` from there.
//!
//! - [`api`]: axum router and handlers
//! - [`service`]: role-gated ticket and account operations
//! - [`triage`]: event consumer, retry policy and stale-ticket sweep
//! - [`matcher`]: moderator selection
//! - [`storage`]: repository traits and the YAML file backend
//!
//! # Example
//!
//! ```rust,ignore
//! use ticket_triage::storage::{FileStorage, TicketRepository};
//! use ticket_triage::core::UserId;
//!
//! let storage = FileStorage::new("/var/lib/ticket-triage");
//! let ticket = storage
//!     .create("Login broken".into(), "Blank screen after login".into(), UserId::new())
//!     .await?;
//! assert!(ticket.assigned_to.is_none());
//! ```

// Allow missing error documentation for internal implementations
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::items_after_statements)]

pub mod ai;
pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod matcher;
pub mod service;
pub mod storage;
pub mod triage;

#[cfg(test)]
pub mod test_utils;

pub use error::{Result, TriageError};
