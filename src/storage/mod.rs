//! Document storage for tickets and users

mod file;
mod repository;

pub use file::FileStorage;
pub use repository::{
    FailureLog, TicketRepository, TicketScope, TicketView, TriageFailure, UserRepository,
    join_assignee, join_assignees,
};
