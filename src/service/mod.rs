//! Request-side operations
//!
//! Every call takes the caller's [`Principal`](crate::core::Principal)
//! explicitly and runs the role gate before touching storage.

mod tickets;
mod users;

pub use tickets::{NewTicket, TicketPatch, TicketService};
pub use users::{Credentials, Session, Signup, UserChange, UserService};
