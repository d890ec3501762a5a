//! Core domain types: tickets, users, roles and skill tags

mod builders;
pub mod skills;
mod ticket;
mod user;

pub use builders::{TicketBuilder, UserBuilder};
pub use ticket::{Priority, Status, Ticket, TicketId, TicketUpdate, UpdateGuard};
pub use user::{AssigneeSummary, Principal, Role, User, UserId, UserProfile};
