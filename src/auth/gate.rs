//! Role gate
//!
//! Each operation declares the roles allowed to call it. The gate runs before
//! any repository access.

use crate::core::{Principal, Role};
use crate::error::{Result, TriageError};
use std::fmt;

const ALL_ROLES: &[Role] = &[Role::User, Role::Moderator, Role::Admin];
const STAFF: &[Role] = &[Role::Moderator, Role::Admin];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Gated operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateTicket,
    ListTickets,
    GetTicket,
    PatchTicket,
    RetriageTicket,
    UpdateUser,
    ListUsers,
}

impl Operation {
    /// Roles permitted to perform this operation
    #[must_use]
    pub const fn allowed_roles(self) -> &'static [Role] {
        match self {
            Self::CreateTicket | Self::ListTickets | Self::GetTicket => ALL_ROLES,
            Self::PatchTicket => STAFF,
            Self::RetriageTicket | Self::UpdateUser | Self::ListUsers => ADMIN_ONLY,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateTicket => "create ticket",
            Self::ListTickets => "list tickets",
            Self::GetTicket => "get ticket",
            Self::PatchTicket => "update ticket",
            Self::RetriageTicket => "retriage ticket",
            Self::UpdateUser => "update user",
            Self::ListUsers => "list users",
        }
    }

    /// Check the principal against this operation's allowed roles
    pub fn authorize(self, principal: &Principal) -> Result<()> {
        authorize(principal.role, self.allowed_roles()).map_err(|_| TriageError::Forbidden {
            operation: self.as_str().to_string(),
            role: principal.role.to_string(),
        })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Forbidden` unless `role` is in `allowed`
pub fn authorize(role: Role, allowed: &[Role]) -> Result<()> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(TriageError::Forbidden {
            operation: "operation".to_string(),
            role: role.to_string(),
        })
    }
}
