//! Identity and role gate

mod gate;
mod password;
mod token;

pub use gate::{Operation, authorize};
pub use password::{hash_password, verify_password};
pub use token::{Authenticator, Claims, TokenService, bearer_token};
