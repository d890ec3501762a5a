//! Command handlers

mod common;
mod config;
mod serve;
mod sweep;
mod user;

pub use common::HandlerContext;
pub use config::handle_config_show;
pub use serve::handle_serve;
pub use sweep::handle_sweep;
pub use user::{handle_user_list, handle_user_set_role};
