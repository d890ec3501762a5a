//! HTTP/JSON API
//!
//! Thin axum layer over the services: it resolves the bearer token into a
//! [`Principal`](crate::core::Principal), hands it to the service call and
//! renders the result or a `{message}` error body.

mod error;
mod extract;
mod routes;

pub use extract::Caller;

use crate::auth::{Authenticator, TokenService};
use crate::error::Result;
use crate::events::EventBus;
use crate::service::{TicketService, UserService};
use crate::storage::{TicketRepository, UserRepository};
use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state available to every handler
pub struct AppState {
    pub auth: Authenticator,
    pub tickets: TicketService,
    pub users: UserService,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        users: Arc<dyn UserRepository>,
        bus: Arc<dyn EventBus>,
        tokens: TokenService,
    ) -> Self {
        Self {
            auth: Authenticator::new(tokens.clone(), users.clone()),
            tickets: TicketService::new(tickets, users.clone(), bus),
            users: UserService::new(users, tokens),
        }
    }
}

/// Build the application router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::auth_routes())
        .merge(routes::ticket_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve the API on `host:port` until `shutdown` is cancelled
pub async fn serve(
    host: &str,
    port: u16,
    state: SharedState,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, "HTTP API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("HTTP API stopped");
    Ok(())
}
