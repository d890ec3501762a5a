use super::SharedState;
use super::extract::Caller;
use crate::auth::Operation;
use crate::core::TicketId;
use crate::error::TriageError;
use crate::service::{Credentials, NewTicket, Signup, TicketPatch, UserChange};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{Value, json};

type ApiResult<T> = Result<T, TriageError>;

// Handlers check the role gate before parsing path ids or bodies.

pub fn auth_routes() -> Router<SharedState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/updateuser", patch(update_user).post(update_user))
        .route("/auth/getusers", get(get_users))
}

pub fn ticket_routes() -> Router<SharedState> {
    Router::new()
        .route("/tickets", post(create_ticket).get(list_tickets))
        .route("/tickets/:id", get(get_ticket).patch(patch_ticket))
        .route("/tickets/:id/retriage", post(retriage_ticket))
}

pub fn health_routes() -> Router<SharedState> {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ============================================================================
// Auth
// ============================================================================

async fn signup(
    State(state): State<SharedState>,
    payload: Result<Json<Signup>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(body) = payload?;
    let user = state.users.signup(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created", "user": user })),
    ))
}

async fn login(
    State(state): State<SharedState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let session = state.users.login(body).await?;
    Ok(Json(json!({ "token": session.token, "user": session.user })))
}

async fn update_user(
    State(state): State<SharedState>,
    Caller(principal): Caller,
    payload: Result<Json<UserChange>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    Operation::UpdateUser.authorize(&principal)?;
    let Json(body) = payload?;
    let user = state.users.update_user(&principal, body).await?;
    Ok(Json(json!({ "message": "User updated", "user": user })))
}

async fn get_users(
    State(state): State<SharedState>,
    Caller(principal): Caller,
) -> ApiResult<Json<Value>> {
    let users = state.users.list_users(&principal).await?;
    Ok(Json(json!({ "users": users })))
}

// ============================================================================
// Tickets
// ============================================================================

async fn create_ticket(
    State(state): State<SharedState>,
    Caller(principal): Caller,
    payload: Result<Json<NewTicket>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    Operation::CreateTicket.authorize(&principal)?;
    let Json(body) = payload?;
    let ticket = state.tickets.create(&principal, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Ticket created and queued for triage", "ticket": ticket })),
    ))
}

async fn list_tickets(
    State(state): State<SharedState>,
    Caller(principal): Caller,
) -> ApiResult<Json<Value>> {
    let tickets = state.tickets.list_for(&principal).await?;
    Ok(Json(json!({ "tickets": tickets })))
}

async fn get_ticket(
    State(state): State<SharedState>,
    Caller(principal): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    Operation::GetTicket.authorize(&principal)?;
    let id: TicketId = id.parse()?;
    let ticket = state.tickets.get_for(&principal, &id).await?;
    Ok(Json(json!({ "ticket": ticket })))
}

async fn patch_ticket(
    State(state): State<SharedState>,
    Caller(principal): Caller,
    Path(id): Path<String>,
    payload: Result<Json<TicketPatch>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    Operation::PatchTicket.authorize(&principal)?;
    let id: TicketId = id.parse()?;
    let Json(body) = payload?;
    let ticket = state.tickets.patch(&principal, &id, body).await?;
    Ok(Json(json!({ "message": "Ticket updated", "ticket": ticket })))
}

async fn retriage_ticket(
    State(state): State<SharedState>,
    Caller(principal): Caller,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    Operation::RetriageTicket.authorize(&principal)?;
    let id: TicketId = id.parse()?;
    state.tickets.retriage(&principal, &id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Ticket queued for re-triage" })),
    ))
}
