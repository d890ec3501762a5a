use super::SharedState;
use crate::core::Principal;
use crate::error::TriageError;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// Authenticated caller, resolved from the bearer token
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Principal);

#[async_trait]
impl FromRequestParts<SharedState> for Caller {
    type Rejection = TriageError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| value.to_str())
            .transpose()
            .map_err(|_| TriageError::Unauthenticated("Invalid authorization format".to_string()))?;

        state.auth.authenticate_header(header).await.map(Self)
    }
}
