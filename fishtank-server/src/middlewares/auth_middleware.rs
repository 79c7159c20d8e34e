use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, Header};
use serde::Deserialize;

use crate::errors::{ApiError, AuthError};
use crate::services::TokenService;

#[derive(Clone)]
pub struct TokenState {
    pub token_service: Arc<TokenService>,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Accepts `Authorization: Bearer <jwt>` or, for clients that can not set
/// headers, a `token` query parameter.
pub async fn auth(
    State(state): State<TokenState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let mut headers = req
        .headers()
        .get_all(header::AUTHORIZATION)
        .iter();

    let token = match Authorization::<Bearer>::decode(&mut headers) {
        Ok(header) => header.token().to_string(),
        Err(_) => Query::<TokenQuery>::try_from_uri(req.uri())
            .ok()
            .and_then(|Query(query)| query.token)
            .ok_or(AuthError::MissingToken)?,
    };

    let token_data = state
        .token_service
        .retrieve_token_claims(&token)
        .map_err(|_| AuthError::InvalidToken)?;

    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}
