//! Bearer authentication for `/chat`.
//!
//! Rejections happen here, before the handler runs, so an unauthenticated
//! request never reaches the resolver or touches any cache.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::extractors::AuthenticatedUser;
use crate::api::state::AppState;
use crate::error::OraculoError;

pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(h) if h.starts_with("Bearer ") => h[7..].trim().to_string(),
        Some(_) => {
            return OraculoError::Unauthenticated(
                "Invalid authorization header format. Expected: Bearer <token>".to_string(),
            )
            .into_response();
        }
        None => {
            return OraculoError::Unauthenticated("Missing authorization header".to_string())
                .into_response();
        }
    };

    if token.is_empty() {
        return OraculoError::Unauthenticated("Empty bearer token".to_string()).into_response();
    }

    match state.verifier.verify(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(AuthenticatedUser(user));
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            e.into_response()
        }
    }
}
