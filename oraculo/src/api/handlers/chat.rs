use axum::{extract::State, Json};

use crate::api::dto::{ChatRequest, ChatResponse, ErrorBody};
use crate::api::extractors::{AppJson, AuthenticatedUser};
use crate::api::state::AppState;
use crate::error::Result;

/// `POST /chat`
///
/// Provider failures are never surfaced: the reply is then a fixed apology
/// with status 200.
#[utoipa::path(
    post,
    path = "/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Answer to the question", body = ChatResponse),
        (status = 400, description = "Empty or overlong message", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn chat(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    AppJson(request): AppJson<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let answer = state.resolver.resolve(&user, &request.mensaje).await?;
    tracing::debug!(user_id = %user, cached = answer.source.is_cached(), "Chat answered");

    Ok(Json(ChatResponse {
        respuesta: answer.text,
    }))
}
