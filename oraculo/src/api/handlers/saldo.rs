use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::state::AppState;

const BALANCE_ERROR: &str = "Error al obtener saldo de OpenAI";

/// `GET /saldo`
///
/// Relays the primary provider's usage endpoint using the configured API key.
/// A JSON upstream body is returned verbatim with the upstream status, errors
/// included. No key, no connection or a non-JSON body gives a 500.
#[utoipa::path(
    get,
    path = "/saldo",
    tag = "saldo",
    responses(
        (status = 200, description = "Upstream usage document, verbatim"),
        (status = 500, description = "Upstream unreachable or answered without JSON"),
    )
)]
pub async fn saldo(State(state): State<AppState>) -> Response {
    match fetch_balance(&state).await {
        Ok((status, body)) => {
            if status.is_success() {
                tracing::info!("Provider balance fetched");
            } else {
                tracing::warn!(status = %status, "Provider balance request rejected upstream");
            }
            (status, Json(body)).into_response()
        }
        Err(reason) => {
            tracing::error!(reason = %reason, "Failed to fetch provider balance");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": BALANCE_ERROR })),
            )
                .into_response()
        }
    }
}

async fn fetch_balance(state: &AppState) -> Result<(StatusCode, serde_json::Value), String> {
    let api_key = state
        .llm
        .config()
        .and_then(|config| config.api_key.as_deref())
        .ok_or_else(|| "primary provider has no API key".to_string())?;

    let response = state
        .http
        .get(&state.config.balance.url)
        .bearer_auth(api_key)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = StatusCode::from_u16(response.status().as_u16())
        .map_err(|e| e.to_string())?;

    let body = response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| format!("upstream returned {status} without JSON: {e}"))?;

    Ok((status, body))
}
