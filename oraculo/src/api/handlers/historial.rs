use axum::{
    extract::{Query, State},
    Json,
};

use crate::api::dto::{ErrorBody, HistorialEntry, HistorialQuery, HistorialResponse};
use crate::api::extractors::AuthenticatedUser;
use crate::api::state::AppState;
use crate::db::ConsultaStore;
use crate::error::Result;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

/// `GET /historial`
///
/// The caller's own live-resolved questions, newest first. Cache hits are not
/// part of the history.
#[utoipa::path(
    get,
    path = "/historial",
    tag = "chat",
    params(HistorialQuery),
    responses(
        (status = 200, description = "Recent questions of the caller", body = HistorialResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
    ),
    security(("bearer_auth" = []))
)]
pub async fn historial(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<HistorialQuery>,
) -> Result<Json<HistorialResponse>> {
    let limit = query.limite.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let records = state.db.history_for_user(user.as_str(), limit).await?;

    Ok(Json(HistorialResponse {
        consultas: records
            .into_iter()
            .map(|record| HistorialEntry {
                pregunta: record.question,
                respuesta: record.answer,
                fecha: record.created_at,
            })
            .collect(),
    }))
}
