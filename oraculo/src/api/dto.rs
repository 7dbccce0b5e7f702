use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /chat`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ChatRequest {
    /// The question, used verbatim as the cache key. Missing is treated as empty.
    #[serde(default)]
    pub mensaje: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ChatResponse {
    pub respuesta: String,
}

/// Error body shared by every endpoint except `/saldo`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub code: u16,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistorialQuery {
    /// Number of entries, 1 to 100. Defaults to 20.
    pub limite: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct HistorialEntry {
    pub pregunta: String,
    pub respuesta: String,
    pub fecha: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct HistorialResponse {
    pub consultas: Vec<HistorialEntry>,
}
