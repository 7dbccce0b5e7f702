use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Oráculo API",
        version = "1.0.0",
        description = "Authenticated astrology chat backend with provider fallback and per-user answer caching.",
    ),
    paths(
        handlers::chat::chat,
        handlers::historial::historial,
        handlers::saldo::saldo,
        handlers::health::health_check,
    ),
    components(schemas(
        dto::ChatRequest,
        dto::ChatResponse,
        dto::ErrorBody,
        dto::HistorialEntry,
        dto::HistorialResponse,
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::LlmStatus,
        handlers::health::EphemerisStatus,
        handlers::health::CacheStatus,
    )),
    tags(
        (name = "chat", description = "Question answering (auth required)"),
        (name = "saldo", description = "Primary provider usage passthrough"),
        (name = "health", description = "Health check"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(utoipa::openapi::security::Http::new(
                utoipa::openapi::security::HttpAuthScheme::Bearer,
            )),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
