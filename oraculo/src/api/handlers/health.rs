use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::state::AppState;
use crate::db::{DatabaseBackend, MetadataStore, LAST_SYNC_KEY, SCHEMA_VERSION_KEY};
use crate::llm::LlmProvider;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub database: DatabaseStatus,
    pub llm: LlmStatus,
    pub fallback_llm: LlmStatus,
    pub ephemeris: EphemerisStatus,
    pub cache: CacheStatus,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DatabaseStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Only set for embedded replicas that have synced at least once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LlmStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct EphemerisStatus {
    pub source: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CacheStatus {
    pub entries: usize,
    pub ttl_secs: u64,
    pub durable: bool,
}

/// `GET /health`
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthData> {
    let database = match state.db.ping().await {
        Ok(()) => DatabaseStatus {
            status: "ok".to_string(),
            schema_version: meta(state.db.as_ref(), SCHEMA_VERSION_KEY).await,
            last_sync: meta(state.db.as_ref(), LAST_SYNC_KEY).await,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            DatabaseStatus {
                status: "error".to_string(),
                schema_version: None,
                last_sync: None,
            }
        }
    };

    let cache = state.resolver.cache();

    Json(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        llm: llm_status(Some(&state.llm)),
        fallback_llm: llm_status(state.fallback_llm.as_ref()),
        ephemeris: EphemerisStatus {
            source: state.ephemeris_source.to_string(),
        },
        cache: CacheStatus {
            entries: cache.len(),
            ttl_secs: cache.ttl().as_secs(),
            durable: state.config.cache.durable_enabled,
        },
    })
}

async fn meta(db: &dyn DatabaseBackend, key: &str) -> Option<String> {
    match db.get_meta(key).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read database metadata");
            None
        }
    }
}

fn llm_status(provider: Option<&LlmProvider>) -> LlmStatus {
    match provider {
        Some(provider) if provider.is_available() => LlmStatus {
            status: "available".to_string(),
            provider: Some(provider.backend().label().to_string()),
            model: provider.config().map(|c| c.model.clone()),
        },
        Some(_) => LlmStatus {
            status: "unavailable".to_string(),
            provider: None,
            model: None,
        },
        None => LlmStatus {
            status: "disabled".to_string(),
            provider: None,
            model: None,
        },
    }
}
