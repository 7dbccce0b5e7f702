use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenVerifier;
use crate::cache::AnswerCache;
use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::ephemeris::EphemerisSource;
use crate::error::{OraculoError, Result};
use crate::llm::{LlmProvider, ModelClient};
use crate::services::{QueryResolver, ResolverOptions};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub llm: LlmProvider,
    pub fallback_llm: Option<LlmProvider>,
    pub ephemeris_source: &'static str,
    pub resolver: QueryResolver,
    /// Outbound client for `/saldo`.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        verifier: Arc<dyn TokenVerifier>,
        llm: LlmProvider,
        fallback_llm: Option<LlmProvider>,
        ephemeris: Arc<dyn EphemerisSource>,
    ) -> Result<Self> {
        let config = Arc::new(config);

        let primary: Arc<dyn ModelClient> = Arc::new(llm.clone());
        let secondary = fallback_llm
            .clone()
            .map(|provider| Arc::new(provider) as Arc<dyn ModelClient>);
        let ephemeris_source = ephemeris.name();

        let resolver = QueryResolver::new(
            primary,
            secondary,
            ephemeris,
            db.clone(),
            AnswerCache::from_config(&config.cache),
            ResolverOptions::from_config(&config),
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| OraculoError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            db,
            verifier,
            llm,
            fallback_llm,
            ephemeris_source,
            resolver,
            http,
        })
    }
}
