use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{OraculoError, Result};
use crate::llm::api::{default_base_url, LlmApiClient};
use crate::llm::client::{Completion, ModelClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    Gemini,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

impl LlmBackend {
    pub fn label(&self) -> &'static str {
        match self {
            LlmBackend::OpenAI => "openai",
            LlmBackend::OpenRouter => "openrouter",
            LlmBackend::Ollama => "ollama",
            LlmBackend::LmStudio => "lmstudio",
            LlmBackend::Gemini => "gemini",
            LlmBackend::OpenAICompatible { .. } => "openai-compatible",
            LlmBackend::Unavailable { .. } => "unavailable",
        }
    }
}

/// Chat-completion provider built from an [`LlmConfig`].
///
/// The underlying API client is created once; clones share it.
#[derive(Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    config: Option<Arc<LlmConfig>>,
    client: Option<Arc<LlmApiClient>>,
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };

        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            "gemini" => LlmBackend::Gemini,
            _ => {
                if let Some(base_url) = &config.base_url {
                    LlmBackend::OpenAICompatible {
                        base_url: base_url.clone(),
                    }
                } else {
                    LlmBackend::Unavailable {
                        reason: format!("Unknown provider in model: {}", config.model),
                    }
                }
            }
        };

        if let LlmBackend::Unavailable { reason } = &backend {
            return Self::unavailable(reason);
        }

        match LlmApiClient::new(config) {
            Ok(client) => Self {
                backend,
                config: Some(Arc::new(config.clone())),
                client: Some(Arc::new(client)),
            },
            Err(error) => {
                tracing::warn!(model = %config.model, error = %error, "LLM provider disabled");
                Self {
                    backend: LlmBackend::Unavailable {
                        reason: error.to_string(),
                    },
                    config: Some(Arc::new(config.clone())),
                    client: None,
                }
            }
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            config: None,
            client: None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, LlmBackend::Unavailable { .. }) && self.client.is_some()
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub fn config(&self) -> Option<&LlmConfig> {
        self.config.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        if let Some(client) = &self.client {
            return Some(client.base_url());
        }
        let config = self.config()?;
        let (provider, _) = parse_llm_provider_model(&config.model);
        Some(
            config
                .base_url
                .as_deref()
                .unwrap_or_else(|| default_base_url(provider)),
        )
    }

    fn unavailable_reason(&self) -> String {
        match &self.backend {
            LlmBackend::Unavailable { reason } => reason.clone(),
            _ => "LLM client was not initialized".to_string(),
        }
    }
}

#[async_trait]
impl ModelClient for LlmProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion> {
        let client = self
            .client
            .as_ref()
            .filter(|_| self.is_available())
            .ok_or_else(|| OraculoError::LlmUnavailable(self.unavailable_reason()))?;

        client.complete(prompt, Some(max_tokens)).await
    }

    fn name(&self) -> String {
        match self.config() {
            Some(config) => config.model.clone(),
            None => self.backend.label().to_string(),
        }
    }
}
