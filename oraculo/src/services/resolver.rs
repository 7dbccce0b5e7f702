use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};

use crate::cache::AnswerCache;
use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::ephemeris::{EphemerisSource, Transits};
use crate::error::{OraculoError, Result};
use crate::llm::budget::{estimate_max_tokens, CONTINUATION_TOKENS};
use crate::llm::prompts::{answer_prompt, continuation_prompt};
use crate::llm::{Completion, ModelClient};
use crate::models::{Answer, AnswerSource, UserId};

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub max_question_chars: usize,
    pub durable_enabled: bool,
    pub coalesce_inflight: bool,
    pub provider_timeout: Duration,
    pub ephemeris_timeout: Duration,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_question_chars: 2000,
            durable_enabled: true,
            coalesce_inflight: true,
            provider_timeout: Duration::from_secs(30),
            ephemeris_timeout: Duration::from_secs(5),
        }
    }
}

impl ResolverOptions {
    pub fn from_config(config: &Config) -> Self {
        let provider_timeout_secs = config
            .llm
            .as_ref()
            .map(|llm| llm.timeout_secs)
            .unwrap_or(30);

        Self {
            max_question_chars: config.server.max_question_chars,
            durable_enabled: config.cache.durable_enabled,
            coalesce_inflight: config.cache.coalesce_inflight,
            provider_timeout: Duration::from_secs(provider_timeout_secs),
            ephemeris_timeout: Duration::from_secs(config.ephemeris.timeout_secs),
        }
    }
}

type InflightAnswer = Shared<BoxFuture<'static, Answer>>;

struct ResolverInner {
    primary: Arc<dyn ModelClient>,
    secondary: Option<Arc<dyn ModelClient>>,
    ephemeris: Arc<dyn EphemerisSource>,
    db: Arc<dyn DatabaseBackend>,
    cache: AnswerCache,
    options: ResolverOptions,
}

/// Turns a user's question into an answer.
///
/// Lookup order is the in-memory cache, then the durable per-user cache, then
/// a live provider call. Live answers are persisted to the durable cache and
/// the history table in one transaction before being cached in memory. Provider
/// failures never reach the caller: they degrade to the secondary provider, the
/// partial text, or [`FALLBACK_ANSWER`](crate::models::FALLBACK_ANSWER).
#[derive(Clone)]
pub struct QueryResolver {
    inner: Arc<ResolverInner>,
    inflight: Arc<Mutex<HashMap<String, InflightAnswer>>>,
}

impl QueryResolver {
    pub fn new(
        primary: Arc<dyn ModelClient>,
        secondary: Option<Arc<dyn ModelClient>>,
        ephemeris: Arc<dyn EphemerisSource>,
        db: Arc<dyn DatabaseBackend>,
        cache: AnswerCache,
        options: ResolverOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                primary,
                secondary,
                ephemeris,
                db,
                cache,
                options,
            }),
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &AnswerCache {
        &self.inner.cache
    }

    pub async fn resolve(&self, user: &UserId, question: &str) -> Result<Answer> {
        self.inner.validate(question)?;

        let started = Instant::now();
        let key = AnswerCache::key(user.as_str(), question);

        if let Some(text) = self.inner.cache.get(&key) {
            tracing::debug!(user_id = %user, "Answer served from memory cache");
            return Ok(Answer::cached(text, AnswerSource::Memory));
        }

        if self.inner.options.durable_enabled {
            match self.inner.db.find_cached_answer(user.as_str(), question).await {
                Ok(Some(text)) => {
                    tracing::debug!(user_id = %user, "Answer served from durable cache");
                    self.inner.cache.insert(key, text.clone());
                    return Ok(Answer::cached(text, AnswerSource::Durable));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(user_id = %user, error = %e, "Durable cache lookup failed, treating as miss");
                }
            }
        }

        let answer = if self.inner.options.coalesce_inflight {
            self.resolve_coalesced(key, user, question).await
        } else {
            self.inner.resolve_live(&key, user.as_str(), question).await
        };

        tracing::info!(
            user_id = %user,
            source = ?answer.source,
            truncated = answer.truncated,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Question resolved"
        );
        Ok(answer)
    }

    /// Joins an identical in-flight live resolution, or starts one.
    ///
    /// The live resolution runs on its own task so a disconnecting caller
    /// cannot abandon the persistence step. The task removes its own entry
    /// after the answer has reached the memory cache.
    async fn resolve_coalesced(&self, key: String, user: &UserId, question: &str) -> Answer {
        let shared = {
            let mut inflight = lock(&self.inflight);
            if let Some(existing) = inflight.get(&key) {
                tracing::debug!(user_id = %user, "Joining in-flight resolution");
                existing.clone()
            } else {
                let inner = Arc::clone(&self.inner);
                let registry = Arc::clone(&self.inflight);
                let task_key = key.clone();
                let user_id = user.as_str().to_string();
                let question = question.to_string();

                let handle = tokio::spawn(async move {
                    let answer = inner.resolve_live(&task_key, &user_id, &question).await;
                    lock(&registry).remove(&task_key);
                    answer
                });

                let registry = Arc::clone(&self.inflight);
                let cleanup_key = key.clone();
                let future: BoxFuture<'static, Answer> = async move {
                    match handle.await {
                        Ok(answer) => answer,
                        Err(e) => {
                            tracing::error!(error = %e, "Live resolution task failed");
                            lock(&registry).remove(&cleanup_key);
                            Answer::fallback()
                        }
                    }
                }
                .boxed();

                let shared = future.shared();
                inflight.insert(key, shared.clone());
                shared
            }
        };

        shared.await
    }
}

impl ResolverInner {
    fn validate(&self, question: &str) -> Result<()> {
        if question.trim().is_empty() {
            return Err(OraculoError::EmptyInput);
        }

        let max = self.options.max_question_chars;
        if question.chars().count() > max {
            return Err(OraculoError::Validation(format!(
                "Mensaje demasiado largo (máximo {max} caracteres)"
            )));
        }
        Ok(())
    }

    async fn resolve_live(&self, key: &str, user_id: &str, question: &str) -> Answer {
        let budget = estimate_max_tokens(question);
        let transits = self.fetch_transits().await;
        let prompt = answer_prompt(&transits, budget, question);

        let answer = self.generate(&prompt, budget).await;

        // The fallback text is recorded too; history covers every live resolution.
        if let Err(e) = self
            .db
            .record_resolution(user_id, question, &answer.text)
            .await
        {
            tracing::error!(user_id, error = %e, "Failed to persist resolution");
        }
        self.cache.insert(key.to_string(), answer.text.clone());

        answer
    }

    async fn fetch_transits(&self) -> Transits {
        let secs = self.options.ephemeris_timeout.as_secs();
        match tokio::time::timeout(
            self.options.ephemeris_timeout,
            self.ephemeris.positions(Utc::now()),
        )
        .await
        {
            Ok(Ok(transits)) => transits,
            Ok(Err(e)) => {
                tracing::warn!(source = self.ephemeris.name(), error = %e, "Ephemeris unavailable, continuing without transits");
                Transits::new()
            }
            Err(_) => {
                tracing::warn!(source = self.ephemeris.name(), timeout_secs = secs, "Ephemeris timed out, continuing without transits");
                Transits::new()
            }
        }
    }

    async fn generate(&self, prompt: &str, budget: u32) -> Answer {
        match self.call(self.primary.as_ref(), prompt, budget).await {
            Ok(completion) if completion.truncated => {
                tracing::warn!(max_tokens = budget, "Primary answer was truncated, requesting continuation");
                let (text, truncated) = self.continue_answer(completion.text).await;
                Answer {
                    text,
                    truncated,
                    source: AnswerSource::Primary,
                }
            }
            Ok(completion) => Answer {
                text: completion.text,
                truncated: false,
                source: AnswerSource::Primary,
            },
            Err(OraculoError::LlmRateLimit { retry_after }) => {
                tracing::warn!(
                    provider = %self.primary.name(),
                    retry_after = ?retry_after,
                    "Primary provider rate limited, switching to secondary"
                );
                self.generate_secondary(prompt, budget).await
            }
            Err(e) => {
                tracing::error!(provider = %self.primary.name(), error = %e, "Primary provider failed");
                Answer::fallback()
            }
        }
    }

    async fn generate_secondary(&self, prompt: &str, budget: u32) -> Answer {
        let Some(secondary) = &self.secondary else {
            tracing::error!("No secondary provider configured");
            return Answer::fallback();
        };

        match self.call(secondary.as_ref(), prompt, budget).await {
            Ok(completion) => Answer {
                text: completion.text,
                truncated: completion.truncated,
                source: AnswerSource::Secondary,
            },
            Err(e) => {
                tracing::error!(provider = %secondary.name(), error = %e, "Secondary provider failed");
                Answer::fallback()
            }
        }
    }

    /// One bounded follow-up request. On failure the partial text is kept.
    async fn continue_answer(&self, partial: String) -> (String, bool) {
        let prompt = continuation_prompt(&partial);
        match self
            .call(self.primary.as_ref(), &prompt, CONTINUATION_TOKENS)
            .await
        {
            Ok(continuation) if continuation.text.trim().is_empty() => (partial, true),
            Ok(continuation) => (
                format!("{} {}", partial, continuation.text),
                continuation.truncated,
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Continuation failed, keeping partial answer");
                (partial, true)
            }
        }
    }

    async fn call(
        &self,
        client: &dyn ModelClient,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<Completion> {
        with_timeout(
            "provider completion",
            self.options.provider_timeout,
            client.complete(prompt, max_tokens),
        )
        .await
    }
}

async fn with_timeout<T>(
    operation: &'static str,
    limit: Duration,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| OraculoError::Timeout {
            operation,
            secs: limit.as_secs(),
        })?
}

fn lock(
    inflight: &Mutex<HashMap<String, InflightAnswer>>,
) -> MutexGuard<'_, HashMap<String, InflightAnswer>> {
    inflight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
