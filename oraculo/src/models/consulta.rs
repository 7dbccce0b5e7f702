use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Returned whenever no provider could produce an answer.
pub const FALLBACK_ANSWER: &str = "Hubo un error al procesar tu consulta.";

/// Stable identifier of an authenticated caller. Only the auth verifier mints these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an [`Answer`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    /// In-process cache hit.
    Memory,
    /// Durable per-user cache hit.
    Durable,
    Primary,
    Secondary,
    /// Every provider failed; the text is the fixed apology.
    Fallback,
}

impl AnswerSource {
    pub fn is_cached(self) -> bool {
        matches!(self, AnswerSource::Memory | AnswerSource::Durable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    /// The final text still ends where a provider hit its token ceiling.
    pub truncated: bool,
    pub source: AnswerSource,
}

impl Answer {
    pub fn cached(text: String, source: AnswerSource) -> Self {
        Self {
            text,
            truncated: false,
            source,
        }
    }

    pub fn fallback() -> Self {
        Self {
            text: FALLBACK_ANSWER.to_string(),
            truncated: false,
            source: AnswerSource::Fallback,
        }
    }
}

/// Row of `cache_consulta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub user_id: String,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

/// Row of `consultas`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub user_id: String,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}
