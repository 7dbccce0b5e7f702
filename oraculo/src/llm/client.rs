use async_trait::async_trait;

use crate::error::Result;

/// Text produced by one completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    /// The provider stopped because it hit the token ceiling.
    pub truncated: bool,
}

impl Completion {
    pub fn finished(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            truncated: false,
        }
    }

    pub fn truncated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            truncated: true,
        }
    }
}

/// A remote completion provider.
///
/// Implementations report capacity exhaustion as
/// [`OraculoError::LlmRateLimit`](crate::error::OraculoError::LlmRateLimit) so
/// callers can switch providers; every other failure is a generic provider error.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion>;

    /// Short label used in logs and health output.
    fn name(&self) -> String;
}
