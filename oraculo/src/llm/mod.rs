mod api;
pub mod budget;
mod client;
pub mod prompts;
mod provider;

pub use api::LlmApiClient;
pub use client::{Completion, ModelClient};
pub use provider::{LlmBackend, LlmProvider};
