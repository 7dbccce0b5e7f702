use async_trait::async_trait;

use crate::error::Result;
use crate::models::HistoryRecord;

/// Durable answer cache plus append-only query history.
#[async_trait]
pub trait ConsultaStore: Send + Sync {
    /// Exact-match lookup on `(user_id, question)`.
    async fn find_cached_answer(&self, user_id: &str, question: &str) -> Result<Option<String>>;

    /// Persist a live resolution: cache row and history row, both or neither.
    async fn record_resolution(
        &self,
        user_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<HistoryRecord>;

    async fn history_for_user(&self, user_id: &str, limit: u32) -> Result<Vec<HistoryRecord>>;
}

/// Key-value metadata store.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_meta(&self, key: &str) -> Result<Option<String>>;
    async fn set_meta(&self, key: &str, value: &str) -> Result<()>;
}

/// A complete database backend: every store plus lifecycle operations.
#[async_trait]
pub trait DatabaseBackend: ConsultaStore + MetadataStore {
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;

    /// Cheap round-trip used by the health endpoint.
    async fn ping(&self) -> Result<()>;
}
