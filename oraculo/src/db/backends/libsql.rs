use crate::db::connection::Database;
use crate::db::repository::ConsultaRepository;
use crate::db::traits::{ConsultaStore, DatabaseBackend, MetadataStore};
use crate::db::MetadataRepository;
use crate::error::Result;
use crate::models::HistoryRecord;
use async_trait::async_trait;

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConsultaStore for LibSqlBackend {
    async fn find_cached_answer(&self, user_id: &str, question: &str) -> Result<Option<String>> {
        let conn = self.db.connect()?;
        let record = ConsultaRepository::find_cached(&conn, user_id, question).await?;
        Ok(record.map(|r| r.answer))
    }

    async fn record_resolution(
        &self,
        user_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<HistoryRecord> {
        let conn = self.db.connect()?;
        ConsultaRepository::record(&conn, user_id, question, answer).await
    }

    async fn history_for_user(&self, user_id: &str, limit: u32) -> Result<Vec<HistoryRecord>> {
        let conn = self.db.connect()?;
        ConsultaRepository::history_for_user(&conn, user_id, limit).await
    }
}

#[async_trait]
impl MetadataStore for LibSqlBackend {
    async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.db.connect()?;
        MetadataRepository::get(&conn, key).await
    }

    async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.db.connect()?;
        MetadataRepository::set(&conn, key, value).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }

    async fn ping(&self) -> Result<()> {
        let conn = self.db.connect()?;
        let mut rows = conn.query("SELECT 1", ()).await?;
        rows.next().await?;
        Ok(())
    }
}
