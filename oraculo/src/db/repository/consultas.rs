use chrono::{DateTime, Utc};
use libsql::{params, Connection};
use nanoid::nanoid;

use crate::error::Result;
use crate::models::{CacheRecord, HistoryRecord};

pub struct ConsultaRepository;

impl ConsultaRepository {
    pub async fn find_cached(
        conn: &Connection,
        user_id: &str,
        question: &str,
    ) -> Result<Option<CacheRecord>> {
        let mut rows = conn
            .query(
                r#"
                SELECT user_id, question, answer, created_at
                FROM cache_consulta
                WHERE user_id = ?1 AND question = ?2
                "#,
                params![user_id, question],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(CacheRecord {
                user_id: row.get(0)?,
                question: row.get(1)?,
                answer: row.get(2)?,
                created_at: parse_timestamp(&row.get::<String>(3)?),
            }))
        } else {
            Ok(None)
        }
    }

    /// Writes the cache row and the history row in one transaction.
    ///
    /// An existing cache row for the same `(user_id, question)` is left
    /// untouched; the history row is always appended.
    pub async fn record(
        conn: &Connection,
        user_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<HistoryRecord> {
        let record = HistoryRecord {
            id: nanoid!(),
            user_id: user_id.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            created_at: Utc::now(),
        };
        let created_at = record.created_at.to_rfc3339();

        let tx = conn.transaction().await?;

        let written: Result<()> = async {
            tx.execute(
                r#"
                INSERT INTO cache_consulta (user_id, question, answer, created_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(user_id, question) DO NOTHING
                "#,
                params![user_id, question, answer, created_at.clone()],
            )
            .await?;

            tx.execute(
                r#"
                INSERT INTO consultas (id, user_id, question, answer, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![record.id.clone(), user_id, question, answer, created_at.clone()],
            )
            .await?;

            Ok(())
        }
        .await;

        match written {
            Ok(()) => {
                tx.commit().await?;
                Ok(record)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Failed to roll back consulta write");
                }
                Err(e)
            }
        }
    }

    pub async fn history_for_user(
        conn: &Connection,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<HistoryRecord>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, user_id, question, answer, created_at
                FROM consultas
                WHERE user_id = ?1
                ORDER BY created_at DESC
                LIMIT ?2
                "#,
                params![user_id, i64::from(limit)],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(HistoryRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                question: row.get(2)?,
                answer: row.get(3)?,
                created_at: parse_timestamp(&row.get::<String>(4)?),
            });
        }

        Ok(results)
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
