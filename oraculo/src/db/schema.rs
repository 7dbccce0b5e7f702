use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Durable per-user answer cache; rows are written once and never updated
        CREATE TABLE IF NOT EXISTS cache_consulta (
            user_id TEXT NOT NULL,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, question)
        );

        -- Append-only query history
        CREATE TABLE IF NOT EXISTS consultas (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_consultas_user_created
            ON consultas(user_id, created_at);

        -- Metadata key-value store
        CREATE TABLE IF NOT EXISTS oraculo_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .await?;

    Ok(())
}
