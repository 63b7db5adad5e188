use moodiq_embeddings::EMBEDDING_DIM;
use rusqlite::{Connection, Result as SqliteResult};
use serde::{Deserialize, Serialize};

pub fn init_schema(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        r#"
        -- One document per mood event in the cache at rebuild time
        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            seq INTEGER NOT NULL,
            actor_id TEXT NOT NULL,
            emotion TEXT NOT NULL,
            confidence REAL NOT NULL,
            timestamp TEXT NOT NULL,
            summary TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_documents_actor ON documents(actor_id);
        "#,
    )?;

    // sqlite-vec virtual table holding one embedding per document
    conn.execute_batch(&format!(
        r#"
        CREATE VIRTUAL TABLE IF NOT EXISTS documents_vec USING vec0(
            document_id INTEGER PRIMARY KEY,
            embedding float[{EMBEDDING_DIM}]
        );
        "#
    ))?;

    Ok(())
}

/// Metadata decoded from an indexed document; the "pseudo mood event"
/// the answer path works over when the vector tier serves a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocMeta {
    pub seq: i64,
    pub actor_id: String,
    pub emotion: String,
    pub confidence: f64,
    pub timestamp: String,
}
