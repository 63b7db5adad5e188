use rusqlite::{Connection, Result as SqliteResult};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: i32 = 1;

/// Group assigned to events whose actor has no directory row.
pub const UNKNOWN_GROUP: &str = "Unknown";

pub fn init_schema(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        r#"
        -- Metadata table for schema versioning
        CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Actor directory (display name and group are denormalized into
        -- events at read time)
        CREATE TABLE IF NOT EXISTS actors (
            actor_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            group_name TEXT NOT NULL DEFAULT 'Unknown',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        -- Mood events, one row per classified observation
        CREATE TABLE IF NOT EXISTS mood_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            actor_id TEXT NOT NULL,
            emotion TEXT NOT NULL,
            confidence REAL NOT NULL,
            detection_method TEXT NOT NULL DEFAULT 'webcam',
            notes TEXT,
            timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        -- Indexes for the newest-first enumeration path
        CREATE INDEX IF NOT EXISTS idx_mood_events_actor ON mood_events(actor_id);
        CREATE INDEX IF NOT EXISTS idx_mood_events_timestamp ON mood_events(timestamp);
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// One classified emotion observation, as enumerated from the store.
///
/// `actor_name` and `actor_group` are denormalized from the actor
/// directory at read time; events for actors missing from the directory
/// carry the actor id as name and "Unknown" as group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodEvent {
    pub seq: i64,
    pub actor_id: String,
    pub emotion: String,
    pub confidence: f64,
    pub timestamp: String,
    pub detection_method: String,
    pub notes: Option<String>,
    pub actor_name: String,
    pub actor_group: String,
}

/// Input for the collaborator-side write path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMoodEvent {
    pub actor_id: String,
    pub emotion: String,
    pub confidence: f64,
    #[serde(default)]
    pub detection_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Explicit timestamp (ISO-8601). Defaults to the store clock.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Lower-case an emotion label for storage and comparison.
pub fn normalize_emotion(label: &str) -> String {
    label.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM mood_events", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_normalize_emotion() {
        assert_eq!(normalize_emotion("Happy"), "happy");
        assert_eq!(normalize_emotion("  SAD "), "sad");
        assert_eq!(normalize_emotion("neutral"), "neutral");
    }
}
