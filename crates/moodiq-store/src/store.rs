//! SQLite access to the Mood Record Store.
//!
//! The engine consumes this store read-only through the
//! [`MoodRecordStore`] trait; the write path (`record_event`,
//! `upsert_actor`) exists for the host surfaces that record new events.

use crate::schema::{MoodEvent, NewMoodEvent, init_schema, normalize_emotion, UNKNOWN_GROUP};
use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Read interface the engine consumes during cache rebuilds.
pub trait MoodRecordStore: Send + Sync {
    /// Enumerate up to `limit` events, newest first, with actor display
    /// name and group denormalized in. `actor` narrows to one actor.
    fn list_recent_events(&self, limit: usize, actor: Option<&str>) -> Result<Vec<MoodEvent>>;
}

/// Per-emotion tally straight from the store, for the stats surface.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EmotionTally {
    pub emotion: String,
    pub count: usize,
    pub average_confidence: f64,
}

pub struct SqliteMoodStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl SqliteMoodStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open mood store at {:?}", path))?;

        // Enable WAL mode for better concurrency
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;

        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.to_path_buf(),
        })
    }

    /// Open an in-memory store (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: PathBuf::from(":memory:"),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Helper function to safely acquire the connection lock with proper error handling.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e: PoisonError<MutexGuard<Connection>>| {
                anyhow!("Mood store lock poisoned: {}", e)
            })?;
        f(&conn)
    }

    /// Create or update an actor directory row.
    pub fn upsert_actor(&self, actor_id: &str, display_name: &str, group: &str) -> Result<()> {
        if actor_id.trim().is_empty() {
            bail!("actor_id must not be empty");
        }

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO actors (actor_id, display_name, group_name)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(actor_id) DO UPDATE SET
                     display_name = excluded.display_name,
                     group_name = excluded.group_name",
                params![actor_id, display_name, group],
            )?;
            Ok(())
        })
    }

    /// Record one mood event. Collaborator write path; the engine never
    /// calls this.
    pub fn record_event(&self, event: &NewMoodEvent) -> Result<i64> {
        if event.actor_id.trim().is_empty() {
            bail!("actor_id must not be empty");
        }
        let emotion = normalize_emotion(&event.emotion);
        if emotion.is_empty() {
            bail!("emotion must not be empty");
        }
        if !(0.0..=100.0).contains(&event.confidence) {
            bail!(
                "confidence must be within 0-100, got {}",
                event.confidence
            );
        }

        let method = event.detection_method.as_deref().unwrap_or("webcam");

        self.with_conn(|conn| {
            match &event.timestamp {
                Some(ts) => conn.execute(
                    "INSERT INTO mood_events (actor_id, emotion, confidence, detection_method, notes, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![event.actor_id, emotion, event.confidence, method, event.notes, ts],
                )?,
                None => conn.execute(
                    "INSERT INTO mood_events (actor_id, emotion, confidence, detection_method, notes)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![event.actor_id, emotion, event.confidence, method, event.notes],
                )?,
            };

            let id = conn.last_insert_rowid();
            debug!("Recorded mood event {} for actor {}", id, event.actor_id);
            Ok(id)
        })
    }

    /// Total number of events in the store.
    pub fn event_count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM mood_events", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Per-emotion count and average confidence over the whole store.
    pub fn emotion_statistics(&self, actor: Option<&str>) -> Result<Vec<EmotionTally>> {
        self.with_conn(|conn| {
            let (sql, args): (&str, Vec<&dyn rusqlite::ToSql>) = match &actor {
                Some(id) => (
                    "SELECT emotion, COUNT(*), AVG(confidence)
                     FROM mood_events WHERE actor_id = ?1
                     GROUP BY emotion ORDER BY COUNT(*) DESC",
                    vec![id as &dyn rusqlite::ToSql],
                ),
                None => (
                    "SELECT emotion, COUNT(*), AVG(confidence)
                     FROM mood_events
                     GROUP BY emotion ORDER BY COUNT(*) DESC",
                    vec![],
                ),
            };

            let mut stmt = conn.prepare(sql)?;
            let results = stmt
                .query_map(args.as_slice(), |row| {
                    Ok(EmotionTally {
                        emotion: row.get(0)?,
                        count: row.get::<_, i64>(1)? as usize,
                        average_confidence: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(results)
        })
    }
}

impl MoodRecordStore for SqliteMoodStore {
    fn list_recent_events(&self, limit: usize, actor: Option<&str>) -> Result<Vec<MoodEvent>> {
        let limit = limit as i64;
        self.with_conn(|conn| {
            let sql = "SELECT e.id, e.actor_id, e.emotion, e.confidence, e.timestamp,
                              e.detection_method, e.notes, a.display_name, a.group_name
                       FROM mood_events e
                       LEFT JOIN actors a ON e.actor_id = a.actor_id";
            let (sql, args): (String, Vec<&dyn rusqlite::ToSql>) = match actor {
                Some(ref id) => (
                    format!(
                        "{sql} WHERE e.actor_id = ?1 ORDER BY e.timestamp DESC, e.id DESC LIMIT ?2"
                    ),
                    vec![id as &dyn rusqlite::ToSql, &limit as &dyn rusqlite::ToSql],
                ),
                None => (
                    format!("{sql} ORDER BY e.timestamp DESC, e.id DESC LIMIT ?1"),
                    vec![&limit as &dyn rusqlite::ToSql],
                ),
            };

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(args.as_slice(), |row| {
                Ok(RawEventRow {
                    seq: row.get(0)?,
                    actor_id: row.get(1)?,
                    emotion: row.get(2)?,
                    confidence: row.get(3)?,
                    timestamp: row.get(4)?,
                    detection_method: row.get(5)?,
                    notes: row.get(6)?,
                    actor_name: row.get(7)?,
                    actor_group: row.get(8)?,
                })
            })?;

            // Malformed rows are skipped, not fatal: a query must not fail
            // because one event was recorded badly.
            let mut events = Vec::new();
            for row in rows {
                match row {
                    Ok(raw) => match raw.into_event() {
                        Some(event) => events.push(event),
                        None => warn!("Skipping mood event with empty emotion label"),
                    },
                    Err(e) => warn!("Skipping malformed mood event row: {}", e),
                }
            }

            Ok(events)
        })
    }
}

/// Row as read from SQLite, before validation and denormalization fixups.
struct RawEventRow {
    seq: i64,
    actor_id: String,
    emotion: String,
    confidence: f64,
    timestamp: String,
    detection_method: String,
    notes: Option<String>,
    actor_name: Option<String>,
    actor_group: Option<String>,
}

impl RawEventRow {
    fn into_event(self) -> Option<MoodEvent> {
        let emotion = normalize_emotion(&self.emotion);
        if emotion.is_empty() {
            return None;
        }

        let actor_name = self.actor_name.unwrap_or_else(|| self.actor_id.clone());
        let actor_group = self
            .actor_group
            .unwrap_or_else(|| UNKNOWN_GROUP.to_string());

        Some(MoodEvent {
            seq: self.seq,
            actor_id: self.actor_id,
            emotion,
            confidence: self.confidence.clamp(0.0, 100.0),
            timestamp: self.timestamp,
            detection_method: self.detection_method,
            notes: self.notes,
            actor_name,
            actor_group,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(actor: &str, emotion: &str, confidence: f64, ts: &str) -> NewMoodEvent {
        NewMoodEvent {
            actor_id: actor.to_string(),
            emotion: emotion.to_string(),
            confidence,
            detection_method: None,
            notes: None,
            timestamp: Some(ts.to_string()),
        }
    }

    #[test]
    fn test_record_and_list() {
        let store = SqliteMoodStore::open_in_memory().unwrap();
        store.upsert_actor("emp001", "Ada Kim", "Engineering").unwrap();

        store.record_event(&event("emp001", "Happy", 91.5, "2026-08-01 09:00:00")).unwrap();
        store.record_event(&event("emp001", "sad", 66.0, "2026-08-02 09:00:00")).unwrap();

        let events = store.list_recent_events(10, None).unwrap();
        assert_eq!(events.len(), 2);
        // Newest first
        assert_eq!(events[0].emotion, "sad");
        assert_eq!(events[1].emotion, "happy");
        assert_eq!(events[1].actor_name, "Ada Kim");
        assert_eq!(events[1].actor_group, "Engineering");
    }

    #[test]
    fn test_list_respects_limit() {
        let store = SqliteMoodStore::open_in_memory().unwrap();
        for i in 0..5 {
            store
                .record_event(&event("emp001", "happy", 80.0, &format!("2026-08-0{} 09:00:00", i + 1)))
                .unwrap();
        }

        let events = store.list_recent_events(3, None).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].timestamp, "2026-08-05 09:00:00");
    }

    #[test]
    fn test_actor_filter() {
        let store = SqliteMoodStore::open_in_memory().unwrap();
        store.record_event(&event("emp001", "happy", 80.0, "2026-08-01 09:00:00")).unwrap();
        store.record_event(&event("emp002", "angry", 70.0, "2026-08-01 10:00:00")).unwrap();

        let events = store.list_recent_events(10, Some("emp002")).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].actor_id, "emp002");
    }

    #[test]
    fn test_unknown_actor_denormalization_fallback() {
        let store = SqliteMoodStore::open_in_memory().unwrap();
        store.record_event(&event("ghost", "neutral", 50.0, "2026-08-01 09:00:00")).unwrap();

        let events = store.list_recent_events(10, None).unwrap();
        assert_eq!(events[0].actor_name, "ghost");
        assert_eq!(events[0].actor_group, "Unknown");
    }

    #[test]
    fn test_record_validation() {
        let store = SqliteMoodStore::open_in_memory().unwrap();

        assert!(store.record_event(&event("emp001", "", 50.0, "2026-08-01 09:00:00")).is_err());
        assert!(store.record_event(&event("emp001", "happy", 120.0, "2026-08-01 09:00:00")).is_err());
        assert!(store.record_event(&event("emp001", "happy", -1.0, "2026-08-01 09:00:00")).is_err());
        assert!(store.record_event(&event("", "happy", 50.0, "2026-08-01 09:00:00")).is_err());
    }

    #[test]
    fn test_emotion_normalized_on_write() {
        let store = SqliteMoodStore::open_in_memory().unwrap();
        store.record_event(&event("emp001", "  SURPRISE ", 88.0, "2026-08-01 09:00:00")).unwrap();

        let events = store.list_recent_events(1, None).unwrap();
        assert_eq!(events[0].emotion, "surprise");
    }

    #[test]
    fn test_emotion_statistics() {
        let store = SqliteMoodStore::open_in_memory().unwrap();
        store.record_event(&event("emp001", "happy", 90.0, "2026-08-01 09:00:00")).unwrap();
        store.record_event(&event("emp001", "happy", 80.0, "2026-08-01 10:00:00")).unwrap();
        store.record_event(&event("emp002", "sad", 60.0, "2026-08-01 11:00:00")).unwrap();

        let stats = store.emotion_statistics(None).unwrap();
        assert_eq!(stats[0].emotion, "happy");
        assert_eq!(stats[0].count, 2);
        assert!((stats[0].average_confidence - 85.0).abs() < 0.001);
        assert_eq!(stats[1].emotion, "sad");
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moods.db");

        {
            let store = SqliteMoodStore::open(&path).unwrap();
            store.record_event(&event("emp001", "happy", 90.0, "2026-08-01 09:00:00")).unwrap();
        }

        let store = SqliteMoodStore::open(&path).unwrap();
        assert_eq!(store.event_count().unwrap(), 1);
    }
}
