//! Vector index over mood-event documents.
//!
//! The whole collection is dropped and recreated on every rebuild; there
//! is no incremental upsert. Searches never raise: any backend or
//! embedding failure is logged and reported as an empty result so the
//! caller can fall back to the record cache.

use crate::schema::{DocMeta, init_schema};
use anyhow::{Context, Result, anyhow};
use moodiq_embeddings::EmbeddingModel;
use moodiq_store::MoodEvent;
use rusqlite::{Connection, ffi::sqlite3_auto_extension, params};
use sqlite_vec::sqlite3_vec_init;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Registers the sqlite-vec extension exactly once per process.
static SQLITE_VEC_INIT: Once = Once::new();

fn init_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| {
        // SAFETY: sqlite3_vec_init is the entry point exported by the
        // sqlite-vec crate with the signature sqlite3_auto_extension
        // expects; the transmute only adapts the declared-parameterless
        // pointer to that signature. Once guarantees single registration,
        // and registration happens before any connection is opened.
        unsafe {
            sqlite3_auto_extension(Some(std::mem::transmute::<
                *const (),
                unsafe extern "C" fn(
                    *mut rusqlite::ffi::sqlite3,
                    *mut *mut std::os::raw::c_char,
                    *const rusqlite::ffi::sqlite3_api_routines,
                ) -> std::os::raw::c_int,
            >(sqlite3_vec_init as *const ())));
        }
        tracing::debug!("sqlite-vec extension registered");
    });
}

pub struct VectorIndex {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl VectorIndex {
    pub fn open(path: &Path) -> Result<Self> {
        init_sqlite_vec();

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open vector index at {:?}", path))?;

        // Enable WAL mode for better concurrency
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA busy_timeout=5000;",
        )?;

        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.to_path_buf(),
        })
    }

    /// Open an in-memory index (the default when no path is configured).
    pub fn open_in_memory() -> Result<Self> {
        init_sqlite_vec();

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

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e: PoisonError<MutexGuard<Connection>>| {
                anyhow!("Vector index lock poisoned: {}", e)
            })?;
        f(&conn)
    }

    /// Drop the collection and rebuild it from the given events.
    ///
    /// The delete and every insert happen inside one transaction, so a
    /// concurrent reader observes either the previous collection or the
    /// new one, never a partially built state.
    pub fn rebuild(&self, events: &[MoodEvent], model: &dyn EmbeddingModel) -> Result<usize> {
        let summaries: Vec<String> = events.iter().map(render_document).collect();
        let embeddings = model
            .embed_batch(&summaries)
            .context("Embedding backend failed during rebuild")?;

        let conn = self
            .conn
            .lock()
            .map_err(|e: PoisonError<MutexGuard<Connection>>| {
                anyhow!("Vector index lock poisoned: {}", e)
            })?;

        conn.execute("BEGIN IMMEDIATE", [])?;

        let result = (|| -> Result<()> {
            conn.execute("DELETE FROM documents", [])?;
            conn.execute("DELETE FROM documents_vec", [])?;

            let mut doc_stmt = conn.prepare(
                "INSERT INTO documents (seq, actor_id, emotion, confidence, timestamp, summary)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            let mut vec_stmt = conn
                .prepare("INSERT INTO documents_vec (document_id, embedding) VALUES (?1, ?2)")?;

            for (event, (summary, embedding)) in
                events.iter().zip(summaries.iter().zip(embeddings.iter()))
            {
                doc_stmt.execute(params![
                    event.seq,
                    event.actor_id,
                    event.emotion,
                    event.confidence,
                    event.timestamp,
                    summary,
                ])?;
                let document_id = conn.last_insert_rowid();

                let embedding_bytes: Vec<u8> =
                    embedding.iter().flat_map(|f| f.to_le_bytes()).collect();
                vec_stmt.execute(params![document_id, embedding_bytes])?;
            }
            Ok(())
        })();

        match result {
            Ok(()) => {
                conn.execute("COMMIT", [])?;
                debug!("Rebuilt vector index with {} documents", events.len());
                Ok(events.len())
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    /// Number of documents currently in the collection.
    pub fn document_count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Nearest-neighbor search by query text.
    ///
    /// Results are most-similar first, ties broken by most-recent
    /// timestamp. Empty index, embedding failure, and backend errors all
    /// produce an empty vector, indistinguishable to the caller from
    /// having no vector tier at all.
    pub fn search(
        &self,
        model: &dyn EmbeddingModel,
        query: &str,
        top_k: usize,
        actor: Option<&str>,
    ) -> Vec<DocMeta> {
        match self.try_search(model, query, top_k, actor) {
            Ok(results) => results,
            Err(e) => {
                warn!("Vector search failed, falling back to cache: {}", e);
                Vec::new()
            }
        }
    }

    fn try_search(
        &self,
        model: &dyn EmbeddingModel,
        query: &str,
        top_k: usize,
        actor: Option<&str>,
    ) -> Result<Vec<DocMeta>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = model.embed(query)?;

        // Over-fetch so a post-KNN actor filter still has enough rows
        let fetch = top_k * 4;
        let neighbors = self.nearest(&query_embedding, fetch)?;
        if neighbors.is_empty() {
            debug!("No documents matched the query embedding");
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = neighbors.iter().map(|(id, _)| *id).collect();
        let metas = self.get_metadata_by_ids(&ids)?;

        let mut scored: Vec<(f32, DocMeta)> = neighbors
            .into_iter()
            .filter_map(|(id, distance)| {
                let meta = metas.iter().find(|(doc_id, _)| *doc_id == id)?;
                Some((distance, meta.1.clone()))
            })
            .filter(|(_, meta)| actor.is_none_or(|a| meta.actor_id == a))
            .collect();

        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.timestamp.cmp(&a.1.timestamp))
        });
        scored.truncate(top_k);

        Ok(scored.into_iter().map(|(_, meta)| meta).collect())
    }

    /// KNN over the vec0 table: document ids with distances, closest first.
    fn nearest(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<(i64, f32)>> {
        self.with_conn(|conn| {
            let embedding_bytes: Vec<u8> = query_embedding
                .iter()
                .flat_map(|f| f.to_le_bytes())
                .collect();

            let mut stmt = conn.prepare(
                "SELECT document_id, distance
                 FROM documents_vec
                 WHERE embedding MATCH ?1
                 ORDER BY distance
                 LIMIT ?2",
            )?;

            let results = stmt
                .query_map(params![embedding_bytes, limit as i64], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, f32>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(results)
        })
    }

    fn get_metadata_by_ids(&self, ids: &[i64]) -> Result<Vec<(i64, DocMeta)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        self.with_conn(|conn| {
            let placeholders: String = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!(
                "SELECT id, seq, actor_id, emotion, confidence, timestamp
                 FROM documents WHERE id IN ({})",
                placeholders
            );

            let mut stmt = conn.prepare(&sql)?;
            let args: Vec<&dyn rusqlite::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();

            let results = stmt
                .query_map(args.as_slice(), |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        DocMeta {
                            seq: row.get(1)?,
                            actor_id: row.get(2)?,
                            emotion: row.get(3)?,
                            confidence: row.get(4)?,
                            timestamp: row.get(5)?,
                        },
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(results)
        })
    }
}

/// Render the summary text indexed for one event.
///
/// The template is deterministic: the same event always produces the
/// same document, which keeps rebuilds idempotent.
pub fn render_document(event: &MoodEvent) -> String {
    let notes = event.notes.as_deref().unwrap_or("No additional notes");
    format!(
        "Mood record {} at {}\n\
         Actor: {}\n\
         Group: {}\n\
         Detected emotion: {}\n\
         Confidence: {:.1}%\n\
         Detection method: {}\n\
         Notes: {}\n\
         Analysis: {} was feeling {} with {:.1}% confidence.",
        event.seq,
        short_time(&event.timestamp),
        event.actor_name,
        event.actor_group,
        event.emotion,
        event.confidence,
        event.detection_method,
        notes,
        event.actor_name,
        event.emotion,
        event.confidence,
    )
}

/// Timestamp truncated to seconds, ISO 'T' separator replaced by a space.
fn short_time(timestamp: &str) -> String {
    timestamp.chars().take(19).collect::<String>().replace('T', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodiq_embeddings::HashedBowModel;

    fn sample_event(seq: i64, actor: &str, emotion: &str, ts: &str) -> MoodEvent {
        MoodEvent {
            seq,
            actor_id: actor.to_string(),
            emotion: emotion.to_string(),
            confidence: 90.0,
            timestamp: ts.to_string(),
            detection_method: "webcam".to_string(),
            notes: None,
            actor_name: format!("Actor {}", actor),
            actor_group: "Engineering".to_string(),
        }
    }

    #[test]
    fn test_rebuild_and_count() {
        let index = VectorIndex::open_in_memory().unwrap();
        let model = HashedBowModel::new();
        let events = vec![
            sample_event(1, "emp001", "happy", "2026-08-01 09:00:00"),
            sample_event(2, "emp002", "sad", "2026-08-02 09:00:00"),
        ];

        let count = index.rebuild(&events, &model).unwrap();
        assert_eq!(count, 2);
        assert_eq!(index.document_count().unwrap(), 2);
    }

    #[test]
    fn test_rebuild_replaces_collection() {
        let index = VectorIndex::open_in_memory().unwrap();
        let model = HashedBowModel::new();
        let events = vec![
            sample_event(1, "emp001", "happy", "2026-08-01 09:00:00"),
            sample_event(2, "emp002", "sad", "2026-08-02 09:00:00"),
            sample_event(3, "emp003", "angry", "2026-08-03 09:00:00"),
        ];

        index.rebuild(&events, &model).unwrap();
        index.rebuild(&events[..1], &model).unwrap();
        assert_eq!(index.document_count().unwrap(), 1);
    }

    #[test]
    fn test_search_empty_index_returns_nothing() {
        let index = VectorIndex::open_in_memory().unwrap();
        let model = HashedBowModel::new();
        let results = index.search(&model, "how is everyone feeling?", 5, None);
        assert!(results.is_empty());
    }

    #[test]
    fn test_search_returns_metadata() {
        let index = VectorIndex::open_in_memory().unwrap();
        let model = HashedBowModel::new();
        let events = vec![
            sample_event(1, "emp001", "happy", "2026-08-01 09:00:00"),
            sample_event(2, "emp002", "sad", "2026-08-02 09:00:00"),
        ];
        index.rebuild(&events, &model).unwrap();

        let results = index.search(&model, "emotion", 10, None);
        assert_eq!(results.len(), 2);
        assert!(results.iter().any(|m| m.emotion == "happy"));
        assert!(results.iter().any(|m| m.emotion == "sad"));
    }

    #[test]
    fn test_search_actor_filter() {
        let index = VectorIndex::open_in_memory().unwrap();
        let model = HashedBowModel::new();
        let events = vec![
            sample_event(1, "emp001", "happy", "2026-08-01 09:00:00"),
            sample_event(2, "emp002", "sad", "2026-08-02 09:00:00"),
            sample_event(3, "emp001", "neutral", "2026-08-03 09:00:00"),
        ];
        index.rebuild(&events, &model).unwrap();

        let results = index.search(&model, "emotion", 10, Some("emp001"));
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|m| m.actor_id == "emp001"));
    }

    #[test]
    fn test_search_respects_top_k() {
        let index = VectorIndex::open_in_memory().unwrap();
        let model = HashedBowModel::new();
        let events: Vec<MoodEvent> = (1..=8)
            .map(|i| sample_event(i, "emp001", "happy", &format!("2026-08-0{} 09:00:00", i)))
            .collect();
        index.rebuild(&events, &model).unwrap();

        let results = index.search(&model, "happy", 3, None);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_distance_tie_breaks_newest_first() {
        let index = VectorIndex::open_in_memory().unwrap();
        let model = HashedBowModel::new();
        // Timestamps differ only past the seconds the template keeps, so
        // both events render to the same document and their distances tie.
        let a = sample_event(1, "emp001", "happy", "2026-08-01 09:00:00.100");
        let b = sample_event(1, "emp001", "happy", "2026-08-01 09:00:00.500");
        index.rebuild(&[a, b], &model).unwrap();

        let results = index.search(&model, "happy", 2, None);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].timestamp, "2026-08-01 09:00:00.500");
    }

    #[test]
    fn test_render_document_template() {
        let mut event = sample_event(7, "emp001", "happy", "2026-08-01T09:30:00");
        event.confidence = 91.25;
        event.notes = Some("standup".to_string());

        let doc = render_document(&event);
        assert!(doc.starts_with("Mood record 7 at 2026-08-01 09:30:00\n"));
        assert!(doc.contains("Actor: Actor emp001\n"));
        assert!(doc.contains("Group: Engineering\n"));
        assert!(doc.contains("Detected emotion: happy\n"));
        assert!(doc.contains("Confidence: 91.2%\n"));
        assert!(doc.contains("Notes: standup\n"));
        assert!(doc.ends_with("Analysis: Actor emp001 was feeling happy with 91.2% confidence."));
    }

    #[test]
    fn test_render_document_default_notes() {
        let event = sample_event(1, "emp001", "sad", "2026-08-01 09:00:00");
        let doc = render_document(&event);
        assert!(doc.contains("Notes: No additional notes\n"));
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        let model = HashedBowModel::new();

        let index = VectorIndex::open(&path).unwrap();
        index
            .rebuild(&[sample_event(1, "emp001", "happy", "2026-08-01 09:00:00")], &model)
            .unwrap();
        assert_eq!(index.document_count().unwrap(), 1);
    }
}
