//! In-memory snapshot of recent mood events.
//!
//! The cache is a replaceable snapshot, never patched in place: each
//! rebuild fetches a fresh event list and swaps one `Arc`, so readers
//! holding the previous snapshot keep a consistent view.

use moodiq_store::{MoodEvent, MoodRecordStore};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

pub struct RecordCache {
    records: RwLock<Arc<Vec<MoodEvent>>>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Fetch up to `limit` newest events from the store and swap them in.
    ///
    /// Returns the number of events loaded. A store failure keeps the
    /// previous snapshot and reports zero; it never propagates.
    pub fn rebuild_from(&self, store: &dyn MoodRecordStore, limit: usize) -> usize {
        match store.list_recent_events(limit, None) {
            Ok(events) => {
                let count = events.len();
                let snapshot = Arc::new(events);
                *self.records.write().unwrap_or_else(|e| e.into_inner()) = snapshot;
                info!("Cached {} mood events", count);
                count
            }
            Err(e) => {
                warn!("Mood store unreachable, keeping previous cache: {}", e);
                0
            }
        }
    }

    /// Read-only view of the current snapshot, newest first.
    pub fn snapshot(&self) -> Arc<Vec<MoodEvent>> {
        Arc::clone(&self.records.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};

    struct FixedStore(Vec<MoodEvent>);

    impl MoodRecordStore for FixedStore {
        fn list_recent_events(&self, limit: usize, _actor: Option<&str>) -> Result<Vec<MoodEvent>> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    struct FailingStore;

    impl MoodRecordStore for FailingStore {
        fn list_recent_events(&self, _limit: usize, _actor: Option<&str>) -> Result<Vec<MoodEvent>> {
            bail!("connection refused")
        }
    }

    fn event(seq: i64, emotion: &str) -> MoodEvent {
        MoodEvent {
            seq,
            actor_id: "emp001".to_string(),
            emotion: emotion.to_string(),
            confidence: 80.0,
            timestamp: format!("2026-08-01 09:00:0{}", seq),
            detection_method: "webcam".to_string(),
            notes: None,
            actor_name: "Ada".to_string(),
            actor_group: "Engineering".to_string(),
        }
    }

    #[test]
    fn test_rebuild_replaces_snapshot() {
        let cache = RecordCache::new();
        assert!(cache.is_empty());

        let store = FixedStore(vec![event(1, "happy"), event(2, "sad")]);
        assert_eq!(cache.rebuild_from(&store, 10), 2);
        assert_eq!(cache.len(), 2);

        let store = FixedStore(vec![event(3, "angry")]);
        assert_eq!(cache.rebuild_from(&store, 10), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.snapshot()[0].emotion, "angry");
    }

    #[test]
    fn test_rebuild_respects_limit() {
        let cache = RecordCache::new();
        let store = FixedStore((0..20).map(|i| event(i, "happy")).collect());
        assert_eq!(cache.rebuild_from(&store, 5), 5);
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_snapshot() {
        let cache = RecordCache::new();
        let store = FixedStore(vec![event(1, "happy")]);
        cache.rebuild_from(&store, 10);

        assert_eq!(cache.rebuild_from(&FailingStore, 10), 0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.snapshot()[0].emotion, "happy");
    }

    #[test]
    fn test_old_snapshot_survives_swap() {
        let cache = RecordCache::new();
        let store = FixedStore(vec![event(1, "happy")]);
        cache.rebuild_from(&store, 10);

        let held = cache.snapshot();
        let store = FixedStore(vec![event(2, "sad"), event(3, "angry")]);
        cache.rebuild_from(&store, 10);

        // The reader that grabbed the old snapshot still sees it intact
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].emotion, "happy");
        assert_eq!(cache.len(), 2);
    }
}
