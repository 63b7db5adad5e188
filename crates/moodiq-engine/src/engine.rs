//! The engine façade: cache, capability tier, and the three operations
//! exposed to hosts (query, insights, rebuild).

use crate::answer::{NO_DATA_ANSWER, synthesize};
use crate::cache::RecordCache;
use crate::config::EngineConfig;
use crate::error::QueryError;
use crate::intent::classify;
use crate::report::{NO_DATA_REPORT, render};
use crate::stats::aggregate;
use moodiq_embeddings::{EmbeddingModel, create_embedding_model};
use moodiq_index::{DocMeta, VectorIndex};
use moodiq_store::{MoodEvent, MoodRecordStore};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Which backends were available when the engine was constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Embedding model and vector index both available.
    Full,
    /// Heuristics over the record cache only.
    CacheOnly,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Full => "full",
            Capability::CacheOnly => "cache_only",
        }
    }
}

/// The capability-tagged backend variant. Selected once at construction;
/// every downstream branch matches on this instead of null-checking.
enum IndexTier {
    Full {
        index: VectorIndex,
        model: Box<dyn EmbeddingModel>,
    },
    CacheOnly,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub capability: Capability,
    pub cached_events: usize,
    pub indexed_documents: usize,
}

pub struct MoodEngine {
    store: Arc<dyn MoodRecordStore>,
    cache: RecordCache,
    tier: IndexTier,
    config: EngineConfig,
    /// Serializes rebuild passes; readers are lock-free on the snapshot.
    rebuild_guard: Mutex<()>,
}

impl MoodEngine {
    /// Construct an engine over the given store, probing capabilities once.
    pub fn new(store: Arc<dyn MoodRecordStore>, config: EngineConfig) -> Self {
        let tier = Self::probe(&config);
        match tier {
            IndexTier::Full { .. } => info!("Engine capability: full (vector tier enabled)"),
            IndexTier::CacheOnly => info!("Engine capability: cache-only"),
        }

        Self {
            store,
            cache: RecordCache::new(),
            tier,
            config,
            rebuild_guard: Mutex::new(()),
        }
    }

    /// Try to acquire an embedding model and an index handle. Any failure
    /// degrades to cache-only; nothing here is an error to the caller.
    fn probe(config: &EngineConfig) -> IndexTier {
        let Some(model_id) = config.embedding_model.as_deref() else {
            debug!("No embedding model configured");
            return IndexTier::CacheOnly;
        };

        let model = match create_embedding_model(model_id, config.embedding.clone()) {
            Ok(model) => model,
            Err(e) => {
                warn!("Embedding backend unavailable ({}), running cache-only", e);
                return IndexTier::CacheOnly;
            }
        };

        let index = match &config.index_path {
            Some(path) => VectorIndex::open(path),
            None => VectorIndex::open_in_memory(),
        };
        match index {
            Ok(index) => IndexTier::Full { index, model },
            Err(e) => {
                warn!("Vector index unavailable ({}), running cache-only", e);
                IndexTier::CacheOnly
            }
        }
    }

    pub fn capability(&self) -> Capability {
        match self.tier {
            IndexTier::Full { .. } => Capability::Full,
            IndexTier::CacheOnly => Capability::CacheOnly,
        }
    }

    pub fn stats(&self) -> EngineStats {
        let indexed_documents = match &self.tier {
            IndexTier::Full { index, .. } => index.document_count().unwrap_or(0),
            IndexTier::CacheOnly => 0,
        };
        EngineStats {
            capability: self.capability(),
            cached_events: self.cache.len(),
            indexed_documents,
        }
    }

    /// Answer a free-text question.
    ///
    /// Never fails for missing data; the only errors are malformed inputs.
    pub fn query(&self, question: &str, actor: Option<&str>) -> Result<String, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }
        if let Some(a) = actor
            && a.trim().is_empty()
        {
            return Err(QueryError::InvalidActor);
        }

        self.ensure_cache();
        let snapshot = self.cache.snapshot();
        if snapshot.is_empty() {
            return Ok(NO_DATA_ANSWER.to_string());
        }

        let intent = classify(question);
        debug!(question = %question, intent = ?intent, "Classified question");

        let records = match &self.tier {
            IndexTier::Full { index, model } => {
                let hits = index.search(model.as_ref(), question, self.config.search_top_k, actor);
                if hits.is_empty() {
                    // Empty search result and missing vector tier look the
                    // same from here: answer from the cache
                    cache_view(&snapshot, actor)
                } else {
                    hits
                }
            }
            IndexTier::CacheOnly => cache_view(&snapshot, actor),
        };

        Ok(synthesize(&intent, &records, actor, &self.config))
    }

    /// Render the structured insight report.
    pub fn insights(&self, actor: Option<&str>) -> String {
        let actor = actor.map(str::trim).filter(|a| !a.is_empty());

        self.ensure_cache();
        let snapshot = self.cache.snapshot();
        if snapshot.is_empty() {
            return NO_DATA_REPORT.to_string();
        }

        let records = cache_view(&snapshot, actor);
        let dist = aggregate(records.iter().map(|m| (m.emotion.as_str(), m.confidence)));
        render(&dist, actor, &self.config)
    }

    /// Question prompts a host can offer, seeded from the current data.
    pub fn suggestions(&self) -> Vec<String> {
        self.ensure_cache();
        let snapshot = self.cache.snapshot();
        let dist = aggregate(snapshot.iter().map(|e| (e.emotion.as_str(), e.confidence)));

        let mut suggestions = Vec::new();
        if let Some(most) = dist.dominant() {
            suggestions.push(format!(
                "Why are people feeling {} most often?",
                most.emotion
            ));
        }
        suggestions.extend(
            [
                "What is the most common emotion among team members?",
                "Show me the recent emotion patterns",
                "How is the team feeling overall?",
                "Are any team members struggling?",
            ]
            .map(String::from),
        );
        if dist.variety() > 3 {
            suggestions.push("What factors contribute to different emotions?".to_string());
        }

        suggestions.truncate(5);
        suggestions
    }

    /// Rebuild the cache (and, on the full tier, the vector index) from
    /// the store. Returns true when the resulting cache is non-empty.
    ///
    /// Passes are serialized: two concurrent calls never interleave their
    /// drop/recreate sequences.
    pub fn rebuild_index(&self) -> bool {
        let _guard = self.rebuild_guard.lock().unwrap_or_else(|e| e.into_inner());

        let loaded = self
            .cache
            .rebuild_from(self.store.as_ref(), self.config.cache_limit);
        let snapshot = self.cache.snapshot();

        if let IndexTier::Full { index, model } = &self.tier {
            match index.rebuild(&snapshot, model.as_ref()) {
                Ok(count) => debug!("Vector index rebuilt with {} documents", count),
                Err(e) => warn!("Vector index rebuild failed, queries fall back to cache: {}", e),
            }
        }

        info!("Rebuild pass complete: {} events loaded", loaded);
        !snapshot.is_empty()
    }

    /// Rebuild once if the cache is empty, so a fresh engine can answer
    /// without an explicit rebuild call.
    fn ensure_cache(&self) {
        if self.cache.is_empty() {
            self.rebuild_index();
        }
    }
}

/// Project cache events into the record view the answer path consumes,
/// applying the actor filter.
fn cache_view(snapshot: &[MoodEvent], actor: Option<&str>) -> Vec<DocMeta> {
    snapshot
        .iter()
        .filter(|e| actor.is_none_or(|a| e.actor_id == a))
        .map(|e| DocMeta {
            seq: e.seq,
            actor_id: e.actor_id.clone(),
            emotion: e.emotion.clone(),
            confidence: e.confidence,
            timestamp: e.timestamp.clone(),
        })
        .collect()
}
