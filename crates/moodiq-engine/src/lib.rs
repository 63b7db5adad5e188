//! Mood analytics engine.
//!
//! Answers free-text questions and renders insight reports over a cache
//! of mood events, using a vector index when an embedding backend is
//! available and deterministic keyword heuristics when it is not.

pub mod answer;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod intent;
pub mod report;
pub mod stats;

pub use cache::RecordCache;
pub use config::EngineConfig;
pub use engine::{Capability, EngineStats, MoodEngine};
pub use error::QueryError;
pub use intent::{Intent, KNOWN_EMOTIONS, classify};
pub use stats::{EmotionDistribution, EmotionStat, aggregate};
