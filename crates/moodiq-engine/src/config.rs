use moodiq_embeddings::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Engine configuration.
///
/// Every field has a default, so a config file only needs to name what
/// it changes. `embedding_model: None` forces cache-only operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of events fetched from the store per rebuild.
    pub cache_limit: usize,
    /// Number of vector search results fed to the answer path.
    pub search_top_k: usize,
    /// Embedding model identifier; absence disables the vector tier.
    pub embedding_model: Option<String>,
    /// Backend settings for file-based embedding models.
    pub embedding: Option<EmbeddingConfig>,
    /// Vector index location; in-memory when unset.
    pub index_path: Option<PathBuf>,
    /// Labels counted as negative by the Negative and report paths.
    pub negative_emotions: Vec<String>,
    /// Labels counted as positive by the GroupHealth and report paths.
    pub positive_emotions: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_limit: 1000,
            search_top_k: 10,
            embedding_model: None,
            embedding: None,
            index_path: None,
            negative_emotions: ["sad", "angry", "fear", "disgust"]
                .map(String::from)
                .to_vec(),
            positive_emotions: ["happy", "neutral"].map(String::from).to_vec(),
        }
    }
}

impl EngineConfig {
    pub fn is_negative(&self, emotion: &str) -> bool {
        self.negative_emotions.iter().any(|e| e == emotion)
    }

    pub fn is_positive(&self, emotion: &str) -> bool {
        self.positive_emotions.iter().any(|e| e == emotion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cache_limit, 1000);
        assert_eq!(config.search_top_k, 10);
        assert!(config.embedding_model.is_none());
        assert!(config.is_negative("sad"));
        assert!(config.is_positive("neutral"));
        assert!(!config.is_negative("happy"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"search_top_k": 5, "embedding_model": "hashed-bow"}"#)
                .unwrap();
        assert_eq!(config.search_top_k, 5);
        assert_eq!(config.embedding_model.as_deref(), Some("hashed-bow"));
        assert_eq!(config.cache_limit, 1000);
        assert_eq!(config.negative_emotions.len(), 4);
    }
}
