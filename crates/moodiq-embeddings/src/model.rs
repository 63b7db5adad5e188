use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::{EMBEDDING_DIM, HASHED_BOW_MODEL, MINILM_ONNX_MODEL};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model_path: String,
    pub tokenizer_path: String,
    pub max_length: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_path: "models/minilm.onnx".to_string(),
            tokenizer_path: "models/tokenizer.json".to_string(),
            max_length: 512,
            batch_size: 32,
        }
    }
}

/// Trait for embedding models
pub trait EmbeddingModel: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    fn dimension(&self) -> usize;
}

/// Deterministic hashed bag-of-words model.
///
/// Each token is hashed into a fixed number of buckets of a 384-dim
/// vector, then the vector is L2-normalized. Texts sharing vocabulary
/// land close in cosine space, which is enough for nearest-neighbor
/// retrieval over short structured summaries without a downloaded
/// model. Identical input always produces an identical vector.
pub struct HashedBowModel {
    dimension: usize,
}

impl HashedBowModel {
    pub fn new() -> Self {
        Self {
            dimension: EMBEDDING_DIM,
        }
    }

    fn bucket(token: &str, salt: u64) -> usize {
        let mut hasher = DefaultHasher::new();
        salt.hash(&mut hasher);
        token.hash(&mut hasher);
        (hasher.finish() as usize) % EMBEDDING_DIM
    }
}

impl Default for HashedBowModel {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingModel for HashedBowModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            // Two salted buckets per token reduce collision damage
            vector[Self::bucket(&token, 0)] += 1.0;
            vector[Self::bucket(&token, 1)] += 1.0;
        }

        // L2 normalize
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(feature = "onnx")]
pub mod onnx {
    use super::*;
    use ndarray::{Array2, Axis};
    use ort::{GraphOptimizationLevel, Session};
    use tokenizers::Tokenizer;
    use tracing::info;

    pub struct MiniLmOnnxModel {
        session: Session,
        tokenizer: Tokenizer,
        config: EmbeddingConfig,
    }

    impl MiniLmOnnxModel {
        pub fn load(config: EmbeddingConfig) -> Result<Self> {
            info!("Loading ONNX model from {}", config.model_path);

            let session = Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_intra_threads(4)?
                .commit_from_file(&config.model_path)?;

            let tokenizer = Tokenizer::from_file(&config.tokenizer_path)
                .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

            Ok(Self {
                session,
                tokenizer,
                config,
            })
        }

        fn tokenize(&self, text: &str) -> Result<(Vec<i64>, Vec<i64>)> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

            let max_len = self.config.max_length;
            let input_ids: Vec<i64> = encoding
                .get_ids()
                .iter()
                .take(max_len)
                .map(|&x| x as i64)
                .collect();
            let attention_mask: Vec<i64> = encoding
                .get_attention_mask()
                .iter()
                .take(max_len)
                .map(|&x| x as i64)
                .collect();

            Ok((input_ids, attention_mask))
        }

        fn mean_pool(token_embeddings: &Array2<f32>, attention_mask: &[i64]) -> Vec<f32> {
            let seq_len = token_embeddings.shape()[0];
            let hidden_size = token_embeddings.shape()[1];

            let mut pooled = vec![0.0f32; hidden_size];
            let mut count = 0.0f32;

            for i in 0..seq_len {
                if i < attention_mask.len() && attention_mask[i] == 1 {
                    for j in 0..hidden_size {
                        pooled[j] += token_embeddings[[i, j]];
                    }
                    count += 1.0;
                }
            }

            if count > 0.0 {
                for v in &mut pooled {
                    *v /= count;
                }
            }

            let norm: f32 = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut pooled {
                    *v /= norm;
                }
            }

            pooled
        }
    }

    impl EmbeddingModel for MiniLmOnnxModel {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let (input_ids, attention_mask) = self.tokenize(text)?;
            let seq_len = input_ids.len();

            let input_ids_array = Array2::from_shape_vec((1, seq_len), input_ids)?;
            let attention_mask_array =
                Array2::from_shape_vec((1, seq_len), attention_mask.clone())?;

            let outputs = self.session.run(ort::inputs![
                "input_ids" => input_ids_array,
                "attention_mask" => attention_mask_array,
            ]?)?;

            let embeddings = outputs[0].try_extract_tensor::<f32>()?;
            let token_embeddings = embeddings.view().index_axis(Axis(0), 0).to_owned();

            Ok(Self::mean_pool(&token_embeddings, &attention_mask))
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            // One at a time keeps memory bounded; rebuild batches are small
            texts.iter().map(|text| self.embed(text)).collect()
        }

        fn dimension(&self) -> usize {
            EMBEDDING_DIM
        }
    }
}

/// Resolve a model identifier to an embedding model.
///
/// Errors are how capability probing discovers that the Full tier is
/// not available, so unknown and unbuildable identifiers must fail here
/// rather than degrade silently.
pub fn create_embedding_model(
    model_id: &str,
    #[allow(unused_variables)] config: Option<EmbeddingConfig>,
) -> Result<Box<dyn EmbeddingModel>> {
    match model_id {
        HASHED_BOW_MODEL => Ok(Box::new(HashedBowModel::new())),
        #[cfg(feature = "onnx")]
        MINILM_ONNX_MODEL => {
            let config = config.unwrap_or_default();
            Ok(Box::new(onnx::MiniLmOnnxModel::load(config)?))
        }
        #[cfg(not(feature = "onnx"))]
        MINILM_ONNX_MODEL => bail!("model '{}' requires the onnx feature", model_id),
        other => bail!("unknown embedding model '{}'", other),
    }
}
