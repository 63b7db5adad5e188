pub mod model;

pub use model::{EmbeddingConfig, EmbeddingModel, HashedBowModel, create_embedding_model};

/// Dimension shared by every shipped model (MiniLM and the hashed
/// fallback project into the same space size).
pub const EMBEDDING_DIM: usize = 384;

/// Identifier of the always-available hashed bag-of-words model.
pub const HASHED_BOW_MODEL: &str = "hashed-bow";

/// Identifier of the ONNX MiniLM model (requires the `onnx` feature).
pub const MINILM_ONNX_MODEL: &str = "minilm-onnx";
