//! Query embedders.
//!
//! The index stores vectors produced at ingestion time; queries must be
//! embedded with the same model. [`FastEmbedder`] runs the ONNX models
//! locally via `fastembed`. [`HashEmbedder`] is a deterministic
//! bag-of-words embedder for indexes built with `feature-hash` vectors
//! and for empty indexes.

use crate::error::IndexError;

/// Turns query text into a vector.
pub trait Embedder: Send + Sync {
    /// Model identifier, as recorded in index metadata.
    fn model_name(&self) -> &str;

    /// Output dimension.
    fn dimensions(&self) -> usize;

    /// Embeds one text.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Embedding`] if the model fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError>;
}

/// Creates the embedder for a model name.
///
/// [`HashEmbedder::MODEL_NAME`] selects a [`HashEmbedder`] of `hash_dims`.
/// With `fastembed-embeddings` enabled, known model names load the ONNX
/// model.
///
/// # Errors
///
/// Returns [`IndexError::Embedding`] if the model is not supported by
/// this build or fails to load.
pub fn create_embedder(model: &str, hash_dims: usize) -> Result<Box<dyn Embedder>, IndexError> {
    if model == HashEmbedder::MODEL_NAME {
        tracing::debug!(dims = hash_dims, "using hash embedder");
        return Ok(Box::new(HashEmbedder::new(hash_dims)));
    }

    #[cfg(feature = "fastembed-embeddings")]
    if let Some(kind) = fast::known_model(model) {
        return Ok(Box::new(fast::FastEmbedder::new(model, kind)?));
    }

    Err(IndexError::Embedding {
        message: format!("embedding model '{model}' is not available in this build"),
    })
}

#[cfg(feature = "fastembed-embeddings")]
pub use fast::FastEmbedder;

#[cfg(feature = "fastembed-embeddings")]
mod fast {
    use std::sync::Mutex;

    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    use super::Embedder;
    use crate::error::IndexError;

    pub(super) fn known_model(name: &str) -> Option<(EmbeddingModel, usize)> {
        match name {
            "BAAI/bge-small-en-v1.5" => Some((EmbeddingModel::BGESmallENV15, 384)),
            "BAAI/bge-base-en-v1.5" => Some((EmbeddingModel::BGEBaseENV15, 768)),
            "sentence-transformers/all-MiniLM-L6-v2" => Some((EmbeddingModel::AllMiniLML6V2, 384)),
            _ => None,
        }
    }

    /// Local ONNX embedder.
    pub struct FastEmbedder {
        name: String,
        dimensions: usize,
        model: Mutex<TextEmbedding>,
    }

    impl FastEmbedder {
        /// Loads the model, downloading it into the user cache on first use.
        pub(super) fn new(name: &str, (kind, dimensions): (EmbeddingModel, usize)) -> Result<Self, IndexError> {
            let mut options = InitOptions::new(kind).with_show_download_progress(false);
            if let Some(cache) = dirs::cache_dir() {
                options = options.with_cache_dir(cache.join("policy-nexus").join("models"));
            }

            let model = TextEmbedding::try_new(options).map_err(|e| IndexError::Embedding {
                message: format!("failed to load {name}: {e}"),
            })?;

            Ok(Self {
                name: name.to_string(),
                dimensions,
                model: Mutex::new(model),
            })
        }
    }

    impl std::fmt::Debug for FastEmbedder {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FastEmbedder")
                .field("name", &self.name)
                .field("dimensions", &self.dimensions)
                .finish_non_exhaustive()
        }
    }

    impl Embedder for FastEmbedder {
        fn model_name(&self) -> &str {
            &self.name
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
            let mut model = self.model.lock().map_err(|_| IndexError::Embedding {
                message: "embedding model lock poisoned".to_string(),
            })?;
            model
                .embed(vec![text], None)
                .map_err(|e| IndexError::Embedding {
                    message: e.to_string(),
                })?
                .into_iter()
                .next()
                .ok_or_else(|| IndexError::Embedding {
                    message: "model returned no vector".to_string(),
                })
        }
    }
}

/// Deterministic feature-hashing embedder.
///
/// Lowercased alphanumeric tokens are hashed (FNV-1a) into signed
/// buckets and the result is L2-normalized. Texts sharing words get
/// positive cosine similarity.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Model name reported by this embedder.
    pub const MODEL_NAME: &'static str = "feature-hash";

    /// Creates an embedder with `dimensions` buckets (at least 1).
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn fnv1a(token: &str) -> u64 {
        token.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, b| {
            (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        })
    }
}

impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[allow(clippy::cast_possible_truncation)]
    fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let mut vector = vec![0.0_f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = Self::fnv1a(&token.to_lowercase());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}
