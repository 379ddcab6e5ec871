//! Embedding backends.
//!
//! The pipeline talks to the [`Embedder`] trait only. Build-time and
//! query-time vectors must come from the same model, so the index records the
//! model name at build and refuses queries embedded by anything else.
//!
//! Two implementations:
//! - [`FastembedEmbedder`] (feature `local-embeddings`): all-MiniLM-L6-v2 via
//!   fastembed, matching the original knowledge-base model.
//! - [`HashingEmbedder`]: deterministic hashed bag-of-words vectors. No model
//!   download, fully offline; the default when the feature is disabled and
//!   the embedder used by tests.

use async_trait::async_trait;

use crate::core::errors::ChatError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier recorded in the index and checked at query time.
    fn model_name(&self) -> &str;

    /// Embedding vector dimensionality.
    fn dims(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ChatError>;
}

/// Deterministic hashed bag-of-words embedder.
///
/// Tokenizes on non-alphanumeric boundaries, hashes each lowercased token
/// into a fixed-size bucket vector (FNV-1a, sign split on one hash bit) and
/// L2-normalizes. Identical texts always produce identical vectors.
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self { dims: 384 }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(token.to_lowercase().as_bytes());
            let bucket = (hash % self.dims as u64) as usize;
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        "hashing-bow-384"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
        Ok(inputs.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// all-MiniLM-L6-v2 sentence embeddings via fastembed.
///
/// Inference is blocking ONNX work, so batches run on the blocking pool. The
/// model is downloaded on first use and cached; after that, fully offline.
#[cfg(feature = "local-embeddings")]
pub struct FastembedEmbedder {
    model: std::sync::Arc<std::sync::Mutex<fastembed::TextEmbedding>>,
}

#[cfg(feature = "local-embeddings")]
impl FastembedEmbedder {
    pub fn new() -> Result<Self, ChatError> {
        let model = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2)
                .with_show_download_progress(false),
        )
        .map_err(|e| ChatError::ModelInit(format!("failed to load embedding model: {}", e)))?;

        Ok(Self {
            model: std::sync::Arc::new(std::sync::Mutex::new(model)),
        })
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl Embedder for FastembedEmbedder {
    fn model_name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }

    fn dims(&self) -> usize {
        384
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
        let model = self.model.clone();
        let texts = inputs.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| ChatError::Internal("embedding model lock poisoned".to_string()))?;
            model
                .embed(texts, None)
                .map_err(|e| ChatError::Retrieval(format!("embedding failed: {}", e)))
        })
        .await
        .map_err(ChatError::internal)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_texts_embed_identically() {
        let embedder = HashingEmbedder::new();
        let vectors = embedder
            .embed(&["thirty days notice".to_string(), "thirty days notice".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors[0], vectors[1]);
        assert_eq!(vectors[0].len(), embedder.dims());
    }

    #[tokio::test]
    async fn vectors_are_normalized() {
        let embedder = HashingEmbedder::new();
        let vectors = embedder
            .embed(&["the termination clause requires notice".to_string()])
            .await
            .unwrap();
        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn unrelated_texts_do_not_collide() {
        let embedder = HashingEmbedder::new();
        let vectors = embedder
            .embed(&[
                "termination notice period".to_string(),
                "maritime shipping lanes".to_string(),
            ])
            .await
            .unwrap();
        assert_ne!(vectors[0], vectors[1]);
    }
}
