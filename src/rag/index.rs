//! In-memory vector index over one ingestion batch.
//!
//! Brute-force cosine similarity over the batch embeddings. One index exists
//! per "process documents" action; a rebuild replaces the whole index.

use serde::Serialize;

use super::chunker::DocumentChunk;
use super::embedder::Embedder;
use crate::core::errors::ChatError;

/// Result of a similarity query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

#[derive(Debug)]
pub struct VectorIndex {
    chunks: Vec<DocumentChunk>,
    embeddings: Vec<Vec<f32>>,
    embedding_model: String,
    doc_names: Vec<String>,
}

impl VectorIndex {
    /// Embed `chunks` and build an index over them.
    ///
    /// Zero chunks yield [`ChatError::EmptyIndex`] rather than a degenerate
    /// index. Every chunk must carry a non-empty source label.
    pub async fn build(
        embedder: &dyn Embedder,
        chunks: Vec<DocumentChunk>,
        doc_names: Vec<String>,
    ) -> Result<Self, ChatError> {
        if chunks.is_empty() {
            return Err(ChatError::EmptyIndex);
        }
        if chunks.iter().any(|c| c.source_label.trim().is_empty()) {
            return Err(ChatError::Internal(
                "indexed chunk is missing a source label".to_string(),
            ));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder.embed(&texts).await?;

        Ok(Self {
            chunks,
            embeddings,
            embedding_model: embedder.model_name().to_string(),
            doc_names,
        })
    }

    /// The k nearest chunks to `text`, best first; ties keep insertion order.
    ///
    /// The query must be embedded by the model the index was built with, or
    /// the scores are meaningless; a mismatch is a retrieval error.
    pub async fn query(
        &self,
        embedder: &dyn Embedder,
        text: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, ChatError> {
        if embedder.model_name() != self.embedding_model {
            return Err(ChatError::Retrieval(format!(
                "query embedder '{}' does not match index model '{}'",
                embedder.model_name(),
                self.embedding_model
            )));
        }

        let query_text = [text.to_string()];
        let query_embedding = embedder
            .embed(&query_text)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Retrieval("embedder returned no vector".to_string()))?;

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .zip(self.embeddings.iter())
            .map(|(chunk, emb)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(&query_embedding, emb),
            })
            .collect();

        // sort_by is stable: equal scores keep insertion order
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k.max(1));

        Ok(scored)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn doc_names(&self) -> &[String] {
        &self.doc_names
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::embedder::HashingEmbedder;

    fn make_chunk(text: &str, index: usize) -> DocumentChunk {
        DocumentChunk {
            text: text.to_string(),
            source_label: "contract.pdf".to_string(),
            start_offset: index * 100,
            chunk_index: index,
        }
    }

    #[tokio::test]
    async fn build_with_zero_chunks_is_an_empty_index_error() {
        let embedder = HashingEmbedder::new();
        let err = VectorIndex::build(&embedder, vec![], vec![]).await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyIndex));
    }

    #[tokio::test]
    async fn query_identical_to_a_chunk_ranks_it_first() {
        let embedder = HashingEmbedder::new();
        let chunks = vec![
            make_chunk("The parties agree to binding arbitration.", 0),
            make_chunk("The termination clause requires 30 days notice.", 1),
            make_chunk("Payment is due within sixty days of invoice.", 2),
        ];
        let index = VectorIndex::build(&embedder, chunks, vec!["contract.pdf".to_string()])
            .await
            .unwrap();

        let results = index
            .query(&embedder, "The termination clause requires 30 days notice.", 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_index, 1);
        assert!(results[0].score > results[1].score);
        assert!((results[0].score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn equal_scores_preserve_insertion_order() {
        let embedder = HashingEmbedder::new();
        let chunks = vec![
            make_chunk("identical text", 0),
            make_chunk("identical text", 1),
        ];
        let index = VectorIndex::build(&embedder, chunks, vec!["doc".to_string()])
            .await
            .unwrap();

        let results = index.query(&embedder, "identical text", 2).await.unwrap();
        assert_eq!(results[0].chunk.chunk_index, 0);
        assert_eq!(results[1].chunk.chunk_index, 1);
    }

    #[tokio::test]
    async fn mismatched_embedding_model_is_rejected() {
        struct OtherModel(HashingEmbedder);

        #[async_trait::async_trait]
        impl Embedder for OtherModel {
            fn model_name(&self) -> &str {
                "some-other-model"
            }
            fn dims(&self) -> usize {
                self.0.dims()
            }
            async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ChatError> {
                self.0.embed(inputs).await
            }
        }

        let embedder = HashingEmbedder::new();
        let index = VectorIndex::build(
            &embedder,
            vec![make_chunk("some text", 0)],
            vec!["doc".to_string()],
        )
        .await
        .unwrap();

        let err = index
            .query(&OtherModel(HashingEmbedder::new()), "some text", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Retrieval(_)));
    }

    #[tokio::test]
    async fn chunk_without_source_label_is_rejected() {
        let embedder = HashingEmbedder::new();
        let mut chunk = make_chunk("text", 0);
        chunk.source_label = String::new();

        let err = VectorIndex::build(&embedder, vec![chunk], vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Internal(_)));
    }
}
