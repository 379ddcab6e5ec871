//! Document ingestion: extract, join, chunk, embed, index.
//!
//! One ingestion batch fully replaces the previous knowledge base. Per-file
//! extraction failures skip the file and continue; a batch with no readable
//! content aborts with `EmptyInput`.

use super::chunker::{self, ChunkerConfig};
use super::embedder::Embedder;
use super::index::VectorIndex;
use crate::core::errors::ChatError;
use crate::extract::{self, Extracted};

/// Separator between extracted documents in the joined batch text.
pub const DOCUMENT_SEPARATOR: &str = "\n\n--- Document Separator ---\n\n";

/// An uploaded file: name plus raw bytes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct IngestionOutcome {
    pub index: VectorIndex,
    pub doc_names: Vec<String>,
    pub chunk_count: usize,
    /// Per-file warnings (unsupported type, failed extraction); non-fatal.
    pub warnings: Vec<String>,
}

/// Process an uploaded batch into a fresh [`VectorIndex`].
pub async fn build_knowledge_base(
    embedder: &dyn Embedder,
    config: &ChunkerConfig,
    files: &[UploadedFile],
) -> Result<IngestionOutcome, ChatError> {
    let mut texts: Vec<String> = Vec::new();
    let mut doc_names: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    for file in files {
        match extract::extract(&file.bytes, &file.name) {
            Ok(Extracted::Text(text)) => {
                if text.trim().is_empty() {
                    warnings.push(format!("No text could be extracted from {}.", file.name));
                } else {
                    texts.push(text);
                    doc_names.push(file.name.clone());
                }
            }
            Ok(Extracted::Unsupported(ext)) => {
                warnings.push(format!(
                    "File type '.{}' not supported for text extraction. Skipping.",
                    ext
                ));
            }
            Err(e) => {
                tracing::warn!("Could not process {}: {}", file.name, e);
                warnings.push(format!("Could not process {}: {}", file.name, e));
            }
        }
    }

    if texts.is_empty() {
        return Err(ChatError::EmptyInput);
    }

    let joined = texts.join(DOCUMENT_SEPARATOR);
    // deliberately coarse: one aggregated label for the whole batch
    let source_label = if doc_names.is_empty() {
        "Uploaded Documents".to_string()
    } else {
        doc_names.join(", ")
    };

    let chunks = chunker::chunk(&joined, &source_label, config)?;
    let chunk_count = chunks.len();
    let index = VectorIndex::build(embedder, chunks, doc_names.clone()).await?;

    tracing::info!(
        documents = doc_names.len(),
        chunks = chunk_count,
        "knowledge base built"
    );

    Ok(IngestionOutcome {
        index,
        doc_names,
        chunk_count,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::embedder::HashingEmbedder;

    fn file(name: &str, content: &str) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            bytes: content.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn batch_of_text_files_builds_an_index() {
        let embedder = HashingEmbedder::new();
        let outcome = build_knowledge_base(
            &embedder,
            &ChunkerConfig::default(),
            &[
                file("a.txt", "The termination clause requires 30 days notice."),
                file("b.txt", "Payment is due within sixty days."),
            ],
        )
        .await
        .unwrap();

        assert_eq!(outcome.doc_names, vec!["a.txt", "b.txt"]);
        assert!(outcome.chunk_count >= 1);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.index.doc_names(), ["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn unsupported_files_warn_and_are_skipped() {
        let embedder = HashingEmbedder::new();
        let outcome = build_knowledge_base(
            &embedder,
            &ChunkerConfig::default(),
            &[
                file("a.txt", "Some contract text."),
                file("image.png", "binary"),
            ],
        )
        .await
        .unwrap();

        assert_eq!(outcome.doc_names, vec!["a.txt"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains(".png"));
    }

    #[tokio::test]
    async fn batch_with_no_readable_content_aborts() {
        let embedder = HashingEmbedder::new();
        let err = build_knowledge_base(
            &embedder,
            &ChunkerConfig::default(),
            &[file("image.png", "binary"), file("empty.txt", "   ")],
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ChatError::EmptyInput));
    }

    #[tokio::test]
    async fn chunks_carry_the_aggregated_source_label() {
        let embedder = HashingEmbedder::new();
        let outcome = build_knowledge_base(
            &embedder,
            &ChunkerConfig::default(),
            &[
                file("a.txt", "First document text."),
                file("b.txt", "Second document text."),
            ],
        )
        .await
        .unwrap();

        let results = outcome
            .index
            .query(&embedder, "document text", 1)
            .await
            .unwrap();
        assert_eq!(results[0].chunk.source_label, "a.txt, b.txt");
    }
}
