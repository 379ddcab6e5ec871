//! RAG pipeline building blocks: chunking, embedding, indexing, ingestion.

pub mod chunker;
pub mod embedder;
pub mod index;
pub mod ingest;

pub use chunker::{ChunkerConfig, DocumentChunk};
pub use embedder::Embedder;
pub use index::{ScoredChunk, VectorIndex};
pub use ingest::{build_knowledge_base, IngestionOutcome, UploadedFile, DOCUMENT_SEPARATOR};
