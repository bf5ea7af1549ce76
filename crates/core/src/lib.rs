pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod search;
pub mod storage;
pub mod stores;
pub mod summarize;
pub mod traits;

pub use chunking::{chunk_words, normalize_extracted, DEFAULT_CHUNK_WORDS};
pub use embeddings::{
    Embedder, HashingEmbedder, HttpEmbedder, HttpEmbedderConfig, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{EmbeddingError, IngestError, SearchError, StoreError, SummaryError};
pub use extractor::{LopdfExtractor, PdfExtractor};
pub use ingest::{
    digest_bytes, IngestionOptions, IngestionPipeline, IngestionReceipt, UploadRequest,
    ALLOWED_EXTENSIONS,
};
pub use models::{
    ChunkHit, DocumentRecord, EmbeddedChunk, FaqRecord, NewDocument, SearchReplyItem,
};
pub use search::{SmartSearch, DOCUMENT_TOP_K, FAQ_MATCH_LIMIT};
pub use storage::FileStorage;
pub use stores::{MemoryStore, RemoteStore, RemoteStoreConfig};
pub use summarize::{
    HttpSummarizer, HttpSummarizerConfig, Summarizer, SUMMARY_PLACEHOLDER,
};
pub use traits::{ChunkIndex, DocumentStore, FaqStore};
