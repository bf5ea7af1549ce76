use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    Response(String),

    #[error("embedding dimension {got} does not match configured {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid summarizer response: {0}")]
    Response(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{backend} store error: {details}")]
    Backend { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("query embedded with model {query} but index holds model {indexed}")]
    ModelMismatch { indexed: String, query: String },

    #[error("query vector dimension {got} does not match indexed dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("document not found: {0}")]
    MissingDocument(i64),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no authenticated uploader")]
    Unauthenticated,

    #[error("uploader is not associated with a regulator")]
    UploaderWithoutRegulator,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query is empty")]
    EmptyQuery,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
