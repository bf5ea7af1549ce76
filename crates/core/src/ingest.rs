use crate::chunking::{chunk_words, normalize_extracted, DEFAULT_CHUNK_WORDS};
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::extractor::PdfExtractor;
use crate::models::{EmbeddedChunk, NewDocument};
use crate::storage::FileStorage;
use crate::summarize::{Summarizer, SUMMARY_PLACEHOLDER};
use crate::traits::DocumentStore;
use sha2::{Digest, Sha256};

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub max_chunk_words: usize,
    pub allowed_extensions: Vec<String>,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            max_chunk_words: DEFAULT_CHUNK_WORDS,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

/// One upload as received from the API layer, before any validation.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub uploader_id: Option<i64>,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub title: Option<String>,
    pub type_id: Option<i64>,
    pub service_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct IngestionReceipt {
    pub document_id: i64,
    pub title: String,
    pub chunk_count: usize,
    pub word_count: usize,
    pub summary_generated: bool,
}

/// Drives an upload from raw bytes to a committed document:
/// validate, extract, normalize, summarize, chunk, embed, persist.
///
/// Extraction and summarization degrade (empty text, placeholder summary);
/// validation and embedding failures abort with nothing persisted. Every
/// chunk vector is produced before the first store write, so an embedding
/// failure on any chunk leaves no document row and no chunk rows behind. The
/// upload file itself is written just before the commit; a commit failure can
/// orphan it on disk, which the design accepts.
pub struct IngestionPipeline<S, E, X> {
    store: S,
    embedder: E,
    extractor: X,
    summarizer: Option<Box<dyn Summarizer + Send + Sync>>,
    storage: FileStorage,
    options: IngestionOptions,
}

impl<S, E, X> IngestionPipeline<S, E, X>
where
    S: DocumentStore + Send + Sync,
    E: Embedder + Send + Sync,
    X: PdfExtractor + Send + Sync,
{
    pub fn new(store: S, embedder: E, extractor: X, storage: FileStorage) -> Self {
        Self {
            store,
            embedder,
            extractor,
            summarizer: None,
            storage,
            options: IngestionOptions::default(),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Box<dyn Summarizer + Send + Sync>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_options(mut self, options: IngestionOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn ingest(&self, upload: UploadRequest) -> Result<IngestionReceipt, IngestError> {
        let uploader_id = upload.uploader_id.ok_or(IngestError::Unauthenticated)?;
        let (title, type_id) = validate_upload(&upload, &self.options)?;

        let regulator_id = self
            .store
            .uploader_regulator(uploader_id)
            .await?
            .ok_or(IngestError::UploaderWithoutRegulator)?;

        let normalized = self.extract_normalized(&upload.file_name, &upload.bytes);
        let (summary, summary_generated) = self.summarize_best_effort(&normalized).await;

        let chunks = chunk_words(&normalized, self.options.max_chunk_words);
        let word_count = normalized.split_whitespace().count();
        let embedded = self.embed_chunks(chunks).await?;
        let chunk_count = embedded.len();

        let storage_path = self.storage.save(&upload.file_name, &upload.bytes)?;
        let record = self
            .store
            .commit_ingestion(
                NewDocument {
                    title,
                    regulator_id,
                    type_id,
                    storage_path: storage_path.to_string_lossy().to_string(),
                    uploaded_by: uploader_id,
                    summary,
                    checksum: digest_bytes(&upload.bytes),
                    service_ids: upload.service_ids,
                },
                embedded,
            )
            .await?;

        Ok(IngestionReceipt {
            document_id: record.document_id,
            title: record.title,
            chunk_count,
            word_count,
            summary_generated,
        })
    }

    /// Re-runs extraction and embedding for an already-stored document and
    /// swaps its chunk set atomically, so a re-upload replaces stale chunks
    /// instead of accumulating duplicates.
    pub async fn reingest(
        &self,
        document_id: i64,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<usize, IngestError> {
        let normalized = self.extract_normalized(file_name, bytes);
        let (summary, _) = self.summarize_best_effort(&normalized).await;

        let chunks = chunk_words(&normalized, self.options.max_chunk_words);
        let embedded = self.embed_chunks(chunks).await?;

        let count = self
            .store
            .reindex_document(document_id, summary, embedded)
            .await?;
        Ok(count)
    }

    /// Only PDFs carry extractable text here; other allowed types are stored
    /// without chunks. Extraction errors degrade to empty text by policy.
    fn extract_normalized(&self, file_name: &str, bytes: &[u8]) -> String {
        if file_extension(file_name).as_deref() != Some("pdf") {
            return String::new();
        }

        let raw = match self.extractor.extract_text(bytes) {
            Ok(text) => text,
            Err(_) => String::new(),
        };
        normalize_extracted(&raw)
    }

    async fn summarize_best_effort(&self, text: &str) -> (String, bool) {
        if text.is_empty() {
            return (String::new(), false);
        }

        match &self.summarizer {
            Some(summarizer) => match summarizer.summarize(text).await {
                Ok(summary) if !summary.is_empty() => (summary, true),
                _ => (SUMMARY_PLACEHOLDER.to_string(), false),
            },
            None => (SUMMARY_PLACEHOLDER.to_string(), false),
        }
    }

    async fn embed_chunks(&self, chunks: Vec<String>) -> Result<Vec<EmbeddedChunk>, IngestError> {
        let mut embedded = Vec::with_capacity(chunks.len());
        for (ordinal, text) in chunks.into_iter().enumerate() {
            let embedding = self.embedder.embed(&text).await?;
            embedded.push(EmbeddedChunk {
                ordinal: ordinal as u32,
                text,
                embedding,
                model_tag: self.embedder.model_tag().to_string(),
            });
        }
        Ok(embedded)
    }
}

fn validate_upload(
    upload: &UploadRequest,
    options: &IngestionOptions,
) -> Result<(String, i64), IngestError> {
    if upload.bytes.is_empty() {
        return Err(IngestError::Validation("no file content".to_string()));
    }

    let extension = file_extension(&upload.file_name)
        .ok_or_else(|| IngestError::Validation("file has no extension".to_string()))?;
    if !options.allowed_extensions.iter().any(|allowed| *allowed == extension) {
        return Err(IngestError::Validation(format!(
            "file type not allowed: .{extension}"
        )));
    }

    let title = upload
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .ok_or_else(|| IngestError::Validation("title is required".to_string()))?
        .to_string();

    let type_id = upload
        .type_id
        .ok_or_else(|| IngestError::Validation("typeID is required".to_string()))?;

    Ok((title, type_id))
}

fn file_extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
