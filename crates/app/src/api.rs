use async_trait::async_trait;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use regportal_core::{
    ChunkHit, ChunkIndex, DocumentRecord, DocumentStore, EmbeddedChunk, Embedder, EmbeddingError,
    FaqRecord, FaqStore, HashingEmbedder, HttpEmbedder, IngestError, IngestionPipeline,
    LopdfExtractor, MemoryStore, NewDocument, RemoteStore, SearchError, SmartSearch, StoreError,
    UploadRequest,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Backend selected at startup: in-process for standalone runs, remote for a
/// shared vector-capable store service.
pub enum ApiStore {
    Memory(MemoryStore),
    Remote(RemoteStore),
}

#[async_trait]
impl DocumentStore for ApiStore {
    async fn uploader_regulator(&self, user_id: i64) -> Result<Option<i64>, StoreError> {
        match self {
            Self::Memory(store) => store.uploader_regulator(user_id).await,
            Self::Remote(store) => store.uploader_regulator(user_id).await,
        }
    }

    async fn commit_ingestion(
        &self,
        document: NewDocument,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<DocumentRecord, StoreError> {
        match self {
            Self::Memory(store) => store.commit_ingestion(document, chunks).await,
            Self::Remote(store) => store.commit_ingestion(document, chunks).await,
        }
    }

    async fn reindex_document(
        &self,
        document_id: i64,
        summary: String,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<usize, StoreError> {
        match self {
            Self::Memory(store) => store.reindex_document(document_id, summary, chunks).await,
            Self::Remote(store) => store.reindex_document(document_id, summary, chunks).await,
        }
    }

    async fn archive_document(&self, document_id: i64) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.archive_document(document_id).await,
            Self::Remote(store) => store.archive_document(document_id).await,
        }
    }

    async fn restore_document(&self, document_id: i64) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.restore_document(document_id).await,
            Self::Remote(store) => store.restore_document(document_id).await,
        }
    }
}

#[async_trait]
impl ChunkIndex for ApiStore {
    async fn query_nearest(
        &self,
        vector: &[f32],
        model_tag: &str,
        k: usize,
    ) -> Result<Vec<ChunkHit>, StoreError> {
        match self {
            Self::Memory(store) => store.query_nearest(vector, model_tag, k).await,
            Self::Remote(store) => store.query_nearest(vector, model_tag, k).await,
        }
    }
}

#[async_trait]
impl FaqStore for ApiStore {
    async fn match_faqs(&self, needle: &str, limit: usize) -> Result<Vec<FaqRecord>, StoreError> {
        match self {
            Self::Memory(store) => store.match_faqs(needle, limit).await,
            Self::Remote(store) => store.match_faqs(needle, limit).await,
        }
    }
}

/// External embedding service when configured, local deterministic embedder
/// otherwise.
pub enum ApiEmbedder {
    Http(HttpEmbedder),
    Local(HashingEmbedder),
}

#[async_trait]
impl Embedder for ApiEmbedder {
    fn model_tag(&self) -> &str {
        match self {
            Self::Http(embedder) => embedder.model_tag(),
            Self::Local(embedder) => embedder.model_tag(),
        }
    }

    fn dimensions(&self) -> usize {
        match self {
            Self::Http(embedder) => embedder.dimensions(),
            Self::Local(embedder) => embedder.dimensions(),
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        match self {
            Self::Http(embedder) => embedder.embed(text).await,
            Self::Local(embedder) => embedder.embed(text).await,
        }
    }
}

pub struct AppState {
    pub pipeline: IngestionPipeline<Arc<ApiStore>, Arc<ApiEmbedder>, LopdfExtractor>,
    pub search: SmartSearch<Arc<ApiStore>, Arc<ApiEmbedder>>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/documents", post(upload_document))
        .route("/api/smart-search", post(smart_search))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Response {
    Json(json!({
        "status": "ok",
        "message": "Regulatory portal API is running."
    }))
    .into_response()
}

async fn upload_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let upload = match read_upload(&headers, multipart).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };

    match state.pipeline.ingest(upload).await {
        Ok(receipt) => {
            tracing::info!(
                document_id = receipt.document_id,
                chunk_count = receipt.chunk_count,
                word_count = receipt.word_count,
                "document ingested"
            );
            (
                StatusCode::CREATED,
                Json(json!({
                    "documentID": receipt.document_id,
                    "title": receipt.title,
                    "chunkCount": receipt.chunk_count,
                })),
            )
                .into_response()
        }
        Err(error) => ingest_error_response(error),
    }
}

async fn read_upload(
    headers: &HeaderMap,
    mut multipart: Multipart,
) -> Result<UploadRequest, Response> {
    let uploader_id = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok());

    let mut file_name = String::new();
    let mut bytes = Vec::new();
    let mut title = None;
    let mut type_id = None;
    let mut service_ids = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => return Err(error_body(StatusCode::BAD_REQUEST, "malformed multipart body")),
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                file_name = field.file_name().unwrap_or("upload").to_string();
                bytes = field
                    .bytes()
                    .await
                    .map_err(|_| error_body(StatusCode::BAD_REQUEST, "could not read file part"))?
                    .to_vec();
            }
            Some("title") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| error_body(StatusCode::BAD_REQUEST, "could not read title"))?;
                title = Some(text);
            }
            Some("typeID") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| error_body(StatusCode::BAD_REQUEST, "could not read typeID"))?;
                let parsed = text.trim().parse::<i64>().map_err(|_| {
                    error_body(StatusCode::BAD_REQUEST, "typeID must be a number")
                })?;
                type_id = Some(parsed);
            }
            Some("serviceIDs[]") => {
                let text = field.text().await.map_err(|_| {
                    error_body(StatusCode::BAD_REQUEST, "could not read serviceIDs[]")
                })?;
                let parsed = text.trim().parse::<i64>().map_err(|_| {
                    error_body(StatusCode::BAD_REQUEST, "serviceIDs[] must be numbers")
                })?;
                service_ids.push(parsed);
            }
            _ => {}
        }
    }

    Ok(UploadRequest {
        uploader_id,
        file_name,
        bytes,
        title,
        type_id,
        service_ids,
    })
}

fn ingest_error_response(error: IngestError) -> Response {
    match &error {
        IngestError::Validation(message) => error_body(StatusCode::BAD_REQUEST, message),
        IngestError::Unauthenticated => {
            error_body(StatusCode::UNAUTHORIZED, "no authenticated uploader")
        }
        IngestError::UploaderWithoutRegulator => error_body(
            StatusCode::FORBIDDEN,
            "uploader is not associated with a regulator",
        ),
        // Collaborator failure detail goes to the log, never the client.
        IngestError::Embedding(_) => {
            tracing::error!(%error, "document ingestion failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "embedding service failure")
        }
        IngestError::Store(_) => {
            tracing::error!(%error, "document ingestion failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "storage backend failure")
        }
        IngestError::Io(_) | IngestError::PdfParse(_) => {
            tracing::error!(%error, "document ingestion failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "could not store the upload")
        }
    }
}

#[derive(Debug, Deserialize)]
struct SmartSearchBody {
    query: Option<String>,
}

async fn smart_search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SmartSearchBody>,
) -> Response {
    let Some(query) = body.query else {
        return error_body(StatusCode::BAD_REQUEST, "query is required");
    };

    match state.search.search(&query).await {
        Ok(items) => Json(items).into_response(),
        Err(SearchError::EmptyQuery) => error_body(StatusCode::BAD_REQUEST, "query is empty"),
        Err(error) => {
            tracing::error!(%error, "smart search failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "search backend failure")
        }
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
