use crate::error::StoreError;
use crate::models::{ChunkHit, DocumentRecord, EmbeddedChunk, FaqRecord, NewDocument};
use async_trait::async_trait;
use std::sync::Arc;

/// Document metadata plus the document's exclusively-owned chunk set.
///
/// `commit_ingestion` and `reindex_document` are atomic: either the document
/// row, its service links, and every chunk row land together, or nothing
/// does. The orchestrator relies on this for its no-partial-index guarantee.
#[async_trait]
pub trait DocumentStore {
    /// Regulator the uploader belongs to, `None` when the user is unknown or
    /// unassociated.
    async fn uploader_regulator(&self, user_id: i64) -> Result<Option<i64>, StoreError>;

    async fn commit_ingestion(
        &self,
        document: NewDocument,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<DocumentRecord, StoreError>;

    /// Replaces the document's chunk set and summary in one transaction, so a
    /// re-uploaded document never serves stale chunks alongside fresh ones.
    /// Returns the new chunk count.
    async fn reindex_document(
        &self,
        document_id: i64,
        summary: String,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<usize, StoreError>;

    async fn archive_document(&self, document_id: i64) -> Result<(), StoreError>;

    async fn restore_document(&self, document_id: i64) -> Result<(), StoreError>;
}

/// Nearest-neighbour lookup over all stored chunk vectors.
#[async_trait]
pub trait ChunkIndex {
    /// Top-k chunks by ascending distance to `vector`, ties broken by chunk
    /// id ascending. Chunks of archived documents are excluded. Queries with
    /// a foreign `model_tag` or the wrong dimensionality are rejected rather
    /// than silently mis-ranked.
    async fn query_nearest(
        &self,
        vector: &[f32],
        model_tag: &str,
        k: usize,
    ) -> Result<Vec<ChunkHit>, StoreError>;
}

/// Case-insensitive substring lookup over FAQ questions and answers, in
/// store-default order.
#[async_trait]
pub trait FaqStore {
    async fn match_faqs(&self, needle: &str, limit: usize) -> Result<Vec<FaqRecord>, StoreError>;
}

#[async_trait]
impl<T> DocumentStore for Arc<T>
where
    T: DocumentStore + Send + Sync + ?Sized,
{
    async fn uploader_regulator(&self, user_id: i64) -> Result<Option<i64>, StoreError> {
        (**self).uploader_regulator(user_id).await
    }

    async fn commit_ingestion(
        &self,
        document: NewDocument,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<DocumentRecord, StoreError> {
        (**self).commit_ingestion(document, chunks).await
    }

    async fn reindex_document(
        &self,
        document_id: i64,
        summary: String,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<usize, StoreError> {
        (**self).reindex_document(document_id, summary, chunks).await
    }

    async fn archive_document(&self, document_id: i64) -> Result<(), StoreError> {
        (**self).archive_document(document_id).await
    }

    async fn restore_document(&self, document_id: i64) -> Result<(), StoreError> {
        (**self).restore_document(document_id).await
    }
}

#[async_trait]
impl<T> ChunkIndex for Arc<T>
where
    T: ChunkIndex + Send + Sync + ?Sized,
{
    async fn query_nearest(
        &self,
        vector: &[f32],
        model_tag: &str,
        k: usize,
    ) -> Result<Vec<ChunkHit>, StoreError> {
        (**self).query_nearest(vector, model_tag, k).await
    }
}

#[async_trait]
impl<T> FaqStore for Arc<T>
where
    T: FaqStore + Send + Sync + ?Sized,
{
    async fn match_faqs(&self, needle: &str, limit: usize) -> Result<Vec<FaqRecord>, StoreError> {
        (**self).match_faqs(needle, limit).await
    }
}
