use crate::error::StoreError;
use crate::models::{ChunkHit, DocumentRecord, EmbeddedChunk, FaqRecord, NewDocument};
use crate::traits::{ChunkIndex, DocumentStore, FaqStore};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

const BACKEND: &str = "memory";

/// In-process store backing the standalone binary and the test suite.
///
/// A single write lock spans each ingestion commit, which is what gives the
/// commit its all-or-nothing behavior here; the remote store gets the same
/// guarantee from its backend's transaction.
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_document_id: i64,
    next_chunk_id: i64,
    next_faq_id: i64,
    documents: Vec<DocumentRecord>,
    chunks: Vec<StoredChunk>,
    faqs: Vec<FaqRecord>,
    service_links: Vec<(i64, i64)>,
    uploaders: HashMap<i64, Option<i64>>,
}

struct StoredChunk {
    chunk_id: i64,
    document_id: i64,
    ordinal: u32,
    text: String,
    embedding: Vec<f32>,
    model_tag: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Registers a user and the regulator they upload on behalf of.
    pub fn seed_uploader(&self, user_id: i64, regulator_id: Option<i64>) {
        if let Ok(mut inner) = self.inner.write() {
            inner.uploaders.insert(user_id, regulator_id);
        }
    }

    pub fn seed_faq(&self, question: &str, answer: &str) -> i64 {
        let Ok(mut inner) = self.inner.write() else {
            return 0;
        };
        inner.next_faq_id += 1;
        let faq_id = inner.next_faq_id;
        inner.faqs.push(FaqRecord {
            faq_id,
            question: question.to_string(),
            answer: answer.to_string(),
        });
        faq_id
    }

    pub fn document(&self, document_id: i64) -> Option<DocumentRecord> {
        let inner = self.inner.read().ok()?;
        inner
            .documents
            .iter()
            .find(|doc| doc.document_id == document_id)
            .cloned()
    }

    pub fn document_count(&self) -> usize {
        self.inner.read().map(|inner| inner.documents.len()).unwrap_or(0)
    }

    pub fn chunk_count(&self) -> usize {
        self.inner.read().map(|inner| inner.chunks.len()).unwrap_or(0)
    }

    pub fn service_link_count(&self, document_id: i64) -> usize {
        self.inner
            .read()
            .map(|inner| {
                inner
                    .service_links
                    .iter()
                    .filter(|(doc, _)| *doc == document_id)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Chunk texts for one document in ordinal order.
    pub fn chunk_texts(&self, document_id: i64) -> Vec<String> {
        let Ok(inner) = self.inner.read() else {
            return Vec::new();
        };
        let mut rows: Vec<(u32, String)> = inner
            .chunks
            .iter()
            .filter(|chunk| chunk.document_id == document_id)
            .map(|chunk| (chunk.ordinal, chunk.text.clone()))
            .collect();
        rows.sort_by_key(|(ordinal, _)| *ordinal);
        rows.into_iter().map(|(_, text)| text).collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_poisoned() -> StoreError {
    StoreError::Backend {
        backend: BACKEND.to_string(),
        details: "lock poisoned".to_string(),
    }
}

fn check_chunk_batch(chunks: &[EmbeddedChunk], existing: &[StoredChunk]) -> Result<(), StoreError> {
    let mut expected_dim: Option<usize> = existing.first().map(|chunk| chunk.embedding.len());
    let indexed_tag: Option<&str> = existing.first().map(|chunk| chunk.model_tag.as_str());

    for chunk in chunks {
        if let Some(expected) = expected_dim {
            if chunk.embedding.len() != expected {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    got: chunk.embedding.len(),
                });
            }
        } else {
            expected_dim = Some(chunk.embedding.len());
        }

        if let Some(indexed) = indexed_tag {
            if chunk.model_tag != indexed {
                return Err(StoreError::ModelMismatch {
                    indexed: indexed.to_string(),
                    query: chunk.model_tag.clone(),
                });
            }
        }
    }

    Ok(())
}

fn cosine_distance(left: &[f32], right: &[f32]) -> f32 {
    let mut dot = 0f32;
    let mut left_sq = 0f32;
    let mut right_sq = 0f32;
    for (l, r) in left.iter().zip(right.iter()) {
        dot += l * r;
        left_sq += l * l;
        right_sq += r * r;
    }

    let magnitude = left_sq.sqrt() * right_sq.sqrt();
    if magnitude == 0.0 {
        return 1.0;
    }
    1.0 - dot / magnitude
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn uploader_regulator(&self, user_id: i64) -> Result<Option<i64>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner.uploaders.get(&user_id).copied().flatten())
    }

    async fn commit_ingestion(
        &self,
        document: NewDocument,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<DocumentRecord, StoreError> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        check_chunk_batch(&chunks, &inner.chunks)?;

        inner.next_document_id += 1;
        let document_id = inner.next_document_id;

        let record = DocumentRecord {
            document_id,
            title: document.title,
            regulator_id: document.regulator_id,
            type_id: document.type_id,
            storage_path: document.storage_path,
            uploaded_by: document.uploaded_by,
            summary: document.summary,
            checksum: document.checksum,
            archived: false,
            ingested_at: Utc::now(),
        };
        inner.documents.push(record.clone());

        for service_id in document.service_ids {
            inner.service_links.push((document_id, service_id));
        }

        for chunk in chunks {
            inner.next_chunk_id += 1;
            let chunk_id = inner.next_chunk_id;
            inner.chunks.push(StoredChunk {
                chunk_id,
                document_id,
                ordinal: chunk.ordinal,
                text: chunk.text,
                embedding: chunk.embedding,
                model_tag: chunk.model_tag,
            });
        }

        Ok(record)
    }

    async fn reindex_document(
        &self,
        document_id: i64,
        summary: String,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        if !inner.documents.iter().any(|doc| doc.document_id == document_id) {
            return Err(StoreError::MissingDocument(document_id));
        }

        inner.chunks.retain(|chunk| chunk.document_id != document_id);
        check_chunk_batch(&chunks, &inner.chunks)?;

        let count = chunks.len();
        for chunk in chunks {
            inner.next_chunk_id += 1;
            let chunk_id = inner.next_chunk_id;
            inner.chunks.push(StoredChunk {
                chunk_id,
                document_id,
                ordinal: chunk.ordinal,
                text: chunk.text,
                embedding: chunk.embedding,
                model_tag: chunk.model_tag,
            });
        }

        if let Some(doc) = inner
            .documents
            .iter_mut()
            .find(|doc| doc.document_id == document_id)
        {
            doc.summary = summary;
        }

        Ok(count)
    }

    async fn archive_document(&self, document_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        let doc = inner
            .documents
            .iter_mut()
            .find(|doc| doc.document_id == document_id)
            .ok_or(StoreError::MissingDocument(document_id))?;
        doc.archived = true;
        Ok(())
    }

    async fn restore_document(&self, document_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        let doc = inner
            .documents
            .iter_mut()
            .find(|doc| doc.document_id == document_id)
            .ok_or(StoreError::MissingDocument(document_id))?;
        doc.archived = false;
        Ok(())
    }
}

#[async_trait]
impl ChunkIndex for MemoryStore {
    async fn query_nearest(
        &self,
        vector: &[f32],
        model_tag: &str,
        k: usize,
    ) -> Result<Vec<ChunkHit>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;

        if let Some(first) = inner.chunks.first() {
            if first.model_tag != model_tag {
                return Err(StoreError::ModelMismatch {
                    indexed: first.model_tag.clone(),
                    query: model_tag.to_string(),
                });
            }
            if first.embedding.len() != vector.len() {
                return Err(StoreError::DimensionMismatch {
                    expected: first.embedding.len(),
                    got: vector.len(),
                });
            }
        }

        let titles: HashMap<i64, (&str, bool)> = inner
            .documents
            .iter()
            .map(|doc| (doc.document_id, (doc.title.as_str(), doc.archived)))
            .collect();

        let mut scored: Vec<(f32, &StoredChunk)> = inner
            .chunks
            .iter()
            .filter(|chunk| {
                titles
                    .get(&chunk.document_id)
                    .is_some_and(|(_, archived)| !archived)
            })
            .map(|chunk| (cosine_distance(vector, &chunk.embedding), chunk))
            .collect();

        scored.sort_by(|(ld, lc), (rd, rc)| {
            ld.total_cmp(rd).then(lc.chunk_id.cmp(&rc.chunk_id))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(distance, chunk)| ChunkHit {
                chunk_id: chunk.chunk_id,
                document_id: chunk.document_id,
                document_title: titles
                    .get(&chunk.document_id)
                    .map(|(title, _)| (*title).to_string())
                    .unwrap_or_default(),
                text: chunk.text.clone(),
                distance,
            })
            .collect())
    }
}

#[async_trait]
impl FaqStore for MemoryStore {
    async fn match_faqs(&self, needle: &str, limit: usize) -> Result<Vec<FaqRecord>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        let lowered = needle.to_lowercase();

        Ok(inner
            .faqs
            .iter()
            .filter(|faq| {
                faq.question.to_lowercase().contains(&lowered)
                    || faq.answer.to_lowercase().contains(&lowered)
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmbeddedChunk, NewDocument};

    const TAG: &str = "test-model";

    fn new_document(title: &str) -> NewDocument {
        NewDocument {
            title: title.to_string(),
            regulator_id: 1,
            type_id: 1,
            storage_path: format!("/tmp/{title}.pdf"),
            uploaded_by: 1,
            summary: String::new(),
            checksum: "checksum".to_string(),
            service_ids: vec![10, 11],
        }
    }

    fn chunk(ordinal: u32, text: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            ordinal,
            text: text.to_string(),
            embedding,
            model_tag: TAG.to_string(),
        }
    }

    #[tokio::test]
    async fn nearest_query_ranks_by_ascending_distance() {
        let store = MemoryStore::new();
        let record = store
            .commit_ingestion(
                new_document("Capital Rules"),
                vec![
                    chunk(0, "first", vec![1.0, 0.0]),
                    chunk(1, "second", vec![0.0, 1.0]),
                    chunk(2, "third", vec![0.7, 0.7]),
                ],
            )
            .await
            .expect("commit should succeed");

        let hits = store
            .query_nearest(&[1.0, 0.0], TAG, 3)
            .await
            .expect("query should succeed");

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].text, "first");
        assert!(hits[0].distance.abs() < 1e-6);
        assert_eq!(hits[0].document_title, "Capital Rules");
        assert_eq!(hits[0].document_id, record.document_id);
        assert!(hits[0].distance <= hits[1].distance);
        assert!(hits[1].distance <= hits[2].distance);
    }

    #[tokio::test]
    async fn nearest_query_returns_at_most_k() {
        let store = MemoryStore::new();
        store
            .commit_ingestion(
                new_document("Doc"),
                vec![
                    chunk(0, "a", vec![1.0, 0.0]),
                    chunk(1, "b", vec![0.0, 1.0]),
                    chunk(2, "c", vec![0.5, 0.5]),
                ],
            )
            .await
            .expect("commit should succeed");

        let hits = store
            .query_nearest(&[1.0, 0.0], TAG, 2)
            .await
            .expect("query should succeed");
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn equal_distances_break_ties_by_chunk_id() {
        let store = MemoryStore::new();
        store
            .commit_ingestion(
                new_document("Doc"),
                vec![
                    chunk(0, "twin-a", vec![0.0, 1.0]),
                    chunk(1, "twin-b", vec![0.0, 1.0]),
                ],
            )
            .await
            .expect("commit should succeed");

        let hits = store
            .query_nearest(&[0.0, 1.0], TAG, 2)
            .await
            .expect("query should succeed");
        assert_eq!(hits[0].text, "twin-a");
        assert_eq!(hits[1].text, "twin-b");
        assert!(hits[0].chunk_id < hits[1].chunk_id);
    }

    #[tokio::test]
    async fn archived_documents_are_excluded_until_restored() {
        let store = MemoryStore::new();
        let record = store
            .commit_ingestion(new_document("Doc"), vec![chunk(0, "only", vec![1.0, 0.0])])
            .await
            .expect("commit should succeed");

        store
            .archive_document(record.document_id)
            .await
            .expect("archive should succeed");
        let hits = store
            .query_nearest(&[1.0, 0.0], TAG, 3)
            .await
            .expect("query should succeed");
        assert!(hits.is_empty());

        store
            .restore_document(record.document_id)
            .await
            .expect("restore should succeed");
        let hits = store
            .query_nearest(&[1.0, 0.0], TAG, 3)
            .await
            .expect("query should succeed");
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn cross_model_queries_are_rejected() {
        let store = MemoryStore::new();
        store
            .commit_ingestion(new_document("Doc"), vec![chunk(0, "only", vec![1.0, 0.0])])
            .await
            .expect("commit should succeed");

        let result = store.query_nearest(&[1.0, 0.0], "other-model", 3).await;
        assert!(matches!(result, Err(StoreError::ModelMismatch { .. })));

        let result = store.query_nearest(&[1.0, 0.0, 0.0], TAG, 3).await;
        assert!(matches!(result, Err(StoreError::DimensionMismatch { .. })));
    }

    #[tokio::test]
    async fn reindex_replaces_the_chunk_set_and_summary() {
        let store = MemoryStore::new();
        let record = store
            .commit_ingestion(
                new_document("Doc"),
                vec![
                    chunk(0, "stale-a", vec![1.0, 0.0]),
                    chunk(1, "stale-b", vec![0.0, 1.0]),
                ],
            )
            .await
            .expect("commit should succeed");

        let count = store
            .reindex_document(
                record.document_id,
                "fresh summary".to_string(),
                vec![chunk(0, "fresh", vec![0.5, 0.5])],
            )
            .await
            .expect("reindex should succeed");

        assert_eq!(count, 1);
        assert_eq!(store.chunk_count(), 1);
        assert_eq!(store.chunk_texts(record.document_id), vec!["fresh".to_string()]);
        let doc = store.document(record.document_id).expect("document exists");
        assert_eq!(doc.summary, "fresh summary");

        let missing = store
            .reindex_document(999, String::new(), Vec::new())
            .await;
        assert!(matches!(missing, Err(StoreError::MissingDocument(999))));
    }

    #[tokio::test]
    async fn faq_match_is_case_insensitive_contains() {
        let store = MemoryStore::new();
        store.seed_faq("What is AML?", "Anti-money laundering rules.");
        store.seed_faq("How do I register?", "Use the portal form.");
        store.seed_faq("What is AML screening?", "Customer checks.");

        let matches = store
            .match_faqs("what is aml", 2)
            .await
            .expect("match should succeed");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].question, "What is AML?");
        assert_eq!(matches[1].question, "What is AML screening?");

        let none = store
            .match_faqs("unrelated topic", 2)
            .await
            .expect("match should succeed");
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn service_links_are_recorded_with_the_document() {
        let store = MemoryStore::new();
        let record = store
            .commit_ingestion(new_document("Doc"), Vec::new())
            .await
            .expect("commit should succeed");
        assert_eq!(store.service_link_count(record.document_id), 2);
    }
}
