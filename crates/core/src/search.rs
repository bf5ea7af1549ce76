use crate::chunking::normalize_extracted;
use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::models::SearchReplyItem;
use crate::traits::{ChunkIndex, FaqStore};

/// Document-chunk results per query.
pub const DOCUMENT_TOP_K: usize = 3;

/// FAQ keyword matches appended per query.
pub const FAQ_MATCH_LIMIT: usize = 2;

/// Answers a free-text question from two sources: nearest document chunks by
/// embedding distance, and FAQs matched by case-insensitive substring. FAQ
/// entries always precede document entries in the reply; the two groups score
/// on different scales, so no unified ranking is attempted. Within each group
/// the order is stable (FAQs in store order, chunks by ascending distance).
pub struct SmartSearch<S, E> {
    store: S,
    embedder: E,
}

impl<S, E> SmartSearch<S, E>
where
    S: ChunkIndex + FaqStore + Send + Sync,
    E: Embedder + Send + Sync,
{
    pub fn new(store: S, embedder: E) -> Self {
        Self { store, embedder }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchReplyItem>, SearchError> {
        let normalized = normalize_extracted(query);
        if normalized.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        // Embedding failure aborts the whole search; no partial results.
        let vector = self.embedder.embed(&normalized).await?;
        let hits = self
            .store
            .query_nearest(&vector, self.embedder.model_tag(), DOCUMENT_TOP_K)
            .await?;
        let faqs = self.store.match_faqs(&normalized, FAQ_MATCH_LIMIT).await?;

        let mut reply = Vec::with_capacity(faqs.len() + hits.len());
        for faq in faqs {
            reply.push(SearchReplyItem::Faq {
                question: faq.question,
                answer: faq.answer,
            });
        }
        for hit in hits {
            reply.push(SearchReplyItem::Document {
                text: hit.text,
                source_document: hit.document_title,
                document_id: hit.document_id,
            });
        }

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::error::StoreError;
    use crate::models::{ChunkHit, EmbeddedChunk, FaqRecord, NewDocument};
    use crate::stores::MemoryStore;
    use crate::traits::DocumentStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Records whether any query reached the store.
    #[derive(Default)]
    struct TouchSensitiveStore {
        touched: AtomicBool,
    }

    #[async_trait]
    impl ChunkIndex for TouchSensitiveStore {
        async fn query_nearest(
            &self,
            _vector: &[f32],
            _model_tag: &str,
            _k: usize,
        ) -> Result<Vec<ChunkHit>, StoreError> {
            self.touched.store(true, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl FaqStore for TouchSensitiveStore {
        async fn match_faqs(
            &self,
            _needle: &str,
            _limit: usize,
        ) -> Result<Vec<FaqRecord>, StoreError> {
            self.touched.store(true, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    async fn ingested_store(embedder: &HashingEmbedder) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.seed_faq("What is AML?", "Anti-money laundering obligations explained.");

        let text = "anti-money laundering controls for payment providers";
        let embedding = embedder.embed(text).await.expect("embed");
        store
            .commit_ingestion(
                NewDocument {
                    title: "AML Guideline 2024".to_string(),
                    regulator_id: 1,
                    type_id: 1,
                    storage_path: "/uploads/aml.pdf".to_string(),
                    uploaded_by: 1,
                    summary: String::new(),
                    checksum: "checksum".to_string(),
                    service_ids: vec![1],
                },
                vec![EmbeddedChunk {
                    ordinal: 0,
                    text: text.to_string(),
                    embedding,
                    model_tag: embedder.model_tag().to_string(),
                }],
            )
            .await
            .expect("commit");
        store
    }

    #[tokio::test]
    async fn faq_matches_are_listed_before_document_matches() {
        let embedder = HashingEmbedder::default();
        let store = ingested_store(&embedder).await;
        let search = SmartSearch::new(Arc::clone(&store), embedder);

        let reply = search.search("what is AML").await.expect("search");

        assert_eq!(reply.len(), 2);
        assert!(matches!(
            &reply[0],
            SearchReplyItem::Faq { question, .. } if question == "What is AML?"
        ));
        assert!(matches!(
            &reply[1],
            SearchReplyItem::Document { source_document, .. }
                if source_document == "AML Guideline 2024"
        ));
    }

    #[tokio::test]
    async fn document_hits_carry_the_source_title_and_id() {
        let embedder = HashingEmbedder::default();
        let store = ingested_store(&embedder).await;
        let search = SmartSearch::new(Arc::clone(&store), embedder);

        let reply = search.search("laundering controls payment").await.expect("search");
        let document = reply
            .iter()
            .find_map(|item| match item {
                SearchReplyItem::Document {
                    source_document,
                    document_id,
                    ..
                } => Some((source_document.clone(), *document_id)),
                _ => None,
            })
            .expect("a document hit");
        assert_eq!(document.0, "AML Guideline 2024");
        assert!(document.1 > 0);
    }

    #[tokio::test]
    async fn empty_queries_never_reach_the_store() {
        let store = Arc::new(TouchSensitiveStore::default());
        let search = SmartSearch::new(Arc::clone(&store), HashingEmbedder::default());

        for query in ["", "   ", "\n\t"] {
            let result = search.search(query).await;
            assert!(matches!(result, Err(SearchError::EmptyQuery)));
        }
        assert!(!store.touched.load(Ordering::SeqCst));
    }
}
