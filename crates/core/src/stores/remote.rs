use crate::error::StoreError;
use crate::models::{ChunkHit, DocumentRecord, EmbeddedChunk, FaqRecord, NewDocument};
use crate::traits::{ChunkIndex, DocumentStore, FaqStore};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BACKEND: &str = "remote";

#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// JSON gateway to a vector-capable relational store service.
///
/// A whole ingestion travels in one request so the backend can commit the
/// document row, its service links, and every chunk row in a single
/// transaction; the chunk table's vector column carries the embeddings and
/// serves the nearest-neighbour queries.
pub struct RemoteStore {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RemoteStore {
    pub fn new(config: RemoteStoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.endpoint, path));
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }
        builder
    }

    fn backend_error(status: StatusCode) -> StoreError {
        // Status only; backend bodies are not surfaced to callers.
        StoreError::Backend {
            backend: BACKEND.to_string(),
            details: status.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct IngestionBody<'a> {
    document: &'a NewDocument,
    chunks: &'a [EmbeddedChunk],
}

#[derive(Debug, Deserialize)]
struct IngestionReply {
    document: DocumentRecord,
}

#[derive(Debug, Serialize)]
struct ReindexBody<'a> {
    summary: &'a str,
    chunks: &'a [EmbeddedChunk],
}

#[derive(Debug, Deserialize)]
struct ReindexReply {
    chunk_count: usize,
}

#[derive(Debug, Serialize)]
struct NearestBody<'a> {
    vector: &'a [f32],
    model_tag: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct NearestReply {
    hits: Vec<ChunkHit>,
}

#[derive(Debug, Serialize)]
struct FaqMatchBody<'a> {
    needle: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct FaqMatchReply {
    faqs: Vec<FaqRecord>,
}

#[derive(Debug, Deserialize)]
struct UploaderReply {
    regulator_id: Option<i64>,
}

#[async_trait]
impl DocumentStore for RemoteStore {
    async fn uploader_regulator(&self, user_id: i64) -> Result<Option<i64>, StoreError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/users/{user_id}/regulator"))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::backend_error(response.status()));
        }

        let reply: UploaderReply = response.json().await?;
        Ok(reply.regulator_id)
    }

    async fn commit_ingestion(
        &self,
        document: NewDocument,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<DocumentRecord, StoreError> {
        let body = IngestionBody {
            document: &document,
            chunks: &chunks,
        };
        let response = self
            .request(reqwest::Method::POST, "/ingestions")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response.status()));
        }

        let reply: IngestionReply = response.json().await?;
        Ok(reply.document)
    }

    async fn reindex_document(
        &self,
        document_id: i64,
        summary: String,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<usize, StoreError> {
        let body = ReindexBody {
            summary: &summary,
            chunks: &chunks,
        };
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/documents/{document_id}/chunks"),
            )
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::MissingDocument(document_id));
        }
        if !response.status().is_success() {
            return Err(Self::backend_error(response.status()));
        }

        let reply: ReindexReply = response.json().await?;
        Ok(reply.chunk_count)
    }

    async fn archive_document(&self, document_id: i64) -> Result<(), StoreError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/documents/{document_id}/archive"),
            )
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::MissingDocument(document_id));
        }
        if !response.status().is_success() {
            return Err(Self::backend_error(response.status()));
        }
        Ok(())
    }

    async fn restore_document(&self, document_id: i64) -> Result<(), StoreError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/documents/{document_id}/restore"),
            )
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::MissingDocument(document_id));
        }
        if !response.status().is_success() {
            return Err(Self::backend_error(response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChunkIndex for RemoteStore {
    async fn query_nearest(
        &self,
        vector: &[f32],
        model_tag: &str,
        k: usize,
    ) -> Result<Vec<ChunkHit>, StoreError> {
        let body = NearestBody {
            vector,
            model_tag,
            limit: k,
        };
        let response = self
            .request(reqwest::Method::POST, "/chunks/nearest")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response.status()));
        }

        let reply: NearestReply = response.json().await?;
        Ok(reply.hits)
    }
}

#[async_trait]
impl FaqStore for RemoteStore {
    async fn match_faqs(&self, needle: &str, limit: usize) -> Result<Vec<FaqRecord>, StoreError> {
        let body = FaqMatchBody { needle, limit };
        let response = self
            .request(reqwest::Method::POST, "/faqs/match")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response.status()));
        }

        let reply: FaqMatchReply = response.json().await?;
        Ok(reply.faqs)
    }
}
