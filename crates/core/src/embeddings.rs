use crate::error::EmbeddingError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 128;

/// Maps text to a fixed-length dense vector. Implementations must be
/// deterministic for identical input and model version, and must report a
/// stable `model_tag`: vectors from different tags are never comparable and
/// the stores refuse to mix them.
#[async_trait]
pub trait Embedder {
    fn model_tag(&self) -> &str;
    fn dimensions(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[async_trait]
impl<T> Embedder for Arc<T>
where
    T: Embedder + Send + Sync + ?Sized,
{
    fn model_tag(&self) -> &str {
        (**self).model_tag()
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(text).await
    }
}

/// The embedding model degrades on embedded line breaks, so every
/// implementation feeds it a single-line rendition of the input.
fn single_line(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

/// Local, deterministic character-trigram embedder. Hashes each trigram into
/// a bucket and L2-normalises the histogram. Used for offline operation and
/// throughout the test suite; quality is far below a learned model, but the
/// contract (fixed dimensions, determinism, zero distance to itself) holds.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    tag: String,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            tag: format!("local-trigram-{}", dimensions.max(1)),
        }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_tag(&self) -> &str {
        &self.tag
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0f32; self.dimensions];
        let lowered = single_line(text).to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        for window in chars.windows(3) {
            let bucket = (fnv1a(window) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        Ok(vector)
    }
}

fn fnv1a(window: &[char]) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for c in window {
        let mut buffer = [0u8; 4];
        for byte in c.encode_utf8(&mut buffer).bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
    }
    hash
}

#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimensions: usize,
    pub timeout: Duration,
}

/// Client for an OpenAI-style embeddings endpoint. Every call is bounded by
/// the configured timeout so a stalled model cannot hang an ingestion
/// request indefinitely.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint,
            api_key: config.api_key,
            model: config.model,
            dimensions: config.dimensions,
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_tag(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: single_line(text),
        };

        let mut call = self.client.post(&self.endpoint).json(&request);
        if let Some(api_key) = &self.api_key {
            call = call.bearer_auth(api_key);
        }

        let response = call.send().await?;
        if !response.status().is_success() {
            return Err(EmbeddingError::Response(format!(
                "embedding endpoint returned {}",
                response.status()
            )));
        }

        let payload: EmbeddingResponse = response.json().await?;
        let vector = payload
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| EmbeddingError::Response("response carried no embedding".to_string()))?;

        if vector.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                got: vector.len(),
            });
        }

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::{Embedder, HashingEmbedder};

    #[tokio::test]
    async fn embedder_is_deterministic() {
        let embedder = HashingEmbedder::default();
        let first = embedder.embed("prudential reporting deadlines").await.unwrap();
        let second = embedder.embed("prudential reporting deadlines").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn embedder_outputs_configured_length() {
        let embedder = HashingEmbedder::new(32);
        let vector = embedder.embed("abc").await.unwrap();
        assert_eq!(vector.len(), 32);
        assert_eq!(embedder.dimensions(), 32);
    }

    #[tokio::test]
    async fn line_breaks_do_not_change_the_vector() {
        let embedder = HashingEmbedder::default();
        let with_breaks = embedder.embed("capital\nadequacy\r\nrules").await.unwrap();
        let flat = embedder.embed("capital adequacy  rules").await.unwrap();
        assert_eq!(with_breaks, flat);
    }

    #[tokio::test]
    async fn empty_text_embeds_to_the_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        let vector = embedder.embed("").await.unwrap();
        assert!(vector.iter().all(|v| *v == 0.0));
    }
}
