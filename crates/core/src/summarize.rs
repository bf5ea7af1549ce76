use crate::chunking::chunk_words;
use crate::error::SummaryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stored in place of a summary when the summarizer fails or is not
/// configured. Summaries are best-effort and never block ingestion.
pub const SUMMARY_PLACEHOLDER: &str = "Summary could not be generated.";

/// How many words of document text go into a single summarization call.
const SUMMARY_CHUNK_WORDS: usize = 700;

/// How many leading chunks are summarized before the parts are re-combined.
const SUMMARY_MAX_CHUNKS: usize = 3;

#[async_trait]
pub trait Summarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError>;
}

#[derive(Debug, Clone)]
pub struct HttpSummarizerConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

/// Client for a chat-completions-style summarization endpoint. Long
/// documents are summarized in word-bounded chunks and the partial summaries
/// are re-combined into one string.
pub struct HttpSummarizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl HttpSummarizer {
    pub fn new(config: HttpSummarizerConfig) -> Result<Self, SummaryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint,
            api_key: config.api_key,
            model: config.model,
        })
    }

    async fn summarize_part(&self, part: &str) -> Result<String, SummaryError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "Summarise the following regulatory document excerpt in a few plain sentences.".to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: part.to_string(),
                },
            ],
            temperature: 0.2,
        };

        let mut call = self.client.post(&self.endpoint).json(&request);
        if let Some(api_key) = &self.api_key {
            call = call.bearer_auth(api_key);
        }

        let response = call.send().await?;
        if !response.status().is_success() {
            return Err(SummaryError::Response(format!(
                "summarizer endpoint returned {}",
                response.status()
            )));
        }

        let payload: ChatResponse = response.json().await?;
        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| SummaryError::Response("response carried no choices".to_string()))
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        let parts = chunk_words(text, SUMMARY_CHUNK_WORDS);
        if parts.is_empty() {
            return Ok(String::new());
        }

        let mut combined = Vec::new();
        for part in parts.iter().take(SUMMARY_MAX_CHUNKS) {
            combined.push(self.summarize_part(part).await?);
        }

        Ok(combined.join(" "))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}
