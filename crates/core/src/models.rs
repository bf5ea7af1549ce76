use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document metadata as handed to the store for the atomic ingestion commit.
/// The regulator is always the uploader's regulator, never caller-supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub regulator_id: i64,
    pub type_id: i64,
    pub storage_path: String,
    pub uploaded_by: i64,
    pub summary: String,
    pub checksum: String,
    pub service_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: i64,
    pub title: String,
    pub regulator_id: i64,
    pub type_id: i64,
    pub storage_path: String,
    pub uploaded_by: i64,
    pub summary: String,
    pub checksum: String,
    pub archived: bool,
    pub ingested_at: DateTime<Utc>,
}

/// One chunk of a document's extracted text, ready to persist. The ordinal is
/// the chunker's output position, so original text order survives store-level
/// reordering. The model tag pins the embedding model that produced the
/// vector; vectors carrying different tags are never ranked against each
/// other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub ordinal: u32,
    pub text: String,
    pub embedding: Vec<f32>,
    pub model_tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkHit {
    pub chunk_id: i64,
    pub document_id: i64,
    pub document_title: String,
    pub text: String,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqRecord {
    pub faq_id: i64,
    pub question: String,
    pub answer: String,
}

/// One entry of a smart-search reply. FAQ matches and chunk matches are not
/// on a comparable score scale, so the reply keeps them as distinct tagged
/// variants rather than pretending at a unified ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchReplyItem {
    Faq {
        question: String,
        answer: String,
    },
    Document {
        text: String,
        source_document: String,
        #[serde(rename = "documentID")]
        document_id: i64,
    },
}
