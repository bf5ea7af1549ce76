use crate::error::IngestError;
use lopdf::Document;

/// Text extraction from uploaded bytes. Treated as a black box by the
/// ingestion pipeline: an error here degrades to empty text rather than
/// failing the upload.
pub trait PdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, IngestError> {
        let document =
            Document::load_mem(bytes).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut text = String::new();
        for (page_no, _page_id) in document.get_pages() {
            let page_text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;
            text.push_str(&page_text);
            text.push('\n');
        }

        Ok(text)
    }
}
