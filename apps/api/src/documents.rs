use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("not a PDF document")]
    NotPdf,

    #[error("PDF text extraction failed: {0}")]
    Extraction(String),
}

const PDF_MAGIC: &[u8] = b"%PDF";

pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Extracts plain text from a PDF. Parsing runs on the blocking pool; a
/// panic inside the parser is reported as an extraction error.
pub async fn extract_pdf_text(bytes: Bytes) -> Result<String, DocumentError> {
    if !looks_like_pdf(&bytes) {
        return Err(DocumentError::NotPdf);
    }
    let extracted = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| DocumentError::Extraction(format!("parser aborted: {e}")))?;
    let text = extracted.map_err(|e| DocumentError::Extraction(e.to_string()))?;
    Ok(normalize_whitespace(&text))
}

/// Turns an uploaded file into plain text for analysis and indexing.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, bytes: Bytes) -> Result<String, DocumentError>;
}

pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, bytes: Bytes) -> Result<String, DocumentError> {
        extract_pdf_text(bytes).await
    }
}

/// Collapses runs of blank lines and trailing spaces left by PDF layout.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}
