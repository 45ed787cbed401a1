//! Résumé document intake: turns an uploaded PDF into plain text.
//!
//! Parsing is CPU-bound and the underlying parser may panic on hostile input,
//! so it always runs on the blocking pool. A panic surfaces as `ExtractionError`.

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Number of characters shown in the extraction preview.
pub const PREVIEW_CHARS: usize = 1000;

const PDF_MAGIC: &[u8] = b"%PDF-";
/// Real files sometimes carry a few junk bytes before the header.
const HEADER_SEARCH_WINDOW: usize = 1024;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("uploaded document is empty")]
    Empty,

    #[error("document is not a PDF")]
    NotPdf,

    #[error("document is password protected")]
    Encrypted,

    #[error("failed to parse PDF: {0}")]
    Parse(String),

    #[error("PDF parser aborted: {0}")]
    Aborted(String),

    #[error("no text could be extracted from the document")]
    NoText,
}

/// An uploaded résumé. Lives for a single request.
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

impl ResumeDocument {
    pub fn new(file_name: Option<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name,
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub preview: String,
    pub chars: usize,
}

impl ExtractedText {
    pub fn new(text: String) -> Self {
        let preview = preview(&text);
        let chars = text.chars().count();
        Self {
            text,
            preview,
            chars,
        }
    }
}

/// Extracts the text of every page, in page order.
///
/// Returns an empty string for a PDF without a text layer; callers decide
/// whether that is acceptable.
pub async fn extract_text(document: &ResumeDocument) -> Result<String, ExtractionError> {
    sniff(&document.bytes)?;

    let bytes = document.bytes.clone();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| {
            warn!("PDF parser task failed: {e}");
            ExtractionError::Aborted(e.to_string())
        })?
        .map_err(|e| ExtractionError::Parse(e.to_string()))?;

    debug!(
        "Extracted {} chars from {}",
        text.len(),
        document.file_name.as_deref().unwrap_or("<unnamed>")
    );
    Ok(text)
}

/// Cheap structural checks that reject obvious non-PDF and encrypted uploads
/// before the parser sees them.
fn sniff(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::Empty);
    }
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if find(window, PDF_MAGIC).is_none() {
        return Err(ExtractionError::NotPdf);
    }
    if find(bytes, b"/Encrypt").is_some() {
        return Err(ExtractionError::Encrypted);
    }
    Ok(())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// First `PREVIEW_CHARS` characters, with `...` appended when truncated.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Builds a minimal single-page PDF with one line of Helvetica text.
#[cfg(test)]
pub(crate) fn single_page_pdf(line: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 720 Td ({line}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}
