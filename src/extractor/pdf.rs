use std::path::Path;

use lopdf::Document as PdfDocument;

use crate::config::PDF_BATCH_SIZE;
use crate::error::{AppError, AppResult};
use crate::model::DocumentMetadata;

/// Extracts text and best-effort metadata from a PDF, processing pages in
/// bounded batches so decoded text for only `PDF_BATCH_SIZE` pages is
/// resident at a time. Metadata extraction never fails the whole call.
pub fn extract(path: &Path) -> AppResult<(String, Option<u32>, Option<String>, Option<String>)> {
    let document = PdfDocument::load(path).map_err(|e| AppError::ExtractionFailed {
        path: path.display().to_string(),
        source: e.into(),
    })?;

    let pages = document.get_pages();
    let page_numbers: Vec<u32> = pages.keys().copied().collect();
    let page_count = page_numbers.len() as u32;

    let mut sections = Vec::new();
    for batch in page_numbers.chunks(PDF_BATCH_SIZE) {
        match document.extract_text(batch) {
            Ok(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    sections.push(trimmed.to_string());
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "failed to extract text for a pdf page batch, skipping");
            }
        }
        // `batch`'s decoded content is dropped here before the next
        // iteration begins.
    }

    let (title, author) = extract_info_dict(&document);

    Ok((sections.join("\n\n"), Some(page_count), title, author))
}

fn extract_info_dict(document: &PdfDocument) -> (Option<String>, Option<String>) {
    let info = (|| -> Option<&lopdf::Dictionary> {
        let info_ref = document.trailer.get(b"Info").ok()?;
        let info_id = info_ref.as_reference().ok()?;
        document.get_object(info_id).ok()?.as_dict().ok()
    })();

    let info = match info {
        Some(dict) => dict,
        None => return (None, None),
    };

    let title = info
        .get(b"Title")
        .ok()
        .and_then(|o| o.as_str().ok())
        .map(|bytes| String::from_utf8_lossy(bytes).to_string());
    let author = info
        .get(b"Author")
        .ok()
        .and_then(|o| o.as_str().ok())
        .map(|bytes| String::from_utf8_lossy(bytes).to_string());

    (title, author)
}
