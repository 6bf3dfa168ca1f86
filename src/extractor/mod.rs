mod docx;
mod language;
mod pdf;
mod text;

use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::model::DocumentMetadata;

/// Tagged dispatch for the formats this extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pdf,
    Docx,
    Text,
    Markdown,
    Unsupported,
}

impl Format {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Format::Pdf,
            "docx" => Format::Docx,
            "txt" => Format::Text,
            "md" => Format::Markdown,
            _ => Format::Unsupported,
        }
    }
}

/// Converts a document URI (a filesystem path, in this implementation) into
/// `(text, metadata)`. Dispatches by lowercase extension; never panics.
pub fn extract(path: &Path) -> AppResult<(String, DocumentMetadata)> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();

    let (text, page_count, title, author) = match Format::from_extension(&ext) {
        Format::Pdf => pdf::extract(path)?,
        Format::Docx => (docx::extract(path)?, None, None, None),
        Format::Text | Format::Markdown => (text::extract(path)?, None, None, None),
        Format::Unsupported => return Err(AppError::UnsupportedFormat(ext)),
    };

    let metadata = DocumentMetadata {
        page_count,
        word_count: language::word_count(&text),
        language: language::detect_language(&text),
        author,
        title,
    };

    Ok((text, metadata))
}
