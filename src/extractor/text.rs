use std::path::Path;

use crate::error::{AppError, AppResult};

/// Plain-text and Markdown extraction: read UTF-8, trim. Markdown's heading
/// structure is handled later by the chunker, not here.
pub fn extract(path: &Path) -> AppResult<String> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ExtractionFailed {
        path: path.display().to_string(),
        source: e.into(),
    })?;
    Ok(content.trim().to_string())
}
