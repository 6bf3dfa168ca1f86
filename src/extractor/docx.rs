use std::path::Path;

use docx_rs::{DocumentChild, ParagraphChild, RunChild};

use crate::error::{AppError, AppResult};

/// Extracts raw text from a DOCX by walking its paragraph/run tree.
/// Informational oddities (unexpected node kinds, missing styles) are
/// logged, never surfaced as extraction failures.
pub fn extract(path: &Path) -> AppResult<String> {
    let bytes = std::fs::read(path).map_err(|e| AppError::ExtractionFailed {
        path: path.display().to_string(),
        source: e.into(),
    })?;

    let docx = docx_rs::read_docx(&bytes).map_err(|e| AppError::ExtractionFailed {
        path: path.display().to_string(),
        source: anyhow::anyhow!("{e:?}"),
    })?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            let mut line = String::new();
            for run_child in &paragraph.children {
                if let ParagraphChild::Run(run) = run_child {
                    for text_child in &run.children {
                        if let RunChild::Text(text) = text_child {
                            line.push_str(&text.text);
                        }
                    }
                }
            }
            if !line.trim().is_empty() {
                paragraphs.push(line);
            } else {
                tracing::debug!("skipping empty docx paragraph");
            }
        }
    }

    Ok(paragraphs.join("\n"))
}
