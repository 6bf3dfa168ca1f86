use regex::Regex;
use std::sync::LazyLock;

use crate::model::Chunk;

static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+.*$").unwrap());
static NUMBERED_SECTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\d+\.\s").unwrap());
static ALL_CAPS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[A-Z][A-Z0-9 \t\-_:]{2,}$").unwrap());
static CHAPTER_SECTION_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^(Chapter\s+\d+|Section\s+\d+|Part\s+([IVXLCDM]+|\d+))\b.*$").unwrap()
});
static BLANK_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());
static SENTENCE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

/// Splits text into ordered chunks with a three-stage fallback: heading →
/// paragraph → sentence. Deterministic for a given `(text, doc_id,
/// chunk_size, overlap)`.
pub fn chunk(text: &str, doc_id: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let heading_chunks = heading_based(text, doc_id, chunk_size, overlap);
    if !heading_chunks.is_empty() {
        return heading_chunks;
    }

    let paragraph_chunks = paragraph_based(text, doc_id, chunk_size, overlap, "para");
    if !paragraph_chunks.is_empty() {
        return paragraph_chunks;
    }

    sentence_based(text, doc_id, chunk_size, overlap)
}

fn make_chunk(doc_id: &str, prefix: &str, index: usize, text: String) -> Chunk {
    let tokens = Chunk::estimate_tokens(&text);
    Chunk {
        chunk_id: format!("{doc_id}_{prefix}_chunk_{index}"),
        doc_id: doc_id.to_string(),
        text,
        chunk_index: index,
        tokens,
    }
}

/// Splits `text` on markdown headers, numbered sections, ALL-CAPS lines, and
/// `Chapter`/`Section`/`Part` markers, in that order, each applied to the
/// current list of sections. Oversize sections fall back to paragraph-based
/// splitting, recursively.
fn heading_based(text: &str, doc_id: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let mut sections = vec![text.to_string()];

    for splitter in [
        split_keeping_marker(&MARKDOWN_HEADING),
        split_keeping_marker(&NUMBERED_SECTION),
        split_keeping_marker(&ALL_CAPS_LINE),
        split_keeping_marker(&CHAPTER_SECTION_PART),
    ] {
        sections = sections.iter().flat_map(|s| splitter(s)).collect();
    }

    let sections: Vec<String> = sections
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    // A single surviving section means no heading marker actually split
    // anything — fall through to paragraph-based instead.
    if sections.len() < 2 {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut index = 0usize;
    for section in sections {
        if section.len() > chunk_size {
            let sub = paragraph_based(&section, doc_id, chunk_size, overlap, "heading");
            for mut c in sub {
                c.chunk_index = index;
                c.chunk_id = format!("{doc_id}_heading_chunk_{index}");
                index += 1;
                out.push(c);
            }
        } else {
            out.push(make_chunk(doc_id, "heading", index, section));
            index += 1;
        }
    }
    out
}

/// Returns a closure splitting a block of text into sections at each line
/// matched by `marker`, keeping the marker line as the start of its section.
fn split_keeping_marker(marker: &'static Regex) -> impl Fn(&str) -> Vec<String> {
    move |block: &str| -> Vec<String> {
        let matches: Vec<_> = marker.find_iter(block).collect();
        if matches.is_empty() {
            return vec![block.to_string()];
        }

        let mut out = Vec::new();
        let mut section_starts = Vec::new();
        for m in &matches {
            let line_start = block[..m.start()].rfind('\n').map(|i| i + 1).unwrap_or(0);
            section_starts.push(line_start);
        }
        section_starts.dedup();

        if section_starts.first() != Some(&0) {
            out.push(block[..section_starts[0]].to_string());
        }
        for window in section_starts.windows(2) {
            out.push(block[window[0]..window[1]].to_string());
        }
        out.push(block[*section_starts.last().unwrap()..].to_string());
        out.into_iter().filter(|s| !s.trim().is_empty()).collect()
    }
}

/// Splits on blank lines and greedily packs paragraphs into chunks bounded
/// by `chunk_size`, emitting the current chunk before a paragraph that would
/// overflow it. A paragraph that already exceeds `chunk_size` on its own is
/// recursively sub-split (sentence boundaries, falling back to fixed
/// character windows) rather than emitted as one oversize chunk.
fn paragraph_based(
    text: &str,
    doc_id: &str,
    chunk_size: usize,
    overlap: usize,
    prefix: &str,
) -> Vec<Chunk> {
    let paragraphs: Vec<&str> = BLANK_LINE
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if paragraphs.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut index = 0usize;

    for para in paragraphs {
        if para.len() > chunk_size {
            if !current.trim().is_empty() {
                out.push(make_chunk(doc_id, prefix, index, current.clone()));
                index += 1;
                current.clear();
            }
            for piece in split_oversize(para, chunk_size, overlap) {
                out.push(make_chunk(doc_id, prefix, index, piece));
                index += 1;
            }
            continue;
        }

        if !current.is_empty() && current.len() + 2 + para.len() > chunk_size {
            out.push(make_chunk(doc_id, prefix, index, current.clone()));
            index += 1;
            current.clear();
        }

        if current.is_empty() {
            current.push_str(para);
        } else {
            current.push_str("\n\n");
            current.push_str(para);
        }
    }

    if !current.trim().is_empty() {
        out.push(make_chunk(doc_id, prefix, index, current));
    }

    out
}

/// Splits `text` into sentences at `[.!?]+` boundaries, trimmed and with
/// empties dropped. Pure tokenization, no size packing.
fn sentence_tokens(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last_end = 0usize;
    for m in SENTENCE_BOUNDARY.find_iter(text) {
        let sentence = text[last_end..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        last_end = m.end();
    }
    let tail = text[last_end..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Greedily packs already-split `units` into strings bounded by
/// `chunk_size`, seeding each new piece with the trailing `overlap`
/// characters of the previous one.
fn pack_with_overlap(units: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    if units.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut current = String::new();

    for unit in units {
        if !current.is_empty() && current.len() + 1 + unit.len() > chunk_size {
            out.push(current.clone());

            let mut overlap_start = current.len().saturating_sub(overlap);
            while overlap_start < current.len() && !current.is_char_boundary(overlap_start) {
                overlap_start += 1;
            }
            let seed = current[overlap_start..].to_string();
            current = seed;
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&unit);
        } else if current.is_empty() {
            current.push_str(&unit);
        } else {
            current.push(' ');
            current.push_str(&unit);
        }
    }

    if !current.trim().is_empty() {
        out.push(current);
    }

    out
}

/// Splits a single oversize block (a paragraph, or prose with no blank-line
/// or sentence structure at all) into pieces that fit `chunk_size`. Tries
/// sentence boundaries first; if that yields no split (e.g. unbroken
/// character runs with no `.`/`!`/`?`), falls back to fixed-size character
/// windows stepped by `chunk_size - overlap`, each seeded with `overlap`
/// characters of the previous window.
fn split_oversize(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let packed = pack_with_overlap(sentence_tokens(text), chunk_size, overlap);
    if packed.len() > 1 {
        return packed;
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut pieces = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + chunk_size).min(chars.len());
        let piece: String = chars[start..end].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed.to_string());
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    pieces
}

/// Splits on sentence boundaries and greedily packs sentences, seeding each
/// new chunk with the trailing `overlap` characters of the previous one.
fn sentence_based(text: &str, doc_id: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    pack_with_overlap(sentence_tokens(text), chunk_size, overlap)
        .into_iter()
        .enumerate()
        .map(|(index, piece)| make_chunk(doc_id, "sent", index, piece))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_sentence_plain_text_yields_one_chunk() {
        let text = "The quick brown fox jumps over the lazy dog.";
        let chunks = chunk(text, "doc1", 1000, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].tokens, text.len().div_ceil(4));
        assert_eq!(chunks[0].chunk_id, "doc1_sent_chunk_0");
    }

    #[test]
    fn heading_based_splits_on_markdown_atx() {
        let text = "# Intro\nAlpha.\n\n# Methods\nBeta gamma.\n";
        let chunks = chunk(text, "doc2", 1000, 100);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.contains("Intro"));
        assert!(chunks[0].text.contains("Alpha."));
        assert!(chunks[1].text.contains("Methods"));
        assert!(chunks[1].text.contains("Beta gamma."));
        let indices: Vec<_> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn paragraph_fallback_handles_oversize_paragraph() {
        let long_para = "x".repeat(2500);
        let text = format!("{long_para}\n\nend");
        let chunks = chunk(&text, "doc3", 1000, 100);
        assert!(chunks.len() >= 3);
        assert!(chunks.last().unwrap().text.contains("end"));
    }

    #[test]
    fn chunk_indices_are_contiguous() {
        let text = "# A\nfoo\n\n# B\nbar\n\n# C\nbaz\n";
        let chunks = chunk(text, "doc4", 1000, 100);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = "# A\nfoo bar baz.\n\n# B\nanother section here.\n";
        let a = chunk(text, "doc5", 1000, 100);
        let b = chunk(text, "doc5", 1000, 100);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.chunk_id, y.chunk_id);
            assert_eq!(x.text, y.text);
        }
    }

    #[test]
    fn no_chunk_is_empty_after_trim() {
        let text = "Some text.\n\n\n\nMore text. Even more.";
        let chunks = chunk(text, "doc6", 1000, 100);
        for c in &chunks {
            assert!(!c.text.trim().is_empty());
        }
    }

    #[test]
    fn sentence_based_seeds_overlap_into_next_chunk() {
        let sentence = "Word ".repeat(40);
        let text = format!("{sentence}. {sentence}. {sentence}.");
        let chunks = chunk(&text, "doc7", 120, 20);
        assert!(chunks.len() > 1);
    }
}
