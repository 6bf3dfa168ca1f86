use std::collections::HashSet;

use crate::model::{Attribution, ContextPack, SearchResult};

/// Minimum remaining budget (characters) required to append a truncated
/// tail chunk instead of stopping silently.
const MIN_TRUNCATION_SPACE: usize = 100;

/// Sorts by score descending, deduplicates by `doc_id` keeping the
/// highest-scoring chunk per document, then greedily emits chunks into a
/// budget-respecting text buffer with attribution records.
pub fn assemble(results: Vec<SearchResult>, max_len: usize) -> ContextPack {
    let mut sorted = results;
    sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen_docs = HashSet::new();
    let deduped: Vec<SearchResult> = sorted
        .into_iter()
        .filter(|r| seen_docs.insert(r.doc_id.clone()))
        .collect();

    let total_results = deduped.len();
    let mut answer_context = String::new();
    let mut attributions = Vec::new();

    for result in &deduped {
        let separator_len = if answer_context.is_empty() { 0 } else { 2 };
        let needed = separator_len + result.snippet.len();

        if answer_context.len() + needed <= max_len {
            if !answer_context.is_empty() {
                answer_context.push_str("\n\n");
            }
            answer_context.push_str(&result.snippet);
            attributions.push(Attribution {
                doc_id: result.doc_id.clone(),
                chunk_id: result.chunk_id.clone(),
                filename: result.filename.clone(),
                range_hint: format!("Chunk {}", result.chunk_index + 1),
                score: result.score,
            });
            continue;
        }

        let separator_len = if answer_context.is_empty() { 0 } else { 2 };
        let remaining = max_len.saturating_sub(answer_context.len() + separator_len);
        if remaining >= MIN_TRUNCATION_SPACE {
            let cut = truncate_at_char_boundary(&result.snippet, remaining.saturating_sub(3));
            if !answer_context.is_empty() {
                answer_context.push_str("\n\n");
            }
            answer_context.push_str(&cut);
            answer_context.push_str("...");
            attributions.push(Attribution {
                doc_id: result.doc_id.clone(),
                chunk_id: result.chunk_id.clone(),
                filename: result.filename.clone(),
                range_hint: format!("Chunk {} (truncated)", result.chunk_index + 1),
                score: result.score,
            });
        }
        break;
    }

    ContextPack {
        answer_context,
        attributions,
        total_results,
        response_time_ms: 0,
    }
}

fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(doc_id: &str, chunk_id: &str, chunk_index: usize, score: f32, text: &str) -> SearchResult {
        SearchResult {
            chunk_id: chunk_id.to_string(),
            doc_id: doc_id.to_string(),
            filename: format!("{doc_id}.txt"),
            chunk_index,
            snippet: text.to_string(),
            score,
        }
    }

    #[test]
    fn dedups_by_doc_id_keeping_highest_score() {
        let results = vec![
            result("d1", "c1", 0, 0.5, "low score chunk"),
            result("d1", "c2", 1, 0.9, "high score chunk"),
        ];
        let pack = assemble(results, 4000);
        assert_eq!(pack.attributions.len(), 1);
        assert_eq!(pack.attributions[0].chunk_id, "c2");
    }

    #[test]
    fn total_results_is_post_dedup_count() {
        let results = vec![
            result("d1", "c1", 0, 0.9, "a"),
            result("d1", "c2", 1, 0.5, "b"),
            result("d2", "c3", 0, 0.7, "c"),
        ];
        let pack = assemble(results, 4000);
        assert_eq!(pack.total_results, 2);
    }

    #[test]
    fn budget_is_respected_with_truncation() {
        let results: Vec<SearchResult> = (0..20)
            .map(|i| result(&format!("d{i}"), &format!("c{i}"), 0, 1.0, &"x".repeat(500)))
            .collect();
        let pack = assemble(results, 4000);
        assert!(pack.answer_context.len() <= 4000);

        let truncated_count = pack
            .attributions
            .iter()
            .filter(|a| a.range_hint.contains("truncated"))
            .count();
        assert!(truncated_count <= 1);
        if truncated_count == 1 {
            assert!(pack.attributions.last().unwrap().range_hint.contains("truncated"));
        }
    }

    #[test]
    fn range_hint_uses_one_based_chunk_index() {
        let results = vec![result("d1", "c1", 0, 1.0, "short")];
        let pack = assemble(results, 4000);
        assert_eq!(pack.attributions[0].range_hint, "Chunk 1");
    }

    #[test]
    fn single_chunk_well_under_budget_is_not_truncated() {
        let results = vec![result("d1", "c1", 0, 1.0, "lazy dog snippet")];
        let pack = assemble(results, 4000);
        assert_eq!(pack.attributions.len(), 1);
        assert!(!pack.attributions[0].range_hint.contains("truncated"));
        assert_eq!(pack.answer_context, "lazy dog snippet");
    }
}
