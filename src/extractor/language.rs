/// Small fixed per-language dictionaries used for a cheap language guess.
/// Not intended to be exhaustive — just common function words. Order is
/// significant: `en` is checked first so it wins ties (the scan below only
/// replaces the running best on a strict improvement), and the rest are in
/// a fixed order so results never depend on hashing.
const DICTIONARIES: &[(&str, &[&str])] = &[
    (
        "en",
        &[
            "the", "and", "is", "of", "to", "in", "a", "that", "it", "for", "on", "with", "as",
            "was", "are",
        ],
    ),
    (
        "es",
        &[
            "el", "la", "de", "que", "y", "en", "los", "se", "del", "las", "por", "un", "para",
            "con", "es",
        ],
    ),
    (
        "fr",
        &[
            "le", "la", "de", "et", "les", "des", "un", "une", "du", "dans", "est", "pour", "que",
            "qui", "sur",
        ],
    ),
];

/// Tallies occurrences of each dictionary's words over the first 100 tokens
/// of `text`, picks the language with the max count, defaulting to `en` and
/// deterministically preferring `en` (then dictionary order) on ties.
pub fn detect_language(text: &str) -> String {
    let tokens: Vec<String> = text
        .split_whitespace()
        .take(100)
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.is_empty() {
        return "en".to_string();
    }

    let mut best_lang = "en";
    let mut best_count = 0usize;
    for (lang, words) in DICTIONARIES.iter().copied() {
        let count = tokens.iter().filter(|t| words.contains(&t.as_str())).count();
        if count > best_count {
            best_count = count;
            best_lang = lang;
        }
    }
    best_lang.to_string()
}

/// Count of whitespace-separated non-empty tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().filter(|t| !t.is_empty()).count()
}
