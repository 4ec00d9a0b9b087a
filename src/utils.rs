//! Small string helpers shared by the indexer and the query planner.

/// Normalize a term the way the upstream cleaner does: lowercase.
///
/// Terms arrive already stemmed and stripped; lowercasing here is belt and
/// suspenders so the block files, the lexicon, and query terms can never
/// disagree on case.
pub fn normalize(term: &str) -> String {
    term.to_lowercase()
}

/// Split a free-form query on whitespace into normalized tokens.
pub fn tokenize_query(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(normalize)
        .filter(|t| !t.is_empty())
        .collect()
}
