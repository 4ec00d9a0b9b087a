// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Query planning: raw text to lexicon-resolved terms.
//!
//! Tokenization is whitespace splitting plus the same normalization the
//! indexer applied, so a query term can never miss the lexicon over case.
//! Missing terms follow the per-mode contract: OR drops them with a warning
//! and searches the rest; AND and PHRASE cannot possibly match, so the plan
//! comes back empty and the engine answers with an empty result set rather
//! than an error.

use tracing::warn;

use crate::index::Index;
use crate::types::{LexiconEntry, QueryMode};
use crate::utils::tokenize_query;

pub struct PlannedTerm<'a> {
    pub term: String,
    pub entry: &'a LexiconEntry,
}

pub struct QueryPlan<'a> {
    pub mode: QueryMode,
    pub terms: Vec<PlannedTerm<'a>>,
}

impl QueryPlan<'_> {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Barrels this plan touches, for cache preloading.
    pub fn barrel_ids(&self) -> Vec<u32> {
        self.terms.iter().map(|t| t.entry.barrel_id).collect()
    }
}

/// Resolve normalized terms against the lexicon under the given mode.
pub fn plan<'a>(index: &'a Index, terms: &[String], mode: QueryMode) -> QueryPlan<'a> {
    let mut planned = Vec::with_capacity(terms.len());
    for raw in terms {
        let term = crate::utils::normalize(raw);
        if term.is_empty() {
            continue;
        }
        match index.lexicon.get(&term) {
            Some(entry) => planned.push(PlannedTerm { term, entry }),
            None => {
                warn!(term = %term, "query term not in lexicon");
                if mode != QueryMode::Or {
                    // One missing conjunct empties the whole result set.
                    return QueryPlan {
                        mode,
                        terms: Vec::new(),
                    };
                }
            }
        }
    }
    QueryPlan {
        mode,
        terms: planned,
    }
}

/// Interactive-query syntax: `"..."` is a phrase, a leading `+` means AND,
/// anything else is OR.
pub fn parse_query(raw: &str) -> (QueryMode, Vec<String>) {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        return (
            QueryMode::Phrase,
            tokenize_query(&trimmed[1..trimmed.len() - 1]),
        );
    }
    if let Some(rest) = trimmed.strip_prefix('+') {
        return (QueryMode::And, tokenize_query(rest));
    }
    (QueryMode::Or, tokenize_query(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_modes() {
        assert_eq!(
            parse_query("machine learning"),
            (QueryMode::Or, vec!["machine".into(), "learning".into()])
        );
        assert_eq!(
            parse_query("+neural network"),
            (QueryMode::And, vec!["neural".into(), "network".into()])
        );
        assert_eq!(
            parse_query("\"deep learning\""),
            (QueryMode::Phrase, vec!["deep".into(), "learning".into()])
        );
    }

    #[test]
    fn test_parse_query_normalizes() {
        let (_, terms) = parse_query("Deep LEARNING");
        assert_eq!(terms, vec!["deep", "learning"]);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_query("   "), (QueryMode::Or, vec![]));
        assert_eq!(parse_query("\"\""), (QueryMode::Phrase, vec![]));
    }
}
