// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Autocomplete: offline prefix-table build, constant-time lookup service.
//!
//! The builder walks the lexicon (word-id order, so deterministic), emits
//! every prefix of 2..=MAX_PREFIX characters per term, scores candidates by
//! `ln(1+df) · ln(1+cf)`, and keeps the top K per prefix. The result is a
//! flat `prefix → suggestions` hash map: no trie, no tree walk at query
//! time, just one hash lookup. Depth beyond MAX_PREFIX degrades gracefully:
//! the server truncates longer queries to the built depth.
//!
//! Prefixes are generated on character boundaries. The lexicon is mostly
//! ASCII after stemming, but "naïve" must not split its ï in half.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rayon::prelude::*;

use crate::binary::autocomplete::{decode_table, encode_table};
use crate::error::{QuarryError, Result};
use crate::index::lexicon::Lexicon;
use crate::types::Suggestion;

pub const AUTOCOMPLETE_FILE: &str = "autocomplete.idx";

/// Shortest prefix served.
pub const MIN_PREFIX_CHARS: usize = 2;

pub const DEFAULT_MAX_PREFIX: usize = 15;
pub const DEFAULT_TOP_K: usize = 20;

/// Popularity: smooth, monotone in both document and collection frequency.
pub fn popularity(doc_freq: u32, coll_freq: u64) -> f64 {
    (1.0 + f64::from(doc_freq)).ln() * (1.0 + coll_freq as f64).ln()
}

#[derive(Debug, Clone, Copy)]
pub struct SuggestBuildConfig {
    pub max_prefix: usize,
    pub top_k: usize,
}

impl Default for SuggestBuildConfig {
    fn default() -> Self {
        SuggestBuildConfig {
            max_prefix: DEFAULT_MAX_PREFIX,
            top_k: DEFAULT_TOP_K,
        }
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Build the prefix table from a loaded lexicon.
pub fn build_table(
    lexicon: &Lexicon,
    config: &SuggestBuildConfig,
) -> HashMap<String, Vec<Suggestion>> {
    let mut table: HashMap<String, Vec<Suggestion>> = HashMap::new();

    for entry in lexicon.iter() {
        let term = &entry.term;
        for (count, (idx, ch)) in term.char_indices().enumerate() {
            let char_len = count + 1;
            if char_len > config.max_prefix {
                break;
            }
            if char_len < MIN_PREFIX_CHARS {
                continue;
            }
            let prefix = term[..idx + ch.len_utf8()].to_string();
            table.entry(prefix).or_default().push(Suggestion {
                term: term.clone(),
                popularity: popularity(entry.doc_freq, entry.coll_freq),
                word_id: entry.word_id,
                doc_freq: entry.doc_freq,
                coll_freq: entry.coll_freq,
            });
        }
    }

    // Sort and prune each prefix independently; term as tiebreak keeps the
    // table deterministic when popularities collide.
    table.par_iter_mut().for_each(|(_, suggestions)| {
        suggestions.sort_by(|a, b| {
            b.popularity
                .total_cmp(&a.popularity)
                .then_with(|| a.term.cmp(&b.term))
        });
        suggestions.truncate(config.top_k);
    });

    table
}

/// Serialize the table to its binary file.
pub fn write_table(table: &HashMap<String, Vec<Suggestion>>, path: &Path) -> Result<()> {
    let mut buf = Vec::new();
    encode_table(table, &mut buf);
    fs::write(path, buf)?;
    Ok(())
}

/// Human-readable sidecar for eyeballing the build, top five per prefix.
pub fn write_readable_dump(table: &HashMap<String, Vec<Suggestion>>, path: &Path) -> Result<()> {
    use std::io::Write;
    let mut out = std::io::BufWriter::new(fs::File::create(path)?);

    let mut prefixes: Vec<&String> = table.keys().collect();
    prefixes.sort();

    for prefix in prefixes {
        let suggestions = &table[prefix];
        writeln!(out, "PREFIX: {} ({} suggestions)", prefix, suggestions.len())?;
        for (i, s) in suggestions.iter().take(5).enumerate() {
            writeln!(
                out,
                "  {}. {} (pop={:.2}, df={}, cf={})",
                i + 1,
                s.term,
                s.popularity,
                s.doc_freq,
                s.coll_freq
            )?;
        }
        if suggestions.len() > 5 {
            writeln!(out, "  ... and {} more", suggestions.len() - 5)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

// ============================================================================
// SERVER
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct SuggestStats {
    pub prefixes: usize,
    pub suggestions: usize,
    pub min_per_prefix: usize,
    pub max_per_prefix: usize,
}

/// The loaded table, answering prefix lookups in constant expected time.
pub struct AutocompleteIndex {
    table: HashMap<String, Vec<Suggestion>>,
    /// Deepest prefix the builder emitted; longer queries truncate to it.
    max_prefix: usize,
}

impl AutocompleteIndex {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QuarryError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let bytes = fs::read(path)?;
        Ok(Self::from_table(decode_table(&bytes)?))
    }

    pub fn from_table(table: HashMap<String, Vec<Suggestion>>) -> Self {
        let max_prefix = table
            .keys()
            .map(|p| p.chars().count())
            .max()
            .unwrap_or(DEFAULT_MAX_PREFIX);
        AutocompleteIndex { table, max_prefix }
    }

    /// Up to `limit` suggestions for `prefix`, best first. Prefixes shorter
    /// than two characters return nothing.
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<Suggestion> {
        let normalized = prefix.trim().to_lowercase();
        let char_count = normalized.chars().count();
        if char_count < MIN_PREFIX_CHARS {
            return Vec::new();
        }

        let key: String = if char_count > self.max_prefix {
            normalized.chars().take(self.max_prefix).collect()
        } else {
            normalized
        };

        match self.table.get(&key) {
            Some(suggestions) => suggestions.iter().take(limit).cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn stats(&self) -> SuggestStats {
        let mut stats = SuggestStats {
            prefixes: self.table.len(),
            ..Default::default()
        };
        stats.min_per_prefix = usize::MAX;
        for suggestions in self.table.values() {
            stats.suggestions += suggestions.len();
            stats.min_per_prefix = stats.min_per_prefix.min(suggestions.len());
            stats.max_per_prefix = stats.max_per_prefix.max(suggestions.len());
        }
        if self.table.is_empty() {
            stats.min_per_prefix = 0;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LexiconEntry;

    fn lexicon_of(terms: &[(&str, u32, u64)]) -> Lexicon {
        let entries = terms
            .iter()
            .enumerate()
            .map(|(i, (term, df, cf))| LexiconEntry {
                word_id: i as u32 + 1,
                term: term.to_string(),
                doc_freq: *df,
                coll_freq: *cf,
                offset: 0,
                byte_len: 1,
                barrel_id: 0,
            })
            .collect();
        Lexicon::from_entries(entries)
    }

    #[test]
    fn test_build_orders_by_popularity() {
        // quick has df=2: it must lead every "qui*" prefix.
        let lexicon = lexicon_of(&[("quick", 2, 3), ("quiet", 1, 1), ("quilt", 1, 1)]);
        let table = build_table(&lexicon, &SuggestBuildConfig::default());

        let qui = &table["qui"];
        assert_eq!(qui[0].term, "quick");
        assert_eq!(qui.len(), 3);
        // Equal popularity falls back to term order.
        assert_eq!(qui[1].term, "quiet");
        assert_eq!(qui[2].term, "quilt");

        // All prefix depths from 2 to term length exist.
        assert!(table.contains_key("qu"));
        assert!(table.contains_key("quick"));
        assert!(!table.contains_key("q"));
    }

    #[test]
    fn test_top_k_truncation() {
        let terms: Vec<(String, u32, u64)> = (0..30)
            .map(|i| (format!("zz{:02}", i), i + 1, u64::from(i + 1)))
            .collect();
        let borrowed: Vec<(&str, u32, u64)> =
            terms.iter().map(|(t, df, cf)| (t.as_str(), *df, *cf)).collect();
        let lexicon = lexicon_of(&borrowed);

        let config = SuggestBuildConfig {
            top_k: 5,
            ..Default::default()
        };
        let table = build_table(&lexicon, &config);
        let zz = &table["zz"];
        assert_eq!(zz.len(), 5);
        // Highest df/cf first.
        assert_eq!(zz[0].term, "zz29");
        for pair in zz.windows(2) {
            assert!(pair[0].popularity >= pair[1].popularity);
        }
    }

    #[test]
    fn test_suggest_roundtrip_through_file() {
        let lexicon = lexicon_of(&[("quick", 2, 3), ("quiet", 1, 1)]);
        let table = build_table(&lexicon, &SuggestBuildConfig::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(AUTOCOMPLETE_FILE);
        write_table(&table, &path).unwrap();

        let index = AutocompleteIndex::load(&path).unwrap();
        let suggestions = index.suggest("qui", 10);
        assert_eq!(suggestions[0].term, "quick");
        assert_eq!(suggestions[0].doc_freq, 2);
    }

    #[test]
    fn test_suggest_edge_cases() {
        let lexicon = lexicon_of(&[("quick", 2, 3)]);
        let index = AutocompleteIndex::from_table(build_table(
            &lexicon,
            &SuggestBuildConfig::default(),
        ));

        // Too short.
        assert!(index.suggest("q", 10).is_empty());
        assert!(index.suggest("", 10).is_empty());
        // Case-insensitive.
        assert_eq!(index.suggest("QUI", 10)[0].term, "quick");
        // Unknown prefix.
        assert!(index.suggest("zz", 10).is_empty());
        // Limit respected.
        assert_eq!(index.suggest("qu", 1).len(), 1);
    }

    #[test]
    fn test_long_prefix_truncates_to_built_depth() {
        let lexicon = lexicon_of(&[("abcdef", 1, 1)]);
        let config = SuggestBuildConfig {
            max_prefix: 4,
            ..Default::default()
        };
        let index = AutocompleteIndex::from_table(build_table(&lexicon, &config));

        // "abcdef" is longer than the built depth of 4; it degrades to the
        // "abcd" bucket.
        let suggestions = index.suggest("abcdef", 10);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].term, "abcdef");
    }

    #[test]
    fn test_multibyte_terms_do_not_split() {
        let lexicon = lexicon_of(&[("naïve", 1, 1)]);
        let table = build_table(&lexicon, &SuggestBuildConfig::default());
        assert!(table.contains_key("na"));
        assert!(table.contains_key("naï"));
        assert!(table.contains_key("naïve"));
    }

    #[test]
    fn test_short_terms_skipped() {
        let lexicon = lexicon_of(&[("a", 5, 9)]);
        let table = build_table(&lexicon, &SuggestBuildConfig::default());
        assert!(table.is_empty());
    }

    #[test]
    fn test_readable_dump() {
        let lexicon = lexicon_of(&[("quick", 2, 3)]);
        let table = build_table(&lexicon, &SuggestBuildConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autocomplete.idx.txt");
        write_readable_dump(&table, &path).unwrap();
        let dump = std::fs::read_to_string(&path).unwrap();
        assert!(dump.contains("PREFIX: qui"));
        assert!(dump.contains("quick"));
    }
}
