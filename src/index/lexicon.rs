// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The lexicon: one row per distinct term.
//!
//! On disk it is a tab-separated text file, one line per term in word-id
//! order: `word_id term df cf offset byte_len barrel_id`. Because word ids
//! are assigned in merge emission order, iterating the file top to bottom
//! yields terms in ascending lexicographic order, which the autocomplete builder
//! relies on that.
//!
//! At query time the whole table lives in memory: a vector in word-id order
//! plus a term-keyed map into it. A million terms costs tens of megabytes,
//! which is the cheapest part of the engine.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{QuarryError, Result};
use crate::types::LexiconEntry;

pub const LEXICON_FILE: &str = "lexicon";

#[derive(Debug, Default)]
pub struct Lexicon {
    /// Entries in word-id (= lexicographic) order.
    entries: Vec<LexiconEntry>,
    by_term: HashMap<String, usize>,
}

impl Lexicon {
    /// Build directly from merge output, skipping the disk roundtrip.
    pub fn from_entries(entries: Vec<LexiconEntry>) -> Self {
        let by_term = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.term.clone(), i))
            .collect();
        Lexicon { entries, by_term }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QuarryError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let reader = BufReader::new(File::open(path)?);

        let mut entries = Vec::new();
        let mut by_term = HashMap::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let entry = parse_line(&line)
                .ok_or_else(|| QuarryError::corrupt(format!("lexicon line {}", line_no + 1)))?;
            by_term.insert(entry.term.clone(), entries.len());
            entries.push(entry);
        }

        Ok(Lexicon { entries, by_term })
    }

    pub fn get(&self, term: &str) -> Option<&LexiconEntry> {
        self.by_term.get(term).map(|&i| &self.entries[i])
    }

    /// Entries in word-id order.
    pub fn iter(&self) -> impl Iterator<Item = &LexiconEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_line(line: &str) -> Option<LexiconEntry> {
    let mut fields = line.split('\t');
    let word_id = fields.next()?.parse().ok()?;
    let term = fields.next()?.to_string();
    let doc_freq = fields.next()?.parse().ok()?;
    let coll_freq = fields.next()?.parse().ok()?;
    let offset = fields.next()?.parse().ok()?;
    let byte_len = fields.next()?.parse().ok()?;
    let barrel_id = fields.next()?.parse().ok()?;
    Some(LexiconEntry {
        word_id,
        term,
        doc_freq,
        coll_freq,
        offset,
        byte_len,
        barrel_id,
    })
}

/// Write lexicon rows. The merger hands entries in word-id order; control
/// characters in terms are squashed to spaces so the line format survives.
pub fn write_lexicon(path: &Path, entries: &[LexiconEntry]) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    for e in entries {
        let term: String = e
            .term
            .chars()
            .map(|c| if c == '\t' || c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            e.word_id, term, e.doc_freq, e.coll_freq, e.offset, e.byte_len, e.barrel_id
        )?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(word_id: u32, term: &str) -> LexiconEntry {
        LexiconEntry {
            word_id,
            term: term.to_string(),
            doc_freq: 2,
            coll_freq: 5,
            offset: 10 * word_id as u64,
            byte_len: 7,
            barrel_id: word_id % 4,
        }
    }

    #[test]
    fn test_write_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LEXICON_FILE);

        let entries = vec![entry(1, "alpha"), entry(2, "beta"), entry(3, "gamma")];
        write_lexicon(&path, &entries).unwrap();

        let lex = Lexicon::load(&path).unwrap();
        assert_eq!(lex.len(), 3);
        assert_eq!(lex.get("beta"), Some(&entries[1]));
        assert_eq!(lex.get("delta"), None);

        let terms: Vec<_> = lex.iter().map(|e| e.term.as_str()).collect();
        assert_eq!(terms, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_malformed_line_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LEXICON_FILE);
        std::fs::write(&path, "1\tonly-two-fields\n").unwrap();
        assert!(matches!(
            Lexicon::load(&path),
            Err(QuarryError::CorruptData { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Lexicon::load(&dir.path().join("absent")),
            Err(QuarryError::MissingInput { .. })
        ));
    }
}
