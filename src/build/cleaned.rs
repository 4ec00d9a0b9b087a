// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Schema for the cleaned-document input stream.
//!
//! One JSON record per line. The upstream cleaner has already tokenized,
//! lowercased, stemmed, and stripped stopwords; what arrives here is an
//! external document id, optional display metadata, and per-field token
//! streams of `(term, position)`. The indexer is agnostic to fields: all
//! tokens collapse into one flat position stream per document.
//!
//! A line that fails to parse is a `MalformedRecord`; the block builder
//! logs it and moves on. A missing or unusable `docid` is malformed too.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{QuarryError, Result};
use crate::utils::normalize;

#[derive(Debug, Deserialize)]
pub struct CleanedDoc {
    pub docid: ExtId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default)]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub fields: Vec<CleanedField>,
}

#[derive(Debug, Deserialize)]
pub struct CleanedField {
    #[serde(default)]
    pub tokens: Vec<CleanedToken>,
}

#[derive(Debug, Deserialize)]
pub struct CleanedToken {
    pub term: String,
    pub pos: u32,
}

/// External ids are usually strings ("PMC123…") but some corpora emit bare
/// numbers; accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ExtId {
    Text(String),
    Number(u64),
}

impl ExtId {
    pub fn into_string(self) -> String {
        match self {
            ExtId::Text(s) => s,
            ExtId::Number(n) => n.to_string(),
        }
    }
}

impl CleanedDoc {
    /// Parse one input line. `line_no` is 1-based and only used for the
    /// error message.
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self> {
        let doc: CleanedDoc =
            serde_json::from_str(line).map_err(|e| QuarryError::MalformedRecord {
                line: line_no,
                reason: e.to_string(),
            })?;
        Ok(doc)
    }

    /// Collapse all fields into per-term ascending position lists, terms
    /// sorted so downstream output is deterministic.
    pub fn term_positions(&self) -> Vec<(String, Vec<u32>)> {
        let mut agg: HashMap<String, Vec<u32>> = HashMap::new();
        for field in &self.fields {
            for token in &field.tokens {
                let term = normalize(&token.term);
                if term.is_empty() {
                    continue;
                }
                agg.entry(term).or_default().push(token.pos);
            }
        }
        let mut out: Vec<(String, Vec<u32>)> = agg
            .into_iter()
            .map(|(term, mut positions)| {
                positions.sort_unstable();
                (term, positions)
            })
            .collect();
        out.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_record() {
        let line = r#"{"docid":"PMC1","title":"On Foxes","fields":[{"tokens":[{"term":"Quick","pos":0},{"term":"fox","pos":1},{"term":"quick","pos":4}]}]}"#;
        let doc = CleanedDoc::parse_line(line, 1).unwrap();
        assert_eq!(doc.title.as_deref(), Some("On Foxes"));

        let terms = doc.term_positions();
        assert_eq!(
            terms,
            vec![
                ("fox".to_string(), vec![1]),
                ("quick".to_string(), vec![0, 4]),
            ]
        );
    }

    #[test]
    fn test_numeric_docid() {
        let line = r#"{"docid":42,"fields":[]}"#;
        let doc = CleanedDoc::parse_line(line, 1).unwrap();
        assert_eq!(doc.docid.into_string(), "42");
    }

    #[test]
    fn test_malformed_line() {
        let err = CleanedDoc::parse_line("{not json", 7).unwrap_err();
        match err {
            QuarryError::MalformedRecord { line, .. } => assert_eq!(line, 7),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_multiple_fields_flatten() {
        let line = r#"{"docid":"d","fields":[{"tokens":[{"term":"a","pos":0}]},{"tokens":[{"term":"a","pos":3},{"term":"b","pos":4}]}]}"#;
        let doc = CleanedDoc::parse_line(line, 1).unwrap();
        let terms = doc.term_positions();
        assert_eq!(terms[0], ("a".to_string(), vec![0, 3]));
        assert_eq!(terms[1], ("b".to_string(), vec![4]));
    }
}
