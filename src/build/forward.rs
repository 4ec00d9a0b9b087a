// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Forward-index records and the remap pass.
//!
//! While blocks are being built, forward records still name terms by string
//! because word ids do not exist until the merge has seen the whole corpus.
//! The remap pass runs after the merge: it streams every per-block forward
//! file, swaps each term for its word id from the final lexicon, and
//! concatenates the result into one `forward_index` file, one JSON record
//! per document, carrying the display metadata the query engine serves back.
//!
//! A term missing from the lexicon here means the pipeline is inconsistent;
//! it is logged and skipped rather than aborting a multi-hour build.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{QuarryError, Result};
use crate::index::lexicon::Lexicon;
use crate::types::WordId;

pub const FORWARD_INDEX_FILE: &str = "forward_index";

/// Per-document record inside a block forward file (terms by string).
#[derive(Debug, Serialize, Deserialize)]
pub struct BlockForwardRecord {
    pub docid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
    pub postings: Vec<BlockForwardPosting>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlockForwardPosting {
    pub term: String,
    pub positions: Vec<u32>,
}

/// Per-document record in the final forward index (terms by word id).
#[derive(Debug, Serialize, Deserialize)]
pub struct ForwardRecord {
    pub docid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
    pub postings: Vec<ForwardPosting>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForwardPosting {
    pub wordid: WordId,
    pub freq: u32,
    pub positions: Vec<u32>,
}

impl ForwardRecord {
    /// Document length as BM25 sees it: the sum of term frequencies.
    pub fn doc_length(&self) -> u32 {
        self.postings.iter().map(|p| p.freq).sum()
    }
}

/// Rewrite all block forward files into the final forward index.
pub fn remap_forward_blocks(
    out_dir: &Path,
    block_count: u32,
    lexicon: &Lexicon,
) -> Result<()> {
    let final_path = out_dir.join(FORWARD_INDEX_FILE);
    let mut writer = BufWriter::new(File::create(&final_path)?);

    for block_id in 0..block_count {
        let path = out_dir.join(super::block::forward_block_name(block_id));
        if !path.exists() {
            return Err(QuarryError::MissingInput { path });
        }
        let reader = BufReader::new(File::open(&path)?);

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let record: BlockForwardRecord = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(e) => {
                    warn!(
                        block = block_id,
                        line = line_no + 1,
                        error = %e,
                        "skipping malformed forward record"
                    );
                    continue;
                }
            };

            let mut postings = Vec::with_capacity(record.postings.len());
            for p in record.postings {
                match lexicon.get(&p.term) {
                    Some(entry) => postings.push(ForwardPosting {
                        wordid: entry.word_id,
                        freq: p.positions.len() as u32,
                        positions: p.positions,
                    }),
                    None => {
                        warn!(term = %p.term, doc = %record.docid, "term absent from lexicon");
                    }
                }
            }

            let remapped = ForwardRecord {
                docid: record.docid,
                title: record.title,
                authors: record.authors,
                pub_date: record.pub_date,
                postings,
            };
            serde_json::to_writer(&mut writer, &remapped)
                .map_err(|e| QuarryError::corrupt(format!("forward record serialize: {e}")))?;
            writer.write_all(b"\n")?;
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::lexicon::{write_lexicon, LEXICON_FILE};
    use crate::types::LexiconEntry;

    fn lexicon_with(terms: &[&str]) -> (tempfile::TempDir, Lexicon) {
        let dir = tempfile::tempdir().unwrap();
        let entries: Vec<LexiconEntry> = terms
            .iter()
            .enumerate()
            .map(|(i, t)| LexiconEntry {
                word_id: i as u32 + 1,
                term: t.to_string(),
                doc_freq: 1,
                coll_freq: 1,
                offset: 0,
                byte_len: 1,
                barrel_id: 0,
            })
            .collect();
        let path = dir.path().join(LEXICON_FILE);
        write_lexicon(&path, &entries).unwrap();
        let lex = Lexicon::load(&path).unwrap();
        (dir, lex)
    }

    #[test]
    fn test_remap_swaps_terms_for_word_ids() {
        let (dir, lex) = lexicon_with(&["brown", "quick"]);
        let block = BlockForwardRecord {
            docid: "d1".into(),
            title: Some("Foxes".into()),
            authors: None,
            pub_date: Some("2020".into()),
            postings: vec![
                BlockForwardPosting {
                    term: "quick".into(),
                    positions: vec![1, 5],
                },
                BlockForwardPosting {
                    term: "unknownterm".into(),
                    positions: vec![9],
                },
            ],
        };
        let block_path = dir.path().join(super::super::block::forward_block_name(0));
        std::fs::write(
            &block_path,
            format!("{}\n", serde_json::to_string(&block).unwrap()),
        )
        .unwrap();

        remap_forward_blocks(dir.path(), 1, &lex).unwrap();

        let contents = std::fs::read_to_string(dir.path().join(FORWARD_INDEX_FILE)).unwrap();
        let record: ForwardRecord = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(record.docid, "d1");
        assert_eq!(record.title.as_deref(), Some("Foxes"));
        // "quick" is word 2; the unknown term is dropped.
        assert_eq!(record.postings.len(), 1);
        assert_eq!(record.postings[0].wordid, 2);
        assert_eq!(record.postings[0].freq, 2);
        assert_eq!(record.doc_length(), 2);
    }
}
