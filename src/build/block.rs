// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! SPIMI-style block builder.
//!
//! Accumulates `term → postings` in memory until an estimated byte budget is
//! hit, then spills the block to disk and starts over. Two files per block:
//!
//! - `block_N.inv`: one line per term, terms sorted:
//!   `term\tdocid:pos,pos;docid:pos,pos;…`
//! - `block_N.fwd.jsonl`: one JSON record per document with its term
//!   position lists and display metadata.
//!
//! Within a block, posting lists are in ascending doc id for free: internal
//! ids are assigned in arrival order and each document is appended once.
//! The byte counter is an estimate, not an accounting of real allocator
//! behavior, but it bounds memory to the right order of magnitude,
//! which is all SPIMI needs.
//!
//! I/O failures during a spill are fatal. A malformed input record never
//! reaches this type; the pipeline driver logs and skips those.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::build::cleaned::CleanedDoc;
use crate::build::forward::{BlockForwardPosting, BlockForwardRecord};
use crate::error::{QuarryError, Result};
use crate::types::DocId;

/// Default in-memory budget: 256 MiB.
pub const DEFAULT_BLOCK_BUDGET: u64 = 256 * 1024 * 1024;

pub fn inverted_block_name(block_id: u32) -> String {
    format!("block_{}.inv", block_id)
}

pub fn forward_block_name(block_id: u32) -> String {
    format!("block_{}.fwd.jsonl", block_id)
}

pub struct BlockBuilder {
    out_dir: PathBuf,
    budget: u64,
    dict: HashMap<String, Vec<(DocId, Vec<u32>)>>,
    forward: Vec<BlockForwardRecord>,
    bytes_estimate: u64,
    blocks_written: u32,
}

impl BlockBuilder {
    pub fn new(out_dir: &Path, budget: u64) -> Self {
        BlockBuilder {
            out_dir: out_dir.to_path_buf(),
            budget: budget.max(1),
            dict: HashMap::new(),
            forward: Vec::new(),
            bytes_estimate: 0,
            blocks_written: 0,
        }
    }

    /// Add one document's tokens to the current block, spilling first the
    /// moment the budget is met or exceeded.
    pub fn add_document(&mut self, doc_id: DocId, ext_id: &str, doc: &CleanedDoc) -> Result<()> {
        let term_positions = doc.term_positions();

        let mut forward_postings = Vec::with_capacity(term_positions.len());
        for (term, positions) in term_positions {
            // Term string + per-position payload + map/vec overhead. Counted
            // twice (dict + forward) because both copies are resident.
            self.bytes_estimate +=
                2 * (term.len() as u64 + 24 + 8 * positions.len() as u64) + 32;

            forward_postings.push(BlockForwardPosting {
                term: term.clone(),
                positions: positions.clone(),
            });
            self.dict.entry(term).or_default().push((doc_id, positions));
        }

        self.forward.push(BlockForwardRecord {
            docid: ext_id.to_string(),
            title: doc.title.clone(),
            authors: doc.authors.clone(),
            pub_date: doc.pub_date.clone(),
            postings: forward_postings,
        });
        self.bytes_estimate += ext_id.len() as u64 + 64;

        if self.bytes_estimate >= self.budget {
            self.flush()?;
        }
        Ok(())
    }

    pub fn blocks_written(&self) -> u32 {
        self.blocks_written
    }

    /// Spill whatever remains and return the total block count.
    pub fn finish(mut self) -> Result<u32> {
        if !self.dict.is_empty() || !self.forward.is_empty() {
            self.flush()?;
        }
        Ok(self.blocks_written)
    }

    fn flush(&mut self) -> Result<()> {
        let block_id = self.blocks_written;

        self.write_inverted_block(block_id)?;
        self.write_forward_block(block_id)?;

        self.dict.clear();
        self.forward.clear();
        self.bytes_estimate = 0;
        self.blocks_written += 1;
        Ok(())
    }

    fn write_inverted_block(&self, block_id: u32) -> Result<()> {
        let path = self.out_dir.join(inverted_block_name(block_id));
        let mut w = BufWriter::new(File::create(&path)?);

        // Blocks are independently sorted by term; the merger depends on it.
        let mut terms: Vec<&String> = self.dict.keys().collect();
        terms.sort_unstable();

        for term in terms {
            let postings = &self.dict[term];
            write!(w, "{}\t", term)?;
            for (i, (doc_id, positions)) in postings.iter().enumerate() {
                if i > 0 {
                    write!(w, ";")?;
                }
                write!(w, "{}:", doc_id)?;
                for (j, pos) in positions.iter().enumerate() {
                    if j > 0 {
                        write!(w, ",")?;
                    }
                    write!(w, "{}", pos)?;
                }
            }
            writeln!(w)?;
        }
        w.flush()?;
        Ok(())
    }

    fn write_forward_block(&self, block_id: u32) -> Result<()> {
        let path = self.out_dir.join(forward_block_name(block_id));
        let mut w = BufWriter::new(File::create(&path)?);
        for record in &self.forward {
            serde_json::to_writer(&mut w, record)
                .map_err(|e| QuarryError::corrupt(format!("forward block serialize: {e}")))?;
            w.write_all(b"\n")?;
        }
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(ext_id: &str, tokens: &[(&str, u32)]) -> CleanedDoc {
        let tokens_json: Vec<String> = tokens
            .iter()
            .map(|(t, p)| format!(r#"{{"term":"{}","pos":{}}}"#, t, p))
            .collect();
        let line = format!(
            r#"{{"docid":"{}","fields":[{{"tokens":[{}]}}]}}"#,
            ext_id,
            tokens_json.join(",")
        );
        CleanedDoc::parse_line(&line, 1).unwrap()
    }

    #[test]
    fn test_single_block_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = BlockBuilder::new(dir.path(), DEFAULT_BLOCK_BUDGET);

        builder
            .add_document(1, "d1", &doc("d1", &[("quick", 1), ("fox", 3), ("quick", 0)]))
            .unwrap();
        builder
            .add_document(2, "d2", &doc("d2", &[("fox", 0)]))
            .unwrap();
        let blocks = builder.finish().unwrap();
        assert_eq!(blocks, 1);

        let inv = std::fs::read_to_string(dir.path().join(inverted_block_name(0))).unwrap();
        // Terms sorted, positions ascending, docs ascending.
        assert_eq!(inv, "fox\t1:3;2:0\nquick\t1:0,1\n");

        let fwd = std::fs::read_to_string(dir.path().join(forward_block_name(0))).unwrap();
        assert_eq!(fwd.lines().count(), 2);
    }

    #[test]
    fn test_budget_forces_spill() {
        let dir = tempfile::tempdir().unwrap();
        // A budget of one byte flushes after every document.
        let mut builder = BlockBuilder::new(dir.path(), 1);
        builder
            .add_document(1, "d1", &doc("d1", &[("alpha", 0)]))
            .unwrap();
        assert_eq!(builder.blocks_written(), 1);
        builder
            .add_document(2, "d2", &doc("d2", &[("beta", 0)]))
            .unwrap();
        let blocks = builder.finish().unwrap();
        assert_eq!(blocks, 2);
        assert!(dir.path().join(inverted_block_name(1)).exists());
    }

    #[test]
    fn test_finish_without_documents() {
        let dir = tempfile::tempdir().unwrap();
        let builder = BlockBuilder::new(dir.path(), DEFAULT_BLOCK_BUDGET);
        assert_eq!(builder.finish().unwrap(), 0);
    }
}
