// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! K-way merge of spilled blocks into barrels plus the lexicon.
//!
//! A binary heap tracks the current term of every block reader. For each
//! minimum term we gather the postings from every block carrying it, merge
//! duplicate `(term, doc_id)` runs (possible when a term's documents span a
//! block boundary), sort and dedup positions, and emit one encoded posting
//! list into the term's barrel. Word ids are handed out in emission order,
//! which is exactly ascending term order. That equivalence is what makes
//! the lexicon iterable "in word-id order = lexicographic order".
//!
//! Barrel assignment is `fxhash(term) mod N`. It must be a stable hash:
//! the lexicon persists the barrel id, and a rebuild with the same inputs
//! has to produce the same partitioning.
//!
//! Time is O(total postings · log #blocks); peak memory is one term's
//! merged posting list.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use rustc_hash::FxHasher;

use crate::binary::encode_postings;
use crate::error::{QuarryError, Result};
use crate::index::barrels::barrel_file_name;
use crate::types::LexiconEntry;

use super::block::inverted_block_name;

/// Default barrel count.
pub const DEFAULT_NUM_BARRELS: u32 = 4;

/// Which barrel a term's posting list lives in.
pub fn barrel_for_term(term: &str, num_barrels: u32) -> u32 {
    let mut hasher = FxHasher::default();
    term.hash(&mut hasher);
    (hasher.finish() % u64::from(num_barrels)) as u32
}

/// Everything the merge learned about the corpus, for the lexicon writer
/// and the manifest.
pub struct MergeOutput {
    pub entries: Vec<LexiconEntry>,
    pub barrel_crc32: Vec<u32>,
    /// Sum of doc frequencies.
    pub posting_count: u64,
    /// Sum of collection frequencies.
    pub token_count: u64,
}

struct BlockReader {
    block_id: u32,
    lines: Lines<BufReader<File>>,
    current: Option<(String, String)>,
}

impl BlockReader {
    fn open(out_dir: &Path, block_id: u32) -> Result<Self> {
        let path = out_dir.join(inverted_block_name(block_id));
        if !path.exists() {
            return Err(QuarryError::MissingInput { path });
        }
        let mut reader = BlockReader {
            block_id,
            lines: BufReader::new(File::open(&path)?).lines(),
            current: None,
        };
        reader.advance()?;
        Ok(reader)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = None;
        for line in self.lines.by_ref() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let (term, rest) = line.split_once('\t').ok_or_else(|| {
                QuarryError::corrupt(format!("block {}: line without tab", self.block_id))
            })?;
            self.current = Some((term.to_string(), rest.to_string()));
            return Ok(());
        }
        Ok(())
    }
}

/// Merge `block_count` spilled blocks into `num_barrels` barrel files.
pub fn merge_blocks(out_dir: &Path, block_count: u32, num_barrels: u32) -> Result<MergeOutput> {
    let mut barrel_writers = Vec::with_capacity(num_barrels as usize);
    let mut barrel_offsets = vec![0u64; num_barrels as usize];
    let mut barrel_hashers: Vec<crc32fast::Hasher> =
        (0..num_barrels).map(|_| crc32fast::Hasher::new()).collect();
    for id in 0..num_barrels {
        let file = File::create(out_dir.join(barrel_file_name(id)))?;
        barrel_writers.push(BufWriter::new(file));
    }

    let mut readers = Vec::with_capacity(block_count as usize);
    let mut heap: BinaryHeap<Reverse<(String, usize)>> = BinaryHeap::new();
    for block_id in 0..block_count {
        let reader = BlockReader::open(out_dir, block_id)?;
        if let Some((term, _)) = &reader.current {
            heap.push(Reverse((term.clone(), readers.len())));
        }
        readers.push(reader);
    }

    let mut entries = Vec::new();
    let mut posting_count = 0u64;
    let mut token_count = 0u64;
    let mut encoded = Vec::new();

    while let Some(Reverse((term, first))) = heap.pop() {
        // Every reader currently sitting on this term contributes.
        let mut contributors = vec![first];
        while let Some(Reverse((t, _))) = heap.peek() {
            if *t != term {
                break;
            }
            let Reverse((_, idx)) = heap.pop().unwrap();
            contributors.push(idx);
        }

        // doc_id → positions, ascending by construction of BTreeMap.
        let mut merged: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for idx in contributors {
            let (_, rest) = readers[idx].current.take().expect("reader lost its line");
            parse_block_postings(&rest, &mut merged, readers[idx].block_id, &term)?;
            readers[idx].advance()?;
            if let Some((next_term, _)) = &readers[idx].current {
                heap.push(Reverse((next_term.clone(), idx)));
            }
        }

        let mut postings: Vec<(u32, Vec<u32>)> = Vec::with_capacity(merged.len());
        let mut coll_freq = 0u64;
        for (doc_id, mut positions) in merged {
            positions.sort_unstable();
            positions.dedup();
            coll_freq += positions.len() as u64;
            postings.push((doc_id, positions));
        }
        let doc_freq = postings.len() as u32;

        encoded.clear();
        encode_postings(&postings, &mut encoded);

        let barrel_id = barrel_for_term(&term, num_barrels);
        let slot = barrel_id as usize;
        barrel_writers[slot].write_all(&encoded)?;
        barrel_hashers[slot].update(&encoded);
        let offset = barrel_offsets[slot];
        barrel_offsets[slot] += encoded.len() as u64;

        posting_count += u64::from(doc_freq);
        token_count += coll_freq;
        entries.push(LexiconEntry {
            word_id: entries.len() as u32 + 1,
            term,
            doc_freq,
            coll_freq,
            offset,
            byte_len: encoded.len() as u64,
            barrel_id,
        });
    }

    for mut w in barrel_writers {
        w.flush()?;
    }
    let barrel_crc32 = barrel_hashers.into_iter().map(|h| h.finalize()).collect();

    Ok(MergeOutput {
        entries,
        barrel_crc32,
        posting_count,
        token_count,
    })
}

/// Parse one block line's posting payload (`docid:pos,pos;docid:pos,…`),
/// accumulating positions per document.
fn parse_block_postings(
    rest: &str,
    merged: &mut BTreeMap<u32, Vec<u32>>,
    block_id: u32,
    term: &str,
) -> Result<()> {
    let bad = |what: &str| {
        QuarryError::corrupt(format!("block {}, term '{}': {}", block_id, term, what))
    };

    for doc_chunk in rest.split(';') {
        if doc_chunk.is_empty() {
            continue;
        }
        let (doc_str, pos_str) = doc_chunk
            .split_once(':')
            .ok_or_else(|| bad("posting without ':'"))?;
        let doc_id: u32 = doc_str.parse().map_err(|_| bad("bad doc id"))?;

        let positions = merged.entry(doc_id).or_default();
        for pos in pos_str.split(',') {
            if pos.is_empty() {
                continue;
            }
            positions.push(pos.parse().map_err(|_| bad("bad position"))?);
        }
    }
    Ok(())
}
