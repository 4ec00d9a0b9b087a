// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Posting-list encoding and the lazy on-barrel decoder.
//!
//! A term's posting list is stored as one contiguous byte run inside its
//! barrel:
//!
//! ```text
//! vbyte(doc_count)
//! for each posting, ascending doc_id:
//!   vbyte(doc_id delta)        // from the previous doc_id, starting at 0
//!   vbyte(tf)
//!   vbyte(position delta) * tf // from the previous position, starting at 0
//! ```
//!
//! Doc ids cluster, positions cluster harder, so the deltas stay small and
//! the varints stay short. The decoder is a cursor over a borrowed barrel
//! slice: it never reads past the window the lexicon entry describes, and it
//! yields postings one at a time so phrase matching can stop early. Decoding
//! is restartable because the barrel bytes stay resident.

use crate::error::{QuarryError, Result};
use crate::types::{LexiconEntry, Posting};

use super::varint::{decode_u32, encode_u32};

// ============================================================================
// ENCODING
// ============================================================================

/// Encode a merged posting list. `postings` must be sorted by ascending
/// doc id with strictly ascending positions; the merger guarantees both.
pub fn encode_postings(postings: &[(u32, Vec<u32>)], out: &mut Vec<u8>) {
    encode_u32(postings.len() as u32, out);

    let mut prev_doc = 0u32;
    for (doc_id, positions) in postings {
        encode_u32(doc_id - prev_doc, out);
        prev_doc = *doc_id;

        encode_u32(positions.len() as u32, out);
        let mut prev_pos = 0u32;
        for &pos in positions {
            encode_u32(pos - prev_pos, out);
            prev_pos = pos;
        }
    }
}

// ============================================================================
// LAZY DECODER
// ============================================================================

/// Cursor-based decoder over one term's byte window inside a barrel.
///
/// Implements `Iterator<Item = Result<Posting>>`; callers may abandon it
/// mid-list. After the last posting the cursor must sit exactly at the end
/// of the window, anything else is corruption.
pub struct PostingCursor<'a> {
    bytes: &'a [u8],
    cursor: usize,
    end: usize,
    remaining: u32,
    prev_doc: u32,
    term: &'a str,
    failed: bool,
}

impl<'a> PostingCursor<'a> {
    /// Position a cursor at `entry.offset` within `barrel` and read the
    /// posting count. Fails if the entry's window exceeds the barrel.
    pub fn new(barrel: &'a [u8], entry: &'a LexiconEntry) -> Result<Self> {
        let start = usize::try_from(entry.offset)
            .map_err(|_| QuarryError::corrupt(format!("offset overflow for '{}'", entry.term)))?;
        let len = usize::try_from(entry.byte_len)
            .map_err(|_| QuarryError::corrupt(format!("length overflow for '{}'", entry.term)))?;
        let end = start.checked_add(len).filter(|&e| e <= barrel.len()).ok_or_else(|| {
            QuarryError::corrupt(format!(
                "posting window for '{}' ({}..+{}) exceeds barrel of {} bytes",
                entry.term,
                start,
                len,
                barrel.len()
            ))
        })?;

        let mut cursor = start;
        let doc_count = decode_u32(&barrel[..end], &mut cursor)?;
        Ok(PostingCursor {
            bytes: barrel,
            cursor,
            end,
            remaining: doc_count,
            prev_doc: 0,
            term: &entry.term,
            failed: false,
        })
    }

    /// Posting count declared at the head of the list.
    pub fn doc_count(&self) -> u32 {
        self.remaining
    }

    /// Decode the remainder of the list into a vector.
    pub fn collect_all(self) -> Result<Vec<Posting>> {
        let mut out = Vec::with_capacity(self.remaining as usize);
        for posting in self {
            out.push(posting?);
        }
        Ok(out)
    }

    fn decode_next(&mut self) -> Result<Posting> {
        let window = &self.bytes[..self.end];

        let delta = decode_u32(window, &mut self.cursor)?;
        let doc_id = self.prev_doc.checked_add(delta).ok_or_else(|| {
            QuarryError::corrupt(format!("doc id overflow decoding '{}'", self.term))
        })?;
        self.prev_doc = doc_id;

        let tf = decode_u32(window, &mut self.cursor)?;
        let mut positions = Vec::with_capacity(tf as usize);
        let mut prev_pos = 0u32;
        for _ in 0..tf {
            let pos_delta = decode_u32(window, &mut self.cursor)?;
            prev_pos = prev_pos.checked_add(pos_delta).ok_or_else(|| {
                QuarryError::corrupt(format!("position overflow decoding '{}'", self.term))
            })?;
            positions.push(prev_pos);
        }

        Ok(Posting {
            doc_id,
            tf,
            positions,
        })
    }
}

impl Iterator for PostingCursor<'_> {
    type Item = Result<Posting>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            // A fully consumed list must have used its whole byte window.
            if !self.failed && self.remaining == 0 && self.cursor != self.end {
                self.failed = true;
                return Some(Err(QuarryError::corrupt(format!(
                    "posting list for '{}' ended {} bytes short of its window",
                    self.term,
                    self.end - self.cursor
                ))));
            }
            return None;
        }
        self.remaining -= 1;
        match self.decode_next() {
            Ok(p) => Some(Ok(p)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
