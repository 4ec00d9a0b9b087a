// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Binary codec for the autocomplete suggestion table.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! u32 prefix_count
//! for each prefix:
//!   u16 len, prefix bytes
//!   u16 entry_count
//!   for each entry:
//!     u16 term_len, term bytes
//!     f64 popularity
//!     u32 word_id
//!     u32 doc_freq
//!     u64 coll_freq
//! ```
//!
//! Entries are written pre-sorted by descending popularity so the server can
//! slice the top of the list without re-sorting.

use std::collections::HashMap;

use crate::error::{QuarryError, Result};
use crate::types::Suggestion;

/// Serialize the prefix table. Prefix iteration order does not matter; the
/// server loads everything into a hash map.
pub fn encode_table(table: &HashMap<String, Vec<Suggestion>>, out: &mut Vec<u8>) {
    out.extend_from_slice(&(table.len() as u32).to_le_bytes());

    for (prefix, suggestions) in table {
        out.extend_from_slice(&(prefix.len() as u16).to_le_bytes());
        out.extend_from_slice(prefix.as_bytes());
        out.extend_from_slice(&(suggestions.len() as u16).to_le_bytes());

        for s in suggestions {
            out.extend_from_slice(&(s.term.len() as u16).to_le_bytes());
            out.extend_from_slice(s.term.as_bytes());
            out.extend_from_slice(&s.popularity.to_le_bytes());
            out.extend_from_slice(&s.word_id.to_le_bytes());
            out.extend_from_slice(&s.doc_freq.to_le_bytes());
            out.extend_from_slice(&s.coll_freq.to_le_bytes());
        }
    }
}

/// Parse a serialized table, validating every bound.
pub fn decode_table(bytes: &[u8]) -> Result<HashMap<String, Vec<Suggestion>>> {
    let mut cursor = Cursor { bytes, pos: 0 };

    let prefix_count = cursor.read_u32()? as usize;
    let mut table = HashMap::with_capacity(prefix_count);

    for i in 0..prefix_count {
        let prefix = cursor
            .read_string()
            .map_err(|e| e.while_reading("prefix", i))?;

        let entry_count = cursor.read_u16()? as usize;
        let mut suggestions = Vec::with_capacity(entry_count);
        for j in 0..entry_count {
            let term = cursor
                .read_string()
                .map_err(|e| e.while_reading("suggestion term", j))?;
            let popularity = f64::from_le_bytes(cursor.read_array::<8>()?);
            let word_id = cursor.read_u32()?;
            let doc_freq = cursor.read_u32()?;
            let coll_freq = u64::from_le_bytes(cursor.read_array::<8>()?);
            suggestions.push(Suggestion {
                term,
                popularity,
                word_id,
                doc_freq,
                coll_freq,
            });
        }
        table.insert(prefix, suggestions);
    }

    if cursor.pos != bytes.len() {
        return Err(QuarryError::corrupt(format!(
            "autocomplete table has {} trailing bytes",
            bytes.len() - cursor.pos
        )));
    }
    Ok(table)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos.checked_add(N).filter(|&e| e <= self.bytes.len()).ok_or_else(|| {
            QuarryError::corrupt(format!(
                "truncated autocomplete table at offset {}",
                self.pos
            ))
        })?;
        let mut arr = [0u8; N];
        arr.copy_from_slice(&self.bytes[self.pos..end]);
        self.pos = end;
        Ok(arr)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array::<2>()?))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let end = self.pos.checked_add(len).filter(|&e| e <= self.bytes.len()).ok_or_else(|| {
            QuarryError::corrupt(format!("truncated string at offset {}", self.pos))
        })?;
        let s = std::str::from_utf8(&self.bytes[self.pos..end])
            .map_err(|e| QuarryError::corrupt(format!("invalid UTF-8 at offset {}: {}", self.pos, e)))?
            .to_string();
        self.pos = end;
        Ok(s)
    }
}

impl QuarryError {
    fn while_reading(self, what: &str, index: usize) -> Self {
        match self {
            QuarryError::CorruptData { context } => QuarryError::CorruptData {
                context: format!("{} {}: {}", what, index, context),
            },
            other => other,
        }
    }
}
