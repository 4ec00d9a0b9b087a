// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Document-id registry: external string ids to dense internal ids.
//!
//! External ids are opaque corpus identifiers ("PMC8675309" and friends).
//! Internal ids are 1-based and dense, assigned in first-seen order during
//! the build, which is what makes delta encoding of posting lists worthwhile.
//! The mapping is persisted as one tab-separated line per document and is
//! immutable at query time.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{QuarryError, Result};
use crate::types::DocId;

pub const DOCID_MAP_FILE: &str = "docid_map";

// ============================================================================
// BUILD SIDE
// ============================================================================

/// Assigns internal ids during indexing. One `assign` call per document
/// record; a repeated external id means the build stream is broken.
#[derive(Debug, Default)]
pub struct DocIdRegistry {
    ext_to_int: HashMap<String, DocId>,
    int_to_ext: Vec<String>,
}

impl DocIdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next dense id to `ext_id`.
    pub fn assign(&mut self, ext_id: &str) -> Result<DocId> {
        match self.ext_to_int.entry(ext_id.to_string()) {
            Entry::Occupied(_) => Err(QuarryError::DuplicateExternalId(ext_id.to_string())),
            Entry::Vacant(slot) => {
                let id = self.int_to_ext.len() as DocId + 1;
                slot.insert(id);
                self.int_to_ext.push(ext_id.to_string());
                Ok(id)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.int_to_ext.len()
    }

    pub fn is_empty(&self) -> bool {
        self.int_to_ext.is_empty()
    }

    /// Persist as `ext_id \t internal_id`, one line per document in
    /// internal-id order.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        for (i, ext_id) in self.int_to_ext.iter().enumerate() {
            writeln!(w, "{}\t{}", ext_id, i + 1)?;
        }
        w.flush()?;
        Ok(())
    }
}

// ============================================================================
// QUERY SIDE
// ============================================================================

/// The loaded bijection. The forward direction (internal to external) backs
/// result rendering; the reverse direction resolves forward-index records.
#[derive(Debug, Default)]
pub struct DocMap {
    int_to_ext: Vec<String>,
    ext_to_int: HashMap<String, DocId>,
}

impl DocMap {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QuarryError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let reader = BufReader::new(File::open(path)?);

        let mut int_to_ext: Vec<String> = Vec::new();
        let mut ext_to_int = HashMap::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let (ext_id, id_str) = line.split_once('\t').ok_or_else(|| {
                QuarryError::corrupt(format!("docid map line {}: missing tab", line_no + 1))
            })?;
            let id: DocId = id_str.trim().parse().map_err(|_| {
                QuarryError::corrupt(format!("docid map line {}: bad id '{}'", line_no + 1, id_str))
            })?;
            if id == 0 {
                return Err(QuarryError::corrupt(format!(
                    "docid map line {}: internal ids are 1-based",
                    line_no + 1
                )));
            }

            let slot = id as usize - 1;
            if int_to_ext.len() <= slot {
                int_to_ext.resize(slot + 1, String::new());
            }
            int_to_ext[slot] = ext_id.to_string();
            ext_to_int.insert(ext_id.to_string(), id);
        }

        Ok(DocMap {
            int_to_ext,
            ext_to_int,
        })
    }

    pub fn ext_id(&self, doc_id: DocId) -> Option<&str> {
        self.int_to_ext
            .get(doc_id as usize - 1)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn internal_id(&self, ext_id: &str) -> Option<DocId> {
        self.ext_to_int.get(ext_id).copied()
    }

    pub fn len(&self) -> usize {
        self.ext_to_int.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ext_to_int.is_empty()
    }
}
