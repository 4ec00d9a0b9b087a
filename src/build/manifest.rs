// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The build manifest: corpus statistics plus integrity metadata.
//!
//! Written as `manifest.json` at the very end of a successful build, so its
//! presence is the "this index is complete" marker; a crashed build leaves
//! the directory without one. The query side treats it as optional: the
//! barrel CRCs enable load-time verification, and the average document
//! length is the BM25 fallback when the forward index is not opened.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, Result};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildManifest {
    pub doc_count: u32,
    pub term_count: u32,
    /// Total postings (sum of doc frequencies over all terms).
    pub posting_count: u64,
    /// Total term occurrences (sum of collection frequencies).
    pub token_count: u64,
    pub avg_doc_length: f64,
    pub num_barrels: u32,
    /// CRC32 of each barrel file, indexed by barrel id.
    pub barrel_crc32: Vec<u32>,
    /// Byte budget the block builder ran with.
    pub block_budget_bytes: u64,
    /// Spilled block count before the merge.
    pub block_count: u32,
}

impl BuildManifest {
    pub fn save(&self, dir: &Path) -> Result<()> {
        use std::io::Write;
        let mut w = BufWriter::new(File::create(dir.join(MANIFEST_FILE))?);
        serde_json::to_writer_pretty(&mut w, self)
            .map_err(|e| QuarryError::corrupt(format!("manifest serialize: {e}")))?;
        w.flush()?;
        Ok(())
    }

    /// `Ok(None)` when the manifest is absent (older or partial index).
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path)?;
        let manifest = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| QuarryError::corrupt(format!("manifest parse: {e}")))?;
        Ok(Some(manifest))
    }
}
