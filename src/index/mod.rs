// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The opened index: everything the query engine reads.
//!
//! `Index::open` loads the lexicon and doc-id map eagerly (both are small),
//! the forward index if present (document lengths, metadata, pre-extracted
//! years), and the manifest when the build wrote one. Barrels stay on disk
//! until a query touches them. After `open` returns, every field is
//! immutable; the engine borrows the index for the lifetime of each query,
//! and concurrent readers share it freely. The barrel cache is the only
//! interior-mutable piece and carries its own lock.

pub mod barrels;
pub mod docmap;
pub mod lexicon;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::build::forward::{ForwardRecord, FORWARD_INDEX_FILE};
use crate::build::manifest::BuildManifest;
use crate::error::Result;
use crate::scoring::extract_year;
use crate::types::{DocId, DocMeta};

use barrels::{barrel_file_name, BarrelCache};
use docmap::{DocMap, DOCID_MAP_FILE};
use lexicon::{Lexicon, LEXICON_FILE};

/// Options for `Index::open_with`.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Barrel cache capacity; defaults to "all barrels resident".
    pub cache_capacity: Option<usize>,
    /// Skip the forward index even when present (degrades BM25 length
    /// normalization to neutral).
    pub skip_forward: bool,
}

pub struct Index {
    dir: PathBuf,
    pub lexicon: Lexicon,
    pub docmap: DocMap,
    pub barrels: BarrelCache,
    pub manifest: Option<BuildManifest>,
    doc_meta: HashMap<DocId, DocMeta>,
    pub total_docs: u32,
    pub avg_doc_length: f64,
}

impl Index {
    pub fn open(dir: &Path) -> Result<Self> {
        Self::open_with(dir, OpenOptions::default())
    }

    pub fn open_with(dir: &Path, options: OpenOptions) -> Result<Self> {
        let lexicon = Lexicon::load(&dir.join(LEXICON_FILE))?;
        let docmap = DocMap::load(&dir.join(DOCID_MAP_FILE))?;
        let manifest = BuildManifest::load(dir)?;
        let total_docs = docmap.len() as u32;

        let num_barrels = match &manifest {
            Some(m) => m.num_barrels,
            None => count_barrel_files(dir),
        };
        let expected_crc: Vec<Option<u32>> = manifest
            .as_ref()
            .map(|m| m.barrel_crc32.iter().map(|&c| Some(c)).collect())
            .unwrap_or_default();
        let capacity = options.cache_capacity.unwrap_or(num_barrels.max(1) as usize);
        let barrels = BarrelCache::new(dir, num_barrels, capacity, expected_crc);

        let mut doc_meta = HashMap::new();
        let mut total_length = 0u64;
        let forward_path = dir.join(FORWARD_INDEX_FILE);
        if !options.skip_forward && forward_path.exists() {
            load_forward(&forward_path, &docmap, &mut doc_meta, &mut total_length)?;
        } else if !options.skip_forward {
            warn!("forward index absent; length normalization disabled");
        }

        let avg_doc_length = if !doc_meta.is_empty() {
            total_length as f64 / doc_meta.len() as f64
        } else {
            manifest.as_ref().map(|m| m.avg_doc_length).unwrap_or(0.0)
        };

        info!(
            terms = lexicon.len(),
            docs = total_docs,
            barrels = num_barrels,
            avg_dl = avg_doc_length,
            "index open"
        );
        Ok(Index {
            dir: dir.to_path_buf(),
            lexicon,
            docmap,
            barrels,
            manifest,
            doc_meta,
            total_docs,
            avg_doc_length,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn doc_meta(&self, doc_id: DocId) -> Option<&DocMeta> {
        self.doc_meta.get(&doc_id)
    }

    /// Number of documents the forward index covered.
    pub fn meta_count(&self) -> usize {
        self.doc_meta.len()
    }

    /// Document length for BM25; falls back to the corpus average when the
    /// forward index did not cover this document.
    pub fn doc_length(&self, doc_id: DocId) -> u32 {
        match self.doc_meta.get(&doc_id) {
            Some(meta) if meta.doc_length > 0 => meta.doc_length,
            _ => self.avg_doc_length.round() as u32,
        }
    }

    pub fn ext_id(&self, doc_id: DocId) -> String {
        self.docmap
            .ext_id(doc_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("UNKNOWN_{}", doc_id))
    }
}

fn count_barrel_files(dir: &Path) -> u32 {
    let mut n = 0;
    while dir.join(barrel_file_name(n)).exists() {
        n += 1;
    }
    n
}

fn load_forward(
    path: &Path,
    docmap: &DocMap,
    doc_meta: &mut HashMap<DocId, DocMeta>,
    total_length: &mut u64,
) -> Result<()> {
    let reader = BufReader::new(File::open(path)?);
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let record: ForwardRecord = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "skipping malformed forward record");
                continue;
            }
        };
        let Some(doc_id) = docmap.internal_id(&record.docid) else {
            warn!(doc = %record.docid, "forward record for unknown document");
            continue;
        };

        let doc_length = record.doc_length();
        *total_length += u64::from(doc_length);
        let year = record.pub_date.as_deref().and_then(extract_year);
        doc_meta.insert(
            doc_id,
            DocMeta {
                doc_length,
                title: record.title,
                authors: record.authors,
                pub_date: record.pub_date,
                year,
            },
        );
    }
    Ok(())
}
