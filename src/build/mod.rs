// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The indexing pipeline: cleaned JSONL in, a complete index directory out.
//!
//! Stages, in order: stream documents through the SPIMI block builder,
//! K-way merge the spilled blocks into barrels + lexicon, remap the forward
//! blocks onto word ids, persist the doc-id map, then write the manifest.
//! The manifest goes last on purpose: its presence is the marker that the
//! directory holds a complete build, so a crash part-way through can never
//! be mistaken for a valid index.
//!
//! Malformed input lines are counted, logged, and skipped. Duplicate
//! external ids and any I/O failure abort the build.

pub mod block;
pub mod cleaned;
pub mod forward;
pub mod manifest;
pub mod merge;

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::error::{QuarryError, Result};
use crate::index::docmap::{DocIdRegistry, DOCID_MAP_FILE};
use crate::index::lexicon::{write_lexicon, Lexicon, LEXICON_FILE};

use block::{BlockBuilder, DEFAULT_BLOCK_BUDGET};
use cleaned::CleanedDoc;
use manifest::BuildManifest;
use merge::{merge_blocks, DEFAULT_NUM_BARRELS};

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub block_budget: u64,
    pub num_barrels: u32,
    /// Keep the intermediate block files after a successful merge.
    pub keep_blocks: bool,
}

impl BuildConfig {
    pub fn new(input: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        BuildConfig {
            input: input.into(),
            out_dir: out_dir.into(),
            block_budget: DEFAULT_BLOCK_BUDGET,
            num_barrels: DEFAULT_NUM_BARRELS,
            keep_blocks: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BuildSummary {
    pub doc_count: u32,
    pub term_count: u32,
    pub block_count: u32,
    pub skipped_records: u64,
}

fn spinner(multi: &MultiProgress, prefix: &'static str) -> ProgressBar {
    let pb = multi.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:<10} {pos} {msg}").unwrap(),
    );
    pb.set_prefix(prefix);
    pb
}

pub fn run_build(config: &BuildConfig) -> Result<BuildSummary> {
    if config.num_barrels == 0 {
        return Err(QuarryError::Usage("barrel count must be at least 1".into()));
    }
    if !config.input.exists() {
        return Err(QuarryError::MissingInput {
            path: config.input.clone(),
        });
    }
    fs::create_dir_all(&config.out_dir)?;

    let multi = MultiProgress::new();

    // 1. Stream documents into blocks.
    let pb = spinner(&multi, "Indexing");
    pb.set_message("documents");

    let reader = BufReader::new(File::open(&config.input)?);
    let mut registry = DocIdRegistry::new();
    let mut builder = BlockBuilder::new(&config.out_dir, config.block_budget);
    let mut skipped_records = 0u64;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc = match CleanedDoc::parse_line(&line, line_no + 1) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "skipping malformed record");
                skipped_records += 1;
                continue;
            }
        };
        let ext_id = match &doc.docid {
            cleaned::ExtId::Text(s) => s.clone(),
            cleaned::ExtId::Number(n) => n.to_string(),
        };
        let doc_id = registry.assign(&ext_id)?;
        builder.add_document(doc_id, &ext_id, &doc)?;
        pb.inc(1);
    }
    let block_count = builder.finish()?;
    let doc_count = registry.len() as u32;
    pb.finish_with_message(format!(
        "documents ({} blocks, {} skipped)",
        block_count, skipped_records
    ));

    // 2. Merge blocks into barrels + lexicon.
    let pb = spinner(&multi, "Merging");
    pb.set_message(format!("{} blocks into {} barrels", block_count, config.num_barrels));
    let merged = merge_blocks(&config.out_dir, block_count, config.num_barrels)?;
    let term_count = merged.entries.len() as u32;
    write_lexicon(&config.out_dir.join(LEXICON_FILE), &merged.entries)?;
    pb.finish_with_message(format!("{} terms", term_count));

    // 3. Remap forward blocks onto word ids.
    let pb = spinner(&multi, "Remapping");
    pb.set_message("forward index");
    let lexicon = Lexicon::from_entries(merged.entries);
    forward::remap_forward_blocks(&config.out_dir, block_count, &lexicon)?;
    pb.finish_with_message("forward index");

    // 4. Doc-id map, then the manifest as the completion marker.
    registry.save(&config.out_dir.join(DOCID_MAP_FILE))?;

    let avg_doc_length = if doc_count > 0 {
        merged.token_count as f64 / f64::from(doc_count)
    } else {
        0.0
    };
    BuildManifest {
        doc_count,
        term_count,
        posting_count: merged.posting_count,
        token_count: merged.token_count,
        avg_doc_length,
        num_barrels: config.num_barrels,
        barrel_crc32: merged.barrel_crc32,
        block_budget_bytes: config.block_budget,
        block_count,
    }
    .save(&config.out_dir)?;

    if !config.keep_blocks {
        remove_block_files(&config.out_dir, block_count)?;
    }

    info!(
        docs = doc_count,
        terms = term_count,
        blocks = block_count,
        skipped = skipped_records,
        "build complete"
    );
    Ok(BuildSummary {
        doc_count,
        term_count,
        block_count,
        skipped_records,
    })
}

fn remove_block_files(out_dir: &Path, block_count: u32) -> Result<()> {
    for block_id in 0..block_count {
        fs::remove_file(out_dir.join(block::inverted_block_name(block_id)))?;
        fs::remove_file(out_dir.join(block::forward_block_name(block_id)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_corpus(dir: &Path, lines: &[&str]) -> PathBuf {
        let path = dir.join("cleaned.jsonl");
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    fn doc_line(ext_id: &str, terms: &[(&str, u32)]) -> String {
        let tokens: Vec<String> = terms
            .iter()
            .map(|(t, p)| format!(r#"{{"term":"{}","pos":{}}}"#, t, p))
            .collect();
        format!(
            r#"{{"docid":"{}","fields":[{{"tokens":[{}]}}]}}"#,
            ext_id,
            tokens.join(",")
        )
    }

    #[test]
    fn test_build_end_to_end_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_corpus(
            dir.path(),
            &[
                &doc_line("d1", &[("quick", 0), ("fox", 1)]),
                "not json at all",
                &doc_line("d2", &[("quick", 0)]),
            ],
        );

        let out = dir.path().join("index");
        let summary = run_build(&BuildConfig::new(&input, &out)).unwrap();
        assert_eq!(summary.doc_count, 2);
        assert_eq!(summary.term_count, 2);
        assert_eq!(summary.skipped_records, 1);

        assert!(out.join(LEXICON_FILE).exists());
        assert!(out.join(DOCID_MAP_FILE).exists());
        assert!(out.join(forward::FORWARD_INDEX_FILE).exists());
        assert!(out.join(manifest::MANIFEST_FILE).exists());
        for id in 0..DEFAULT_NUM_BARRELS {
            assert!(out.join(crate::index::barrels::barrel_file_name(id)).exists());
        }
        // Intermediate blocks are gone.
        assert!(!out.join(block::inverted_block_name(0)).exists());
    }

    #[test]
    fn test_duplicate_ext_id_aborts_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_corpus(
            dir.path(),
            &[
                &doc_line("same", &[("a", 0)]),
                &doc_line("same", &[("b", 0)]),
            ],
        );
        let out = dir.path().join("index");
        let err = run_build(&BuildConfig::new(&input, &out)).unwrap_err();
        assert!(matches!(err, QuarryError::DuplicateExternalId(_)));
        // No completion marker for the partial build.
        assert!(!out.join(manifest::MANIFEST_FILE).exists());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::new(dir.path().join("absent.jsonl"), dir.path().join("out"));
        assert!(matches!(
            run_build(&config),
            Err(QuarryError::MissingInput { .. })
        ));
    }
}
