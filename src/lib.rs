// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Disk-backed full-text search over a static document corpus.
//!
//! Three subsystems share this crate:
//!
//! 1. **Indexer** (`build`): a SPIMI-style builder that streams cleaned
//!    documents through a memory-capped block accumulator, spills sorted
//!    blocks, and K-way merges them into hash-partitioned barrel files plus
//!    a lexicon, a forward index, and a doc-id map.
//! 2. **Query engine** (`index` + `search`): loads the lexicon and doc-id
//!    map at startup, barrels lazily through an LRU cache, and answers
//!    Boolean OR/AND and positional phrase queries ranked by BM25 with
//!    field boosts and a recency prior.
//! 3. **Autocomplete** (`suggest`): an offline prefix table derived from
//!    the lexicon, served by plain hash lookup.
//!
//! ```text
//! cleaned.jsonl ──▶ build::run_build ──▶ lexicon + barrels + forward
//!                                          │
//!                           Index::open ◀──┘
//!                                │
//!                     Searcher::search_{or,and,phrase}
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use quarry::build::{run_build, BuildConfig};
//! use quarry::index::Index;
//! use quarry::search::{Searcher, SearchOptions};
//!
//! # fn main() -> quarry::error::Result<()> {
//! run_build(&BuildConfig::new("cleaned.jsonl", "index_out"))?;
//!
//! let index = Index::open("index_out".as_ref())?;
//! let searcher = Searcher::new(&index);
//! let hits = searcher.search_or(&["immunotherapy".into()], &SearchOptions::top_k(10))?;
//! for result in &hits.results {
//!     println!("{} {:.2}", result.ext_id, result.final_score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod binary;
pub mod build;
pub mod cli;
pub mod error;
pub mod index;
pub mod scoring;
pub mod search;
pub mod suggest;
pub mod types;
pub mod utils;

pub use error::{QuarryError, Result};
pub use index::Index;
pub use search::{SearchOptions, Searcher};
pub use types::{
    DocId, DocMeta, LexiconEntry, Posting, QueryMode, SearchResponse, SearchResult, Suggestion,
    WordId,
};
