// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! CLI definitions for the quarry command-line interface.
//!
//! Five subcommands: `index` builds the inverted index, `autocomplete`
//! derives the suggestion table from its lexicon, `search` queries an index
//! (one-shot flags, an interactive prompt, or a canned benchmark),
//! `suggest` queries a suggestion table, and `inspect` prints what a build
//! produced.

pub mod display;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "quarry",
    about = "Full-text search engine for a static document corpus",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the index from a cleaned-document JSONL stream
    Index {
        /// Cleaned documents, one JSON record per line
        #[arg(short, long)]
        input: String,

        /// Output directory for the index files
        #[arg(short, long)]
        output: String,

        /// In-memory block budget in MiB before spilling to disk
        #[arg(long, default_value_t = 256)]
        block_mib: u64,

        /// Number of barrel partitions
        #[arg(long, default_value_t = 4)]
        barrels: u32,

        /// Keep intermediate block files after the merge
        #[arg(long)]
        keep_blocks: bool,
    },

    /// Build the autocomplete table from an index's lexicon
    Autocomplete {
        /// Index directory holding the lexicon
        #[arg(short = 'd', long)]
        index_dir: String,

        /// Output file (default: <index_dir>/autocomplete.idx)
        #[arg(short, long)]
        output: Option<String>,

        /// Maximum prefix length in characters
        #[arg(long, default_value_t = 15)]
        max_prefix: usize,

        /// Suggestions kept per prefix
        #[arg(long, default_value_t = 20)]
        top_k: usize,

        /// Also write a human-readable .txt dump next to the output
        #[arg(long)]
        dump: bool,
    },

    /// Query an index; with no query flag, enter the interactive prompt
    Search {
        /// Index directory
        #[arg(short = 'd', long)]
        index_dir: String,

        /// OR query (any term may match)
        #[arg(short = 'q', long)]
        query: Option<String>,

        /// AND query (all terms required)
        #[arg(short = 'a', long)]
        and: Option<String>,

        /// Phrase query (terms consecutive, in order)
        #[arg(short = 'p', long)]
        phrase: Option<String>,

        /// Number of results to return
        #[arg(short = 'k', long, default_value_t = 10)]
        top_k: usize,

        /// Per-query deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Barrel cache capacity (default: all barrels resident)
        #[arg(long)]
        cache: Option<usize>,

        /// Run the canned benchmark query mix and report latencies
        #[arg(long)]
        bench: bool,
    },

    /// Query an autocomplete table; with no prefix, enter the prompt
    Suggest {
        /// Autocomplete table file
        #[arg(short = 'f', long)]
        file: String,

        /// Prefix to complete (at least two characters)
        prefix: Option<String>,

        /// Maximum suggestions to return
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Print table statistics
        #[arg(long)]
        stats: bool,
    },

    /// Print statistics for a built index
    Inspect {
        /// Index directory
        #[arg(short = 'd', long)]
        index_dir: String,
    },
}
