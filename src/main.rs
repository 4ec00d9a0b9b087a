// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Quarry CLI: build, search, and inspect indexes.
//!
//! ```bash
//! # Build an index from cleaned documents
//! quarry index -i cleaned.jsonl -o index_out
//!
//! # Derive the autocomplete table
//! quarry autocomplete -d index_out
//!
//! # One-shot queries
//! quarry search -d index_out -q "machine learning"
//! quarry search -d index_out -a "neural network"
//! quarry search -d index_out -p "deep learning"
//!
//! # Interactive prompt (bare = OR, +terms = AND, "quoted" = phrase)
//! quarry search -d index_out
//! ```

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use quarry::build::{run_build, BuildConfig};
use quarry::cli::display::{
    format_size, print_latency_summary, print_response, print_suggestions,
};
use quarry::cli::{Cli, Commands};
use quarry::error::Result;
use quarry::index::barrels::barrel_file_name;
use quarry::index::{Index, OpenOptions};
use quarry::search::{SearchOptions, Searcher};
use quarry::suggest::{
    build_table, write_readable_dump, write_table, AutocompleteIndex, SuggestBuildConfig,
    AUTOCOMPLETE_FILE,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    // clap exits 2 on bad arguments by default; 2 means "missing input"
    // here, so usage errors are remapped to 1.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    let outcome = match cli.command {
        Commands::Index {
            input,
            output,
            block_mib,
            barrels,
            keep_blocks,
        } => cmd_index(&input, &output, block_mib, barrels, keep_blocks),
        Commands::Autocomplete {
            index_dir,
            output,
            max_prefix,
            top_k,
            dump,
        } => cmd_autocomplete(&index_dir, output.as_deref(), max_prefix, top_k, dump),
        Commands::Search {
            index_dir,
            query,
            and,
            phrase,
            top_k,
            timeout_ms,
            cache,
            bench,
        } => cmd_search(
            &index_dir, query, and, phrase, top_k, timeout_ms, cache, bench,
        ),
        Commands::Suggest {
            file,
            prefix,
            limit,
            stats,
        } => cmd_suggest(&file, prefix.as_deref(), limit, stats),
        Commands::Inspect { index_dir } => cmd_inspect(&index_dir),
    };

    if let Err(e) = outcome {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn cmd_index(
    input: &str,
    output: &str,
    block_mib: u64,
    barrels: u32,
    keep_blocks: bool,
) -> Result<()> {
    let config = BuildConfig {
        input: PathBuf::from(input),
        out_dir: PathBuf::from(output),
        block_budget: block_mib.saturating_mul(1024 * 1024).max(1),
        num_barrels: barrels,
        keep_blocks,
    };
    let summary = run_build(&config)?;
    println!(
        "Indexed {} documents, {} terms ({} blocks, {} records skipped) into {}",
        summary.doc_count, summary.term_count, summary.block_count, summary.skipped_records, output
    );
    Ok(())
}

fn cmd_autocomplete(
    index_dir: &str,
    output: Option<&str>,
    max_prefix: usize,
    top_k: usize,
    dump: bool,
) -> Result<()> {
    let dir = Path::new(index_dir);
    let lexicon = quarry::index::lexicon::Lexicon::load(
        &dir.join(quarry::index::lexicon::LEXICON_FILE),
    )?;

    let started = Instant::now();
    let config = SuggestBuildConfig { max_prefix, top_k };
    let table = build_table(&lexicon, &config);

    let out_path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| dir.join(AUTOCOMPLETE_FILE));
    write_table(&table, &out_path)?;
    if dump {
        let mut dump_path = out_path.clone().into_os_string();
        dump_path.push(".txt");
        write_readable_dump(&table, Path::new(&dump_path))?;
    }

    println!(
        "Built {} prefixes from {} terms in {:.0} ms: {}",
        table.len(),
        lexicon.len(),
        started.elapsed().as_secs_f64() * 1000.0,
        out_path.display()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_search(
    index_dir: &str,
    query: Option<String>,
    and: Option<String>,
    phrase: Option<String>,
    top_k: usize,
    timeout_ms: Option<u64>,
    cache: Option<usize>,
    bench: bool,
) -> Result<()> {
    let index = Index::open_with(
        Path::new(index_dir),
        OpenOptions {
            cache_capacity: cache,
            skip_forward: false,
        },
    )?;
    let searcher = Searcher::new(&index);
    let options = |deadline_ms: Option<u64>| SearchOptions {
        top_k,
        deadline: deadline_ms.map(|ms| Instant::now() + Duration::from_millis(ms)),
    };

    if bench {
        return run_benchmark(&searcher, top_k);
    }

    if let Some(terms) = phrase {
        let response =
            searcher.search_phrase(&quarry::utils::tokenize_query(&terms), &options(timeout_ms))?;
        print_response(&response);
        return Ok(());
    }
    if let Some(terms) = and {
        let response =
            searcher.search_and(&quarry::utils::tokenize_query(&terms), &options(timeout_ms))?;
        print_response(&response);
        return Ok(());
    }
    if let Some(terms) = query {
        let response =
            searcher.search_or(&quarry::utils::tokenize_query(&terms), &options(timeout_ms))?;
        print_response(&response);
        return Ok(());
    }

    // Interactive prompt.
    println!("Enter queries (or 'quit' to exit):");
    println!("  OR search:      machine learning");
    println!("  AND search:     +neural network");
    println!("  Phrase search:  \"deep learning\"");
    println!();

    let stdin = io::stdin();
    loop {
        print!("Query> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line == "quit" || line == "exit" {
            break;
        }
        if line.is_empty() {
            continue;
        }
        let response = searcher.query(line, &options(timeout_ms))?;
        print_response(&response);
    }

    print_latency_summary(&searcher.stats());
    print_cache_usage(&index);
    Ok(())
}

/// The canned benchmark mix: one-shot latencies across query shapes.
fn run_benchmark(searcher: &Searcher<'_>, top_k: usize) -> Result<()> {
    let queries = [
        ("single term", "machine"),
        ("two terms OR", "machine learning"),
        ("three terms OR", "deep neural network"),
        ("two terms AND", "+machine learning"),
        ("three terms AND", "+deep neural network"),
        ("phrase 2 words", "\"machine learning\""),
        ("phrase 3 words", "\"deep neural network\""),
        ("common term", "data"),
        ("rare term", "immunotherapy"),
    ];

    println!("Running {} benchmark queries...\n", queries.len());
    for (name, raw) in queries {
        let response = searcher.query(raw, &SearchOptions::top_k(top_k))?;
        println!(
            "{:<18} {:>8.2} ms  ({} results)",
            name,
            response.elapsed_ms,
            response.results.len()
        );
    }

    print_latency_summary(&searcher.stats());
    print_cache_usage(searcher.index());
    Ok(())
}

fn print_cache_usage(index: &Index) {
    let stats = index.barrels.stats();
    println!("\n=== Barrel cache ===");
    println!(
        "resident: {}/{} barrels ({})",
        stats.resident,
        index.barrels.num_barrels(),
        format_size(stats.resident_bytes)
    );
    println!("hits: {}, misses: {}", stats.hits, stats.misses);
}

fn cmd_suggest(file: &str, prefix: Option<&str>, limit: usize, stats: bool) -> Result<()> {
    let started = Instant::now();
    let index = AutocompleteIndex::load(Path::new(file))?;
    eprintln!(
        "Loaded autocomplete table in {:.0} ms",
        started.elapsed().as_secs_f64() * 1000.0
    );

    if stats {
        let s = index.stats();
        println!("prefixes: {}", s.prefixes);
        println!("suggestions: {}", s.suggestions);
        println!("per prefix: min {}, max {}", s.min_per_prefix, s.max_per_prefix);
        if prefix.is_none() {
            return Ok(());
        }
    }

    if let Some(prefix) = prefix {
        let started = Instant::now();
        let suggestions = index.suggest(prefix, limit);
        print_suggestions(prefix, &suggestions, started.elapsed().as_micros());
        return Ok(());
    }

    println!("Type a prefix for suggestions (at least 2 characters, 'quit' to exit)\n");
    let stdin = io::stdin();
    loop {
        print!("Prefix> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line == "quit" || line == "exit" {
            break;
        }
        if line.is_empty() {
            continue;
        }
        let started = Instant::now();
        let suggestions = index.suggest(line, limit);
        print_suggestions(line, &suggestions, started.elapsed().as_micros());
    }
    Ok(())
}

fn cmd_inspect(index_dir: &str) -> Result<()> {
    let dir = Path::new(index_dir);
    let index = Index::open(dir)?;

    println!("=== Index: {} ===", index_dir);
    println!("documents: {}", index.total_docs);
    println!("terms: {}", index.lexicon.len());
    println!("docs with metadata: {}", index.meta_count());
    println!("avg doc length: {:.2}", index.avg_doc_length);

    if let Some(manifest) = &index.manifest {
        println!(
            "postings: {} ({} tokens)",
            manifest.posting_count, manifest.token_count
        );
        println!(
            "built with: {} blocks, {} budget",
            manifest.block_count,
            format_size(manifest.block_budget_bytes as usize)
        );
    } else {
        println!("manifest: absent (partial or legacy build)");
    }

    println!("barrels: {}", index.barrels.num_barrels());
    for id in 0..index.barrels.num_barrels() {
        let path = dir.join(barrel_file_name(id));
        let size = std::fs::metadata(&path).map(|m| m.len() as usize).unwrap_or(0);
        let status = match index.barrels.get(id) {
            Ok(_) => "ok",
            Err(_) => "CORRUPT",
        };
        println!("  barrel_{}: {} [{}]", id, format_size(size), status);
    }
    Ok(())
}
