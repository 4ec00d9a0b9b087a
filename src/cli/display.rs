// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Terminal rendering for search results, suggestions, and statistics.

use crate::search::{LatencySummary, QueryStats};
use crate::types::{SearchResponse, Suggestion};

pub fn print_response(response: &SearchResponse) {
    if response.timed_out {
        println!(
            "Found {} results in {:.2} ms (deadline hit, partial)\n",
            response.results.len(),
            response.elapsed_ms
        );
    } else {
        println!(
            "Found {} results in {:.2} ms\n",
            response.results.len(),
            response.elapsed_ms
        );
    }

    for (i, r) in response.results.iter().enumerate() {
        println!(
            "{}. [final {:.2} | bm25 {:.2} | recency {:.2}]",
            i + 1,
            r.final_score,
            r.bm25_score,
            r.recency_score
        );
        println!("   doc: {}", r.ext_id);
        if let Some(title) = &r.title {
            println!("   title: {}", title);
        }
        if let Some(date) = &r.pub_date {
            if !date.is_empty() {
                println!("   date: {}", date);
            }
        }
        if !r.term_freqs.is_empty() {
            let mut terms: Vec<_> = r.term_freqs.iter().collect();
            terms.sort();
            let rendered: Vec<String> =
                terms.iter().map(|(t, tf)| format!("{}({})", t, tf)).collect();
            println!("   terms: {}", rendered.join(" "));
        }
        println!();
    }
}

pub fn print_suggestions(prefix: &str, suggestions: &[Suggestion], elapsed_us: u128) {
    if suggestions.is_empty() {
        println!("No suggestions for '{}'", prefix);
        return;
    }
    println!(
        "{} suggestions in {} µs:",
        suggestions.len(),
        elapsed_us
    );
    for (i, s) in suggestions.iter().enumerate() {
        println!(
            "  {}. {} (pop={:.2}, df={}, cf={})",
            i + 1,
            s.term,
            s.popularity,
            s.doc_freq,
            s.coll_freq
        );
    }
}

pub fn print_latency_summary(stats: &QueryStats) {
    let Some(summary) = stats.summary() else {
        return;
    };
    println!("\n=== Query latency ===");
    print_summary_rows(&summary);

    let mut modes: Vec<_> = stats.by_mode().iter().collect();
    modes.sort();
    if !modes.is_empty() {
        println!("by mode:");
        for (mode, count) in modes {
            println!("  {:<8} {}", mode, count);
        }
    }
}

fn print_summary_rows(summary: &LatencySummary) {
    println!("queries: {}", summary.queries);
    println!("min:     {:.3} ms", summary.min_ms);
    println!("mean:    {:.3} ms", summary.mean_ms);
    println!("median:  {:.3} ms", summary.median_ms);
    println!("p95:     {:.3} ms", summary.p95_ms);
    println!("p99:     {:.3} ms", summary.p99_ms);
    println!("max:     {:.3} ms", summary.max_ms);
}

pub fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b >= MIB {
        format!("{:.1} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}
