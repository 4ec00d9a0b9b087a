// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The query engine: OR, AND, and phrase search over an opened index.
//!
//! Every operation follows the same shape: plan the terms against the
//! lexicon, preload the barrels the plan touches, decode posting lists,
//! match, score, rank. The searcher only borrows the index, so any number
//! of them (or any number of threads through one) can run concurrently.
//!
//! Deadlines are checked at per-posting granularity during decoding and
//! per-candidate during matching. An expired deadline never errors: the
//! response carries whatever was scored so far with `timed_out` set.
//!
//! Ranking is deterministic: descending final score, ties broken by
//! ascending doc id, so identical queries always return identical lists.

pub mod phrase;
pub mod planner;

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;

use crate::binary::PostingCursor;
use crate::error::Result;
use crate::index::Index;
use crate::scoring::{field_from_position, FieldTag, ScoringConfig};
use crate::types::{DocId, Posting, QueryMode, SearchResponse, SearchResult};

use planner::plan;

/// Per-query knobs.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub top_k: usize,
    /// Absolute deadline; decoding and matching stop when it passes.
    pub deadline: Option<Instant>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            top_k: 10,
            deadline: None,
        }
    }
}

impl SearchOptions {
    pub fn top_k(top_k: usize) -> Self {
        SearchOptions {
            top_k,
            ..Default::default()
        }
    }
}

/// Latency percentiles over the queries a searcher has served.
#[derive(Debug, Clone, Default)]
pub struct QueryStats {
    samples_ms: Vec<f64>,
    by_mode: HashMap<&'static str, u64>,
}

#[derive(Debug, Clone, Copy)]
pub struct LatencySummary {
    pub queries: usize,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

impl QueryStats {
    fn record(&mut self, mode: &'static str, elapsed_ms: f64) {
        self.samples_ms.push(elapsed_ms);
        *self.by_mode.entry(mode).or_insert(0) += 1;
    }

    pub fn by_mode(&self) -> &HashMap<&'static str, u64> {
        &self.by_mode
    }

    pub fn summary(&self) -> Option<LatencySummary> {
        if self.samples_ms.is_empty() {
            return None;
        }
        let mut sorted = self.samples_ms.clone();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let pick = |q: usize| sorted[(n * q / 100).min(n - 1)];
        Some(LatencySummary {
            queries: n,
            min_ms: sorted[0],
            mean_ms: sorted.iter().sum::<f64>() / n as f64,
            median_ms: sorted[n / 2],
            p95_ms: pick(95),
            p99_ms: pick(99),
            max_ms: sorted[n - 1],
        })
    }
}

pub struct Searcher<'a> {
    index: &'a Index,
    config: ScoringConfig,
    stats: Mutex<QueryStats>,
}

impl<'a> Searcher<'a> {
    pub fn new(index: &'a Index) -> Self {
        Self::with_config(index, ScoringConfig::default())
    }

    pub fn with_config(index: &'a Index, config: ScoringConfig) -> Self {
        Searcher {
            index,
            config,
            stats: Mutex::new(QueryStats::default()),
        }
    }

    pub fn index(&self) -> &Index {
        self.index
    }

    pub fn stats(&self) -> QueryStats {
        self.stats.lock().clone()
    }

    /// Interactive entry point: infer the mode from the query syntax.
    pub fn query(&self, raw: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let (mode, terms) = planner::parse_query(raw);
        match mode {
            QueryMode::Or => self.search_or(&terms, options),
            QueryMode::And => self.search_and(&terms, options),
            QueryMode::Phrase => self.search_phrase(&terms, options),
        }
    }

    /// Disjunctive search: any term may match; missing terms are dropped.
    pub fn search_or(&self, terms: &[String], options: &SearchOptions) -> Result<SearchResponse> {
        let started = Instant::now();
        let plan = plan(self.index, terms, QueryMode::Or);
        if plan.is_empty() {
            return Ok(self.finish("or", started, Vec::new(), false, options));
        }
        self.index.barrels.preload(&plan.barrel_ids())?;

        let mut timed_out = false;
        let mut accum: HashMap<DocId, Accumulator> = HashMap::new();
        for planned in &plan.terms {
            let postings = self.decode(planned.entry, options.deadline, &mut timed_out)?;
            for posting in &postings {
                self.accumulate(&mut accum, planned, posting);
            }
            if timed_out {
                break;
            }
        }

        let results = self.rank(accum);
        Ok(self.finish("or", started, results, timed_out, options))
    }

    /// Conjunctive search: every term must match; any missing term yields
    /// the empty set.
    pub fn search_and(&self, terms: &[String], options: &SearchOptions) -> Result<SearchResponse> {
        let started = Instant::now();
        let plan = plan(self.index, terms, QueryMode::And);
        if plan.is_empty() || plan.terms.len() != terms.len() {
            return Ok(self.finish("and", started, Vec::new(), false, options));
        }
        self.index.barrels.preload(&plan.barrel_ids())?;

        // Rarest term first: it bounds the candidate set.
        let mut order: Vec<usize> = (0..plan.terms.len()).collect();
        order.sort_by_key(|&i| plan.terms[i].entry.doc_freq);

        let mut timed_out = false;
        let mut lists: Vec<(usize, Vec<Posting>)> = Vec::with_capacity(order.len());
        for &i in &order {
            let postings = self.decode(plan.terms[i].entry, options.deadline, &mut timed_out)?;
            lists.push((i, postings));
            if timed_out {
                break;
            }
        }

        // Intersect by doc id, driven by the rarest list.
        let mut candidates: Vec<DocId> = lists
            .first()
            .map(|(_, l)| l.iter().map(|p| p.doc_id).collect())
            .unwrap_or_default();
        for (_, list) in lists.iter().skip(1) {
            candidates.retain(|&doc| list.binary_search_by_key(&doc, |p| p.doc_id).is_ok());
            if candidates.is_empty() {
                break;
            }
        }
        if timed_out && lists.len() != plan.terms.len() {
            // Not all conjuncts decoded; nothing can be confirmed.
            candidates.clear();
        }

        let mut accum: HashMap<DocId, Accumulator> = HashMap::new();
        for &doc in &candidates {
            for (i, list) in &lists {
                let posting = &list[list
                    .binary_search_by_key(&doc, |p| p.doc_id)
                    .expect("candidate came from intersection")];
                self.accumulate(&mut accum, &plan.terms[*i], posting);
            }
        }

        let results = self.rank(accum);
        Ok(self.finish("and", started, results, timed_out, options))
    }

    /// Phrase search: terms must appear consecutively in the given order.
    pub fn search_phrase(
        &self,
        terms: &[String],
        options: &SearchOptions,
    ) -> Result<SearchResponse> {
        let started = Instant::now();
        let plan = plan(self.index, terms, QueryMode::Phrase);
        if plan.is_empty() || plan.terms.len() != terms.len() {
            return Ok(self.finish("phrase", started, Vec::new(), false, options));
        }
        self.index.barrels.preload(&plan.barrel_ids())?;

        let mut timed_out = false;
        let mut lists = Vec::with_capacity(plan.terms.len());
        for planned in &plan.terms {
            lists.push(self.decode(planned.entry, options.deadline, &mut timed_out)?);
            if timed_out {
                return Ok(self.finish("phrase", started, Vec::new(), true, options));
            }
        }

        let (hits, matcher_timed_out) = phrase::find_phrase_hits(&lists, options.deadline);
        timed_out |= matcher_timed_out;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let doc_length = self.index.doc_length(hit.doc_id);
            let tag = field_from_position(hit.start_position, doc_length);
            let bm25 = self.config.phrase_score(tag);
            results.push(self.make_result(hit.doc_id, bm25, HashMap::new()));
        }
        results.sort_by(compare_results);
        Ok(self.finish("phrase", started, results, timed_out, options))
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    fn decode(
        &self,
        entry: &crate::types::LexiconEntry,
        deadline: Option<Instant>,
        timed_out: &mut bool,
    ) -> Result<Vec<Posting>> {
        let barrel = self.index.barrels.get(entry.barrel_id)?;
        let cursor = PostingCursor::new(&barrel, entry)?;
        let mut postings = Vec::with_capacity(cursor.doc_count() as usize);
        for item in cursor {
            // Check before decoding lands: an already-expired deadline must
            // yield nothing, not one stray posting.
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    *timed_out = true;
                    break;
                }
            }
            postings.push(item?);
        }
        Ok(postings)
    }

    fn accumulate(
        &self,
        accum: &mut HashMap<DocId, Accumulator>,
        planned: &planner::PlannedTerm<'_>,
        posting: &Posting,
    ) {
        let doc_length = self.index.doc_length(posting.doc_id);
        let tag = posting
            .positions
            .first()
            .map(|&p| field_from_position(p, doc_length))
            .unwrap_or(FieldTag::Body);
        let bm25 = self.config.bm25_fielded(
            posting.tf,
            doc_length,
            planned.entry.doc_freq,
            self.index.total_docs,
            self.index.avg_doc_length,
            tag,
        );

        let entry = accum.entry(posting.doc_id).or_default();
        entry.bm25 += bm25;
        entry.term_freqs.insert(planned.term.clone(), posting.tf);
    }

    fn rank(&self, accum: HashMap<DocId, Accumulator>) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = accum
            .into_iter()
            .map(|(doc_id, acc)| self.make_result(doc_id, acc.bm25, acc.term_freqs))
            .collect();
        results.sort_by(compare_results);
        results
    }

    fn make_result(
        &self,
        doc_id: DocId,
        bm25: f64,
        term_freqs: HashMap<String, u32>,
    ) -> SearchResult {
        let meta = self.index.doc_meta(doc_id);
        let recency = self.config.recency(meta.and_then(|m| m.year));
        SearchResult {
            doc_id,
            ext_id: self.index.ext_id(doc_id),
            final_score: self.config.combine(bm25, recency),
            bm25_score: bm25,
            recency_score: recency,
            term_freqs,
            title: meta.and_then(|m| m.title.clone()),
            pub_date: meta.and_then(|m| m.pub_date.clone()),
        }
    }

    fn finish(
        &self,
        mode: &'static str,
        started: Instant,
        mut results: Vec<SearchResult>,
        timed_out: bool,
        options: &SearchOptions,
    ) -> SearchResponse {
        results.truncate(options.top_k);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.stats.lock().record(mode, elapsed_ms);
        SearchResponse {
            results,
            elapsed_ms,
            timed_out,
        }
    }
}

#[derive(Default)]
struct Accumulator {
    bm25: f64,
    term_freqs: HashMap<String, u32>,
}

/// Descending final score, ascending doc id; total and deterministic.
fn compare_results(a: &SearchResult, b: &SearchResult) -> std::cmp::Ordering {
    b.final_score
        .total_cmp(&a.final_score)
        .then(a.doc_id.cmp(&b.doc_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{run_build, BuildConfig};
    use std::path::Path;

    fn doc_line(ext_id: &str, pub_date: &str, terms: &[(&str, u32)]) -> String {
        let tokens: Vec<String> = terms
            .iter()
            .map(|(t, p)| format!(r#"{{"term":"{}","pos":{}}}"#, t, p))
            .collect();
        format!(
            r#"{{"docid":"{}","pub_date":"{}","fields":[{{"tokens":[{}]}}]}}"#,
            ext_id,
            pub_date,
            tokens.join(",")
        )
    }

    /// The three-document corpus: d1 "the quick brown fox",
    /// d2 "quick brown dogs", d3 "lazy dogs".
    fn build_fox_corpus(dir: &Path) -> Index {
        let input = dir.join("cleaned.jsonl");
        let lines = [
            doc_line(
                "d1",
                "2020",
                &[("the", 0), ("quick", 1), ("brown", 2), ("fox", 3)],
            ),
            doc_line("d2", "2010", &[("quick", 0), ("brown", 1), ("dogs", 2)]),
            doc_line("d3", "", &[("lazy", 0), ("dogs", 1)]),
        ];
        std::fs::write(&input, lines.join("\n")).unwrap();
        let out = dir.join("index");
        run_build(&BuildConfig::new(&input, &out)).unwrap();
        Index::open(&out).unwrap()
    }

    fn ext_ids(response: &SearchResponse) -> Vec<&str> {
        response.results.iter().map(|r| r.ext_id.as_str()).collect()
    }

    #[test]
    fn test_or_query_both_terms_first() {
        let dir = tempfile::tempdir().unwrap();
        let index = build_fox_corpus(dir.path());
        let searcher = Searcher::new(&index);

        let response = searcher
            .search_or(&["quick".into(), "dogs".into()], &SearchOptions::default())
            .unwrap();
        let ids = ext_ids(&response);
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], "d2", "doc with both terms must rank first");
        assert!(!response.timed_out);
    }

    #[test]
    fn test_or_drops_missing_term() {
        let dir = tempfile::tempdir().unwrap();
        let index = build_fox_corpus(dir.path());
        let searcher = Searcher::new(&index);

        let response = searcher
            .search_or(
                &["quick".into(), "zebra".into()],
                &SearchOptions::default(),
            )
            .unwrap();
        assert_eq!(ext_ids(&response), vec!["d2", "d1"]);
    }

    #[test]
    fn test_and_query() {
        let dir = tempfile::tempdir().unwrap();
        let index = build_fox_corpus(dir.path());
        let searcher = Searcher::new(&index);

        let response = searcher
            .search_and(&["quick".into(), "dogs".into()], &SearchOptions::default())
            .unwrap();
        assert_eq!(ext_ids(&response), vec!["d2"]);

        // Any missing term empties the set, without error.
        let response = searcher
            .search_and(&["quick".into(), "zebra".into()], &SearchOptions::default())
            .unwrap();
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_phrase_query() {
        let dir = tempfile::tempdir().unwrap();
        let index = build_fox_corpus(dir.path());
        let searcher = Searcher::new(&index);

        let response = searcher
            .search_phrase(&["quick".into(), "brown".into()], &SearchOptions::default())
            .unwrap();
        let mut ids = ext_ids(&response);
        ids.sort();
        assert_eq!(ids, vec!["d1", "d2"]);
        assert!(response.results.iter().all(|r| r.term_freqs.is_empty()));

        let reversed = searcher
            .search_phrase(&["brown".into(), "quick".into()], &SearchOptions::default())
            .unwrap();
        assert!(reversed.results.is_empty());
    }

    #[test]
    fn test_recency_components() {
        let dir = tempfile::tempdir().unwrap();
        let index = build_fox_corpus(dir.path());
        let searcher = Searcher::new(&index);

        let response = searcher
            .search_or(&["dogs".into()], &SearchOptions::default())
            .unwrap();
        let by_id: HashMap<&str, &SearchResult> = response
            .results
            .iter()
            .map(|r| (r.ext_id.as_str(), r))
            .collect();

        // d3 has no year: neutral 0.5. d2 is from 2010: exp(-0.1 * 14).
        assert!((by_id["d3"].recency_score - 0.5).abs() < 1e-9);
        assert!((by_id["d2"].recency_score - (-1.4f64).exp()).abs() < 1e-9);
        assert!(by_id["d3"].recency_score > by_id["d2"].recency_score);
    }

    #[test]
    fn test_result_containment() {
        let dir = tempfile::tempdir().unwrap();
        let index = build_fox_corpus(dir.path());
        let searcher = Searcher::new(&index);
        let terms = vec!["quick".to_string(), "brown".to_string()];
        let options = SearchOptions::top_k(100);

        let or_ids: std::collections::HashSet<u32> = searcher
            .search_or(&terms, &options)
            .unwrap()
            .results
            .iter()
            .map(|r| r.doc_id)
            .collect();
        let and_ids: std::collections::HashSet<u32> = searcher
            .search_and(&terms, &options)
            .unwrap()
            .results
            .iter()
            .map(|r| r.doc_id)
            .collect();
        let phrase_ids: std::collections::HashSet<u32> = searcher
            .search_phrase(&terms, &options)
            .unwrap()
            .results
            .iter()
            .map(|r| r.doc_id)
            .collect();

        assert!(phrase_ids.is_subset(&and_ids));
        assert!(and_ids.is_subset(&or_ids));
    }

    #[test]
    fn test_deterministic_repeat() {
        let dir = tempfile::tempdir().unwrap();
        let index = build_fox_corpus(dir.path());
        let searcher = Searcher::new(&index);
        let terms = vec!["quick".to_string(), "dogs".to_string()];

        let first = searcher.search_or(&terms, &SearchOptions::default()).unwrap();
        for _ in 0..5 {
            let again = searcher.search_or(&terms, &SearchOptions::default()).unwrap();
            assert_eq!(ext_ids(&again), ext_ids(&first));
        }
    }

    #[test]
    fn test_expired_deadline_flags_response() {
        let dir = tempfile::tempdir().unwrap();
        let index = build_fox_corpus(dir.path());
        let searcher = Searcher::new(&index);

        let options = SearchOptions {
            top_k: 10,
            deadline: Some(Instant::now() - std::time::Duration::from_millis(1)),
        };
        let response = searcher.search_or(&["quick".into()], &options).unwrap();
        assert!(response.timed_out);
        assert!(
            response.results.is_empty(),
            "an already-expired deadline must score nothing"
        );

        // Single-term AND goes through its own decode path.
        let response = searcher.search_and(&["quick".into()], &options).unwrap();
        assert!(response.timed_out);
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_stats_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let index = build_fox_corpus(dir.path());
        let searcher = Searcher::new(&index);

        searcher
            .search_or(&["quick".into()], &SearchOptions::default())
            .unwrap();
        searcher
            .search_and(&["quick".into(), "brown".into()], &SearchOptions::default())
            .unwrap();

        let stats = searcher.stats();
        let summary = stats.summary().unwrap();
        assert_eq!(summary.queries, 2);
        assert_eq!(stats.by_mode()["or"], 1);
        assert_eq!(stats.by_mode()["and"], 1);
    }

    #[test]
    fn test_query_mode_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let index = build_fox_corpus(dir.path());
        let searcher = Searcher::new(&index);

        let phrase = searcher
            .query("\"quick brown\"", &SearchOptions::default())
            .unwrap();
        assert_eq!(phrase.results.len(), 2);

        let and = searcher.query("+quick dogs", &SearchOptions::default()).unwrap();
        assert_eq!(ext_ids(&and), vec!["d2"]);
    }
}
