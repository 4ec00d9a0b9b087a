// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Ranking: BM25 with field boosts and a recency prior.
//!
//! Three signals combine into a document's final score:
//!
//! 1. **BM25** over term frequency, document frequency, and length
//!    normalization (`k1 = 1.2`, `b = 0.75`).
//! 2. **Field boost** inferred from a posting's first position relative to
//!    document length: the first 10% of a paper is the title region, the
//!    next 20% the abstract, the rest body. A heuristic, not real per-field
//!    indexing, and it conflates boundaries for short documents.
//! 3. **Recency**: exponential decay over the paper's age in years, neutral
//!    0.5 when no year can be extracted from `pub_date`.
//!
//! `final = (1 − w_r) · bm25 + w_r · recency · scale`, with `w_r = 0.10` and
//! `scale = 10` so recency stays a minor influence at BM25 magnitudes.
//! Phrase hits bypass per-term BM25 and score `100 · field_boost` instead.

use std::sync::LazyLock;

use regex::Regex;

/// Field region a posting's first occurrence falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTag {
    Title,
    Abstract,
    Body,
}

/// All ranking constants in one place. The defaults are frozen; changing
/// them changes result order for every query.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub k1: f64,
    pub b: f64,
    pub title_boost: f64,
    pub abstract_boost: f64,
    pub body_boost: f64,
    /// Weight of the recency term in the final combination.
    pub recency_weight: f64,
    /// Scales recency (0..1) into the BM25 range.
    pub recency_scale: f64,
    /// Decay rate per year of age.
    pub recency_decay: f64,
    /// Recency for documents without a parseable year.
    pub neutral_recency: f64,
    /// Year ages are measured against.
    pub reference_year: u16,
    /// Base score of a confirmed phrase hit, before the field boost.
    pub phrase_base: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            k1: 1.2,
            b: 0.75,
            title_boost: 3.0,
            abstract_boost: 2.0,
            body_boost: 1.0,
            recency_weight: 0.10,
            recency_scale: 10.0,
            recency_decay: 0.1,
            neutral_recency: 0.5,
            reference_year: 2024,
            phrase_base: 100.0,
        }
    }
}

impl ScoringConfig {
    pub fn field_boost(&self, tag: FieldTag) -> f64 {
        match tag {
            FieldTag::Title => self.title_boost,
            FieldTag::Abstract => self.abstract_boost,
            FieldTag::Body => self.body_boost,
        }
    }

    /// `ln((N - df + 0.5) / (df + 0.5) + 1)`: always positive, shrinking
    /// as the term gets more common.
    pub fn idf(&self, total_docs: u32, doc_freq: u32) -> f64 {
        if total_docs == 0 || doc_freq == 0 {
            return 0.0;
        }
        let n = f64::from(total_docs);
        let df = f64::from(doc_freq);
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Core BM25 for one term/document pair, before the field boost.
    ///
    /// `avg_doc_length <= 0` disables length normalization (the degraded
    /// mode when no forward index is available).
    pub fn bm25(
        &self,
        tf: u32,
        doc_length: u32,
        doc_freq: u32,
        total_docs: u32,
        avg_doc_length: f64,
    ) -> f64 {
        let idf = self.idf(total_docs, doc_freq);
        if idf == 0.0 || tf == 0 {
            return 0.0;
        }
        let norm = if avg_doc_length > 0.0 {
            1.0 - self.b + self.b * (f64::from(doc_length) / avg_doc_length)
        } else {
            1.0
        };
        let tf = f64::from(tf);
        idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * norm)
    }

    pub fn bm25_fielded(
        &self,
        tf: u32,
        doc_length: u32,
        doc_freq: u32,
        total_docs: u32,
        avg_doc_length: f64,
        tag: FieldTag,
    ) -> f64 {
        self.bm25(tf, doc_length, doc_freq, total_docs, avg_doc_length) * self.field_boost(tag)
    }

    /// `exp(−λ · age)` with age clamped at zero; neutral without a year.
    pub fn recency(&self, year: Option<u16>) -> f64 {
        match year {
            Some(y) => {
                let age = f64::from(self.reference_year.saturating_sub(y));
                (-self.recency_decay * age).exp()
            }
            None => self.neutral_recency,
        }
    }

    pub fn combine(&self, bm25_sum: f64, recency: f64) -> f64 {
        (1.0 - self.recency_weight) * bm25_sum
            + self.recency_weight * recency * self.recency_scale
    }

    pub fn phrase_score(&self, tag: FieldTag) -> f64 {
        self.phrase_base * self.field_boost(tag)
    }
}

/// Map a posting's first position to a field region by ratio.
pub fn field_from_position(position: u32, doc_length: u32) -> FieldTag {
    if doc_length == 0 {
        return FieldTag::Body;
    }
    let ratio = f64::from(position) / f64::from(doc_length);
    if ratio < 0.10 {
        FieldTag::Title
    } else if ratio < 0.30 {
        FieldTag::Abstract
    } else {
        FieldTag::Body
    }
}

// Unanchored on purpose: compact dates like "20200314" still carry a year.
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(19|20)\d{2}").expect("year regex"));

/// First plausible four-digit year in a free-form date string.
pub fn extract_year(pub_date: &str) -> Option<u16> {
    YEAR_RE
        .find(pub_date)
        .and_then(|m| m.as_str().parse().ok())
}
