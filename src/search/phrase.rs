// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Positional phrase matching.
//!
//! Candidates come from intersecting posting lists by doc id, driven by the
//! shortest list. Per candidate, every start position of the first term is
//! probed: the phrase matches when term `i` has `start + i` among its
//! positions, checked by binary search since positions are sorted. The
//! first confirmed start wins, one hit per document, its start position
//! feeding the field-boost lookup.
//!
//! Cost: the shortest list bounds the candidate scan; each verification is
//! `O(k · log L)` in the largest per-document position count.

use std::time::Instant;

use crate::types::{DocId, Posting};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhraseHit {
    pub doc_id: DocId,
    /// Position of the first phrase term in the document.
    pub start_position: u32,
}

/// Find every document containing the phrase, given one decoded posting
/// list per term in phrase order. Returns hits in ascending doc-id order
/// plus a flag set when the deadline cut the scan short.
pub fn find_phrase_hits(lists: &[Vec<Posting>], deadline: Option<Instant>) -> (Vec<PhraseHit>, bool) {
    if lists.is_empty() || lists.iter().any(|l| l.is_empty()) {
        return (Vec::new(), false);
    }

    let driver = lists
        .iter()
        .enumerate()
        .min_by_key(|(_, l)| l.len())
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut hits = Vec::new();
    'candidates: for candidate in &lists[driver] {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return (hits, true);
            }
        }

        let doc_id = candidate.doc_id;
        let mut per_term: Vec<&[u32]> = Vec::with_capacity(lists.len());
        for list in lists {
            match list.binary_search_by_key(&doc_id, |p| p.doc_id) {
                Ok(i) => per_term.push(&list[i].positions),
                Err(_) => continue 'candidates,
            }
        }

        for &start in per_term[0] {
            let matched = (1..per_term.len())
                .all(|i| per_term[i].binary_search(&(start + i as u32)).is_ok());
            if matched {
                hits.push(PhraseHit {
                    doc_id,
                    start_position: start,
                });
                continue 'candidates;
            }
        }
    }

    (hits, false)
}
