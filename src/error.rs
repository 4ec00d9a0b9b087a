// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the build and query pipelines.
//!
//! Build-time errors are fatal: a half-written index must never be mistaken
//! for a valid one, so the pipeline aborts and the missing manifest marks
//! the directory incomplete. Query-time errors are isolated per query; the
//! engine stays up. Two conditions deliberately do NOT surface as errors:
//! a query term missing from the lexicon (handled per-mode by the planner)
//! and a deadline expiry (reported as a `timed_out` flag on the response).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, QuarryError>;

#[derive(Debug, Error)]
pub enum QuarryError {
    /// Bad command-line arguments or an invalid tunable combination.
    #[error("usage: {0}")]
    Usage(String),

    /// A required input file or directory is absent.
    #[error("missing input: {}", path.display())]
    MissingInput { path: PathBuf },

    /// Codec failure, bounds violation, or a barrel inconsistent with its
    /// lexicon entry. `context` carries the term and byte offset when known.
    #[error("corrupt data: {context}")]
    CorruptData { context: String },

    /// The build stream presented the same external document id twice.
    #[error("duplicate external document id: {0}")]
    DuplicateExternalId(String),

    /// A single input record failed to parse. Callers log and skip; this
    /// variant never aborts a build on its own.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl QuarryError {
    pub fn corrupt(context: impl Into<String>) -> Self {
        QuarryError::CorruptData {
            context: context.into(),
        }
    }

    /// Process exit code for the CLI: 0 success, 1 usage, 2 missing input,
    /// 3 corrupt input, 4 I/O failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            QuarryError::Usage(_) => 1,
            QuarryError::MissingInput { .. } => 2,
            QuarryError::CorruptData { .. }
            | QuarryError::DuplicateExternalId(_)
            | QuarryError::MalformedRecord { .. } => 3,
            QuarryError::Io(_) => 4,
        }
    }
}
