// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Binary formats: the varint codec, posting-list encoding with its lazy
//! decoder, and the autocomplete table layout.

pub mod autocomplete;
pub mod postings;
pub mod varint;

pub use postings::{encode_postings, PostingCursor};
pub use varint::{decode_deltas, decode_u32, encode_deltas, encode_u32, MAX_VARINT_BYTES};
