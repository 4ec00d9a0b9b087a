// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The barrel cache: lazy, LRU-bounded loading of barrel byte arrays.
//!
//! Each barrel is one file holding the concatenated posting lists of the
//! terms hashed into it. `get` hands out `Arc<Vec<u8>>` handles: the cache
//! holds one reference, every in-flight decoder holds another, so evicting a
//! barrel can never free bytes someone is still reading. The LRU state sits
//! behind a single mutex; everything handed out is immutable.
//!
//! `preload` pulls in every barrel a query will touch before decoding
//! starts, so a multi-term query cannot thrash its own working set when the
//! capacity is smaller than the barrel count.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{QuarryError, Result};

/// Barrel file name for partition `id`, as laid out by the merger.
pub fn barrel_file_name(id: u32) -> String {
    format!("barrel_{}", id)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub resident: usize,
    pub resident_bytes: usize,
}

#[derive(Default)]
struct CacheState {
    loaded: HashMap<u32, Arc<Vec<u8>>>,
    /// Front = most recently used.
    lru: VecDeque<u32>,
    hits: u64,
    misses: u64,
}

pub struct BarrelCache {
    dir: PathBuf,
    num_barrels: u32,
    capacity: usize,
    /// Expected CRC32 per barrel, when a manifest provided them.
    expected_crc: Vec<Option<u32>>,
    state: Mutex<CacheState>,
}

impl BarrelCache {
    /// `capacity` is clamped to at least 1. Pass `expected_crc` from the
    /// build manifest to verify barrels on load; an empty vector skips
    /// verification.
    pub fn new(dir: &Path, num_barrels: u32, capacity: usize, expected_crc: Vec<Option<u32>>) -> Self {
        BarrelCache {
            dir: dir.to_path_buf(),
            num_barrels,
            capacity: capacity.max(1),
            expected_crc,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn num_barrels(&self) -> u32 {
        self.num_barrels
    }

    /// Read-only handle to the barrel's bytes, loading it on a miss and
    /// evicting the least recently used barrel when the cache is full.
    pub fn get(&self, barrel_id: u32) -> Result<Arc<Vec<u8>>> {
        if barrel_id >= self.num_barrels {
            return Err(QuarryError::corrupt(format!(
                "barrel id {} out of range (0..{})",
                barrel_id, self.num_barrels
            )));
        }

        {
            let mut state = self.state.lock();
            if let Some(data) = state.loaded.get(&barrel_id).cloned() {
                state.hits += 1;
                touch(&mut state.lru, barrel_id);
                return Ok(data);
            }
            state.misses += 1;
        }

        // Read outside the lock so concurrent queries on cached barrels do
        // not stall behind disk I/O.
        let data = Arc::new(self.read_barrel(barrel_id)?);

        let mut state = self.state.lock();
        if !state.loaded.contains_key(&barrel_id) {
            if state.loaded.len() >= self.capacity {
                if let Some(victim) = state.lru.pop_back() {
                    state.loaded.remove(&victim);
                    debug!(barrel = victim, "evicted barrel");
                }
            }
            state.loaded.insert(barrel_id, Arc::clone(&data));
            state.lru.push_front(barrel_id);
        } else {
            touch(&mut state.lru, barrel_id);
        }
        Ok(data)
    }

    /// Bulk `get` for every barrel a query plan touches.
    pub fn preload(&self, barrel_ids: &[u32]) -> Result<()> {
        let mut unique: Vec<u32> = barrel_ids.to_vec();
        unique.sort_unstable();
        unique.dedup();
        for id in unique {
            self.get(id)?;
        }
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            resident: state.loaded.len(),
            resident_bytes: state.loaded.values().map(|b| b.len()).sum(),
        }
    }

    fn read_barrel(&self, barrel_id: u32) -> Result<Vec<u8>> {
        let path = self.dir.join(barrel_file_name(barrel_id));
        if !path.exists() {
            return Err(QuarryError::MissingInput { path });
        }
        let data = fs::read(&path)?;

        if let Some(Some(expected)) = self.expected_crc.get(barrel_id as usize) {
            let actual = crc32fast::hash(&data);
            if actual != *expected {
                return Err(QuarryError::corrupt(format!(
                    "barrel {} checksum mismatch: expected {:08x}, got {:08x}",
                    barrel_id, expected, actual
                )));
            }
        }

        debug!(barrel = barrel_id, bytes = data.len(), "loaded barrel");
        Ok(data)
    }
}

fn touch(lru: &mut VecDeque<u32>, barrel_id: u32) {
    if let Some(pos) = lru.iter().position(|&id| id == barrel_id) {
        lru.remove(pos);
    }
    lru.push_front(barrel_id);
}
