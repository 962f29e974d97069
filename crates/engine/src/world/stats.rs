//! Lock-free chunk table counters.
//!
//! Updated with relaxed atomics on the materialization path; read at leisure
//! by commands and tests.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

#[derive(Default)]
pub struct ChunkStats {
    loads: AtomicU64,
    generations: AtomicU64,
    misses: AtomicU64,
    saved: AtomicU64,
    unloads: AtomicU64,
}

impl ChunkStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_load(&self) {
        self.loads.fetch_add(1, Relaxed);
    }

    pub(crate) fn record_generation(&self) {
        self.generations.fetch_add(1, Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Relaxed);
    }

    pub(crate) fn record_saved(&self, chunks: u64) {
        self.saved.fetch_add(chunks, Relaxed);
    }

    pub(crate) fn record_unload(&self) {
        self.unloads.fetch_add(1, Relaxed);
    }

    pub fn snapshot(&self) -> ChunkStatsSnapshot {
        ChunkStatsSnapshot {
            loads: self.loads.load(Relaxed),
            generations: self.generations.load(Relaxed),
            misses: self.misses.load(Relaxed),
            saved: self.saved.load(Relaxed),
            unloads: self.unloads.load(Relaxed),
        }
    }
}

/// Point-in-time copy of [`ChunkStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkStatsSnapshot {
    /// Chunks read back from the source.
    pub loads: u64,
    /// Chunks produced by the generator.
    pub generations: u64,
    /// Non-generating lookups that found nothing.
    pub misses: u64,
    /// Chunks written by saves and unloads.
    pub saved: u64,
    pub unloads: u64,
}
