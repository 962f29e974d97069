pub mod block;
pub mod chunk;
pub mod clock;
pub mod entity;
pub mod error;
pub mod position;
pub mod source;
pub mod stats;

use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};
use std::time::Instant;

use block::BlockId;
use chunk::Chunk;
use dashmap::{DashMap, DashSet};
use error::WorldError;
use position::{BlockPos, ChunkPos, LocalBlockPos};
use rayon::prelude::*;
use source::{ChunkGenerator, ChunkSource};
use stats::{ChunkStats, ChunkStatsSnapshot};

/// A chunk resident in a [`ChunkTable`].
///
/// Handed out as `Arc<LoadedChunk>`; the table stays the owner of record and
/// dropping the table entry (eviction) is what unloads it. Block data sits
/// behind a lock so readers never observe a half-applied write.
pub struct LoadedChunk {
    pos: ChunkPos,
    data: RwLock<Chunk>,
}

impl LoadedChunk {
    fn new(pos: ChunkPos, chunk: Chunk) -> Self {
        Self {
            pos,
            data: RwLock::new(chunk),
        }
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn get_block(&self, pos: LocalBlockPos) -> BlockId {
        self.read().get_block(pos)
    }

    pub fn highest_block_y(&self, x: u8, z: u8) -> Option<i64> {
        self.read().highest_block_y(x, z)
    }

    /// Shared access to the block data. Hold it briefly: writers wait on it.
    pub fn read(&self) -> RwLockReadGuard<'_, Chunk> {
        self.data.read().expect("chunk lock poisoned")
    }

    /// Consistent copy of the block data.
    pub fn snapshot(&self) -> Chunk {
        self.read().clone()
    }

    fn set_block(&self, pos: LocalBlockPos, block: BlockId) -> BlockId {
        let mut data = self.data.write().expect("chunk lock poisoned");
        let old = data.get_block(pos);
        data.set_block(pos, block);
        old
    }
}

impl std::fmt::Debug for LoadedChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedChunk").field("pos", &self.pos).finish()
    }
}

/// The loaded-chunk table of one world. Thread-safe, lock-sharded by chunk.
///
/// Chunks are materialized on first access: read from the [`ChunkSource`] if
/// persisted there, otherwise produced by the [`ChunkGenerator`]. Each chunk
/// position has a single materialization right (a per-key mutex), so
/// concurrent first accesses to one position fold into one load or generation
/// and all callers receive the same `Arc`.
pub struct ChunkTable {
    seed: i64,
    source: Arc<dyn ChunkSource>,
    generator: Arc<dyn ChunkGenerator>,
    chunks: DashMap<ChunkPos, Arc<LoadedChunk>>,
    /// Per-position materialization locks. An entry exists only while some
    /// thread is loading, generating or evicting that position.
    materializing: DashMap<ChunkPos, Arc<Mutex<()>>>,
    /// Chunks that have been modified (or generated) since the last save.
    dirty: DashSet<ChunkPos>,
    /// Serializes saves and evictions against each other.
    save_lock: Mutex<()>,
    stats: ChunkStats,
}

impl ChunkTable {
    pub fn new(seed: i64, source: Arc<dyn ChunkSource>, generator: Arc<dyn ChunkGenerator>) -> Self {
        Self {
            seed,
            source,
            generator,
            chunks: DashMap::new(),
            materializing: DashMap::new(),
            dirty: DashSet::new(),
            save_lock: Mutex::new(()),
            stats: ChunkStats::new(),
        }
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn generator(&self) -> &Arc<dyn ChunkGenerator> {
        &self.generator
    }

    // ── Materialization ─────────────────────────────────────────────────

    /// The chunk at `pos`, loading or generating it if needed. Never absent.
    pub fn chunk(&self, pos: ChunkPos) -> Result<Arc<LoadedChunk>, WorldError> {
        match self.chunk_if(pos, true)? {
            Some(chunk) => Ok(chunk),
            None => Err(WorldError::Generation {
                pos,
                source: "materialization yielded no chunk".into(),
            }),
        }
    }

    /// The chunk at `pos`. When `generate` is false and the chunk is neither
    /// loaded nor persisted, returns `Ok(None)` and leaves the table untouched.
    pub fn chunk_if(
        &self,
        pos: ChunkPos,
        generate: bool,
    ) -> Result<Option<Arc<LoadedChunk>>, WorldError> {
        if let Some(chunk) = self.loaded(pos) {
            return Ok(Some(chunk));
        }

        self.with_key_lock(pos, || {
            // Whoever held the lock before us may have finished the job.
            if let Some(chunk) = self.loaded(pos) {
                return Ok(Some(chunk));
            }
            self.materialize(pos, generate)
        })
    }

    fn loaded(&self, pos: ChunkPos) -> Option<Arc<LoadedChunk>> {
        self.chunks.get(&pos).map(|entry| Arc::clone(entry.value()))
    }

    /// Run `f` while holding the materialization right for `pos`.
    fn with_key_lock<T>(&self, pos: ChunkPos, f: impl FnOnce() -> T) -> T {
        let key_lock = Arc::clone(self.materializing.entry(pos).or_default().value());

        let result = {
            let _guard = key_lock.lock().expect("materialization lock poisoned");
            f()
        };

        // Last one out removes the entry. Clones are taken under the shard
        // lock, so a count of 2 (map + ours) means nobody else is queued.
        self.materializing
            .remove_if(&pos, |_, l| Arc::ptr_eq(l, &key_lock) && Arc::strong_count(l) == 2);
        result
    }

    /// Caller must hold the key lock for `pos`.
    fn materialize(
        &self,
        pos: ChunkPos,
        generate: bool,
    ) -> Result<Option<Arc<LoadedChunk>>, WorldError> {
        let stored = self
            .source
            .load(pos)
            .map_err(|source| WorldError::ChunkLoad { pos, source })?;

        let (chunk, generated) = match stored {
            Some(chunk) => {
                self.stats.record_load();
                (chunk, false)
            }
            None if generate => {
                let start = Instant::now();
                let chunk = self
                    .generator
                    .generate(self.seed, pos)
                    .map_err(|source| WorldError::Generation { pos, source })?;
                self.stats.record_generation();
                tracing::debug!(
                    "Generated chunk {} with '{}' ({:.2?})",
                    pos,
                    self.generator.name(),
                    start.elapsed()
                );
                (chunk, true)
            }
            None => {
                self.stats.record_miss();
                return Ok(None);
            }
        };

        let handle = Arc::new(LoadedChunk::new(pos, chunk));
        // Insert before marking dirty so a concurrent save never sees a dirty
        // position without its chunk.
        self.chunks.insert(pos, Arc::clone(&handle));
        if generated {
            self.dirty.insert(pos);
        }
        Ok(Some(handle))
    }

    /// Materialize every chunk in the square of `radius` around `center`,
    /// in parallel. Returns the number of chunks in the square.
    pub fn preload_area(&self, center: ChunkPos, radius: i32) -> Result<usize, WorldError> {
        let positions: Vec<ChunkPos> = (-radius..=radius)
            .flat_map(|dx| {
                (-radius..=radius).map(move |dz| ChunkPos::new(center.x + dx, center.z + dz))
            })
            .collect();

        let start = Instant::now();
        positions
            .par_iter()
            .try_for_each(|&pos| self.chunk(pos).map(|_| ()))?;

        tracing::info!(
            "Preloaded {} chunks around {} ({:.2?})",
            positions.len(),
            center,
            start.elapsed()
        );
        Ok(positions.len())
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn is_loaded(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    /// Snapshot of the loaded set at call time.
    pub fn loaded_chunks(&self) -> Vec<Arc<LoadedChunk>> {
        self.chunks
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Read a block, materializing its chunk.
    pub fn get_block(&self, pos: BlockPos) -> Result<BlockId, WorldError> {
        Ok(self.chunk(pos.chunk())?.get_block(pos.local()))
    }

    /// Write a block, materializing its chunk. Returns the previous block.
    /// Marks the containing chunk dirty.
    pub fn set_block(&self, pos: BlockPos, block: BlockId) -> Result<BlockId, WorldError> {
        let chunk_pos = pos.chunk();
        let chunk = self.chunk(chunk_pos)?;
        let old = chunk.set_block(pos.local(), block);
        self.dirty.insert(chunk_pos);
        Ok(old)
    }

    /// Y of the topmost non-air block at block column (x, z), materializing
    /// its chunk. An all-air column reports 0.
    pub fn highest_y(&self, x: i64, z: i64) -> Result<i64, WorldError> {
        let pos = BlockPos::new(x, 0, z);
        let local = pos.local();
        let chunk = self.chunk(pos.chunk())?;
        Ok(chunk.highest_block_y(local.x, local.z).unwrap_or(0))
    }

    // ── Persistence ─────────────────────────────────────────────────────

    pub fn is_dirty(&self, pos: ChunkPos) -> bool {
        self.dirty.contains(&pos)
    }

    /// Number of chunks currently marked dirty.
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Drain and return all chunk positions marked dirty.
    fn take_dirty(&self) -> Vec<ChunkPos> {
        // Collect then remove; a chunk dirtied between the two steps just
        // gets written again by the next save.
        let dirty: Vec<ChunkPos> = self.dirty.iter().map(|entry| *entry).collect();
        for pos in &dirty {
            self.dirty.remove(pos);
        }
        dirty
    }

    /// Write every dirty loaded chunk to the source. Returns the number of
    /// chunks written.
    ///
    /// Each chunk is copied under its read lock, so the stored image is never
    /// half-written. Loads of other positions proceed while this runs. On
    /// failure the positions are marked dirty again and the loaded chunks are
    /// left as they were.
    pub fn save(&self) -> Result<usize, WorldError> {
        let _guard = self.save_lock.lock().expect("save lock poisoned");

        let dirty = self.take_dirty();
        if dirty.is_empty() {
            tracing::debug!("Chunk save: nothing to save (no dirty chunks)");
            return Ok(0);
        }

        let start = Instant::now();
        let batch: Vec<(ChunkPos, Chunk)> = dirty
            .iter()
            .filter_map(|pos| self.loaded(*pos))
            .map(|chunk| (chunk.pos(), chunk.snapshot()))
            .collect();

        if let Err(source) = self.source.store(&batch) {
            for (pos, _) in &batch {
                self.dirty.insert(*pos);
            }
            tracing::warn!("Chunk save failed; {} chunks stay dirty", batch.len());
            return Err(WorldError::Save {
                chunks: batch.len(),
                source,
            });
        }

        self.stats.record_saved(batch.len() as u64);
        tracing::info!("Saved {} dirty chunks ({:.2?})", batch.len(), start.elapsed());
        Ok(batch.len())
    }

    /// Evict the chunk at `pos`. When `save` is set and the chunk is dirty it
    /// is written first; if that write fails the chunk stays loaded.
    ///
    /// Returns `false` if the chunk was not loaded. Which chunks to evict and
    /// when is up to the caller.
    pub fn unload(&self, pos: ChunkPos, save: bool) -> Result<bool, WorldError> {
        let _guard = self.save_lock.lock().expect("save lock poisoned");

        self.with_key_lock(pos, || {
            let Some((_, chunk)) = self.chunks.remove(&pos) else {
                return Ok(false);
            };
            let was_dirty = self.dirty.remove(&pos).is_some();

            if save && was_dirty {
                let batch = [(pos, chunk.snapshot())];
                if let Err(source) = self.source.store(&batch) {
                    self.chunks.insert(pos, chunk);
                    self.dirty.insert(pos);
                    return Err(WorldError::Save { chunks: 1, source });
                }
                self.stats.record_saved(1);
            }

            self.stats.record_unload();
            tracing::debug!("Unloaded chunk {}", pos);
            Ok(true)
        })
    }

    pub fn stats(&self) -> ChunkStatsSnapshot {
        self.stats.snapshot()
    }
}
