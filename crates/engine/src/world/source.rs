//! Collaborators the chunk table calls into: a persistent chunk source and a
//! procedural generator.

use std::collections::HashMap;
use std::sync::RwLock;

use super::chunk::Chunk;
use super::error::BoxError;
use super::position::ChunkPos;

/// Persistent chunk storage keyed by chunk position.
///
/// Implementations must round-trip: `store` followed by `load` yields a chunk
/// equal to the one stored.
pub trait ChunkSource: Send + Sync {
    /// Read a persisted chunk. `Ok(None)` means nothing is stored at `pos`.
    fn load(&self, pos: ChunkPos) -> Result<Option<Chunk>, BoxError>;

    /// Whether a chunk is persisted at `pos`, without decoding it.
    fn contains(&self, pos: ChunkPos) -> Result<bool, BoxError>;

    /// Write a batch of chunks. Either the whole batch is durable when this
    /// returns `Ok`, or the error says it may not be.
    fn store(&self, batch: &[(ChunkPos, Chunk)]) -> Result<(), BoxError>;
}

/// Procedural chunk content.
///
/// Must be deterministic: the same `(seed, pos)` always yields an equal chunk.
pub trait ChunkGenerator: Send + Sync {
    /// Stable name, persisted with the world so it can be reopened.
    fn name(&self) -> &str;

    fn generate(&self, seed: i64, pos: ChunkPos) -> Result<Chunk, BoxError>;
}

/// A `ChunkSource` that keeps everything in memory.
#[derive(Default)]
pub struct MemorySource {
    chunks: RwLock<HashMap<ChunkPos, Chunk>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.read().expect("memory source poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChunkSource for MemorySource {
    fn load(&self, pos: ChunkPos) -> Result<Option<Chunk>, BoxError> {
        Ok(self
            .chunks
            .read()
            .expect("memory source poisoned")
            .get(&pos)
            .cloned())
    }

    fn contains(&self, pos: ChunkPos) -> Result<bool, BoxError> {
        Ok(self
            .chunks
            .read()
            .expect("memory source poisoned")
            .contains_key(&pos))
    }

    fn store(&self, batch: &[(ChunkPos, Chunk)]) -> Result<(), BoxError> {
        let mut chunks = self.chunks.write().expect("memory source poisoned");
        for (pos, chunk) in batch {
            chunks.insert(*pos, chunk.clone());
        }
        Ok(())
    }
}
