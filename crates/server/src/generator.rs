//! Chunk generators. Both are pure functions of `(seed, pos)`.

use std::sync::Arc;

use noise::{NoiseFn, Perlin};
use trident_engine::world::block::BlockId;
use trident_engine::world::chunk::{Chunk, ChunkSection, SECTION_SIZE};
use trident_engine::world::error::BoxError;
use trident_engine::world::position::{ChunkPos, LocalBlockPos};
use trident_engine::world::source::ChunkGenerator;

use crate::block;
use crate::opts::LevelType;

/// Vanilla superflat: bedrock, stone, dirt and a grass top at y = 3.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatGenerator;

impl FlatGenerator {
    pub const NAME: &'static str = "flat";
    const LAYERS: [BlockId; 4] = [block::BEDROCK, block::STONE, block::DIRT, block::GRASS_BLOCK];
}

impl ChunkGenerator for FlatGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn generate(&self, _seed: i64, _pos: ChunkPos) -> Result<Chunk, BoxError> {
        let mut section = ChunkSection::new_empty();
        for (y, &layer) in Self::LAYERS.iter().enumerate() {
            for z in 0..SECTION_SIZE as u8 {
                for x in 0..SECTION_SIZE as u8 {
                    section.set(x, y as u8, z, layer);
                }
            }
        }
        let mut chunk = Chunk::new();
        chunk.insert_section(0, section);
        Ok(chunk)
    }
}

/// Rolling hills from a 2D Perlin heightmap, flooded up to sea level.
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    name: &'static str,
    amplitude: f64,
}

impl TerrainGenerator {
    pub const NAME: &'static str = "terrain";
    pub const AMPLIFIED_NAME: &'static str = "amplified";

    pub const SEA_LEVEL: i64 = 62;
    const BASE_HEIGHT: f64 = 64.0;
    const SCALE: f64 = 1.0 / 96.0;
    const DIRT_DEPTH: i64 = 3;

    pub fn new() -> Self {
        Self {
            name: Self::NAME,
            amplitude: 20.0,
        }
    }

    pub fn amplified() -> Self {
        Self {
            name: Self::AMPLIFIED_NAME,
            amplitude: 60.0,
        }
    }

    /// Perlin seeds are 32 bits; fold both halves of the world seed in.
    fn noise_seed(seed: i64) -> u32 {
        (seed ^ (seed >> 32)) as u32
    }

    /// Surface height of the column at block (x, z). Always above bedrock.
    pub fn height_at(&self, seed: i64, x: i64, z: i64) -> i64 {
        self.height_with(&Perlin::new(Self::noise_seed(seed)), x, z)
    }

    fn height_with(&self, perlin: &Perlin, x: i64, z: i64) -> i64 {
        let sample = perlin.get([x as f64 * Self::SCALE, z as f64 * Self::SCALE]);
        ((Self::BASE_HEIGHT + sample * self.amplitude).round() as i64).max(1)
    }
}

impl Default for TerrainGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkGenerator for TerrainGenerator {
    fn name(&self) -> &str {
        self.name
    }

    fn generate(&self, seed: i64, pos: ChunkPos) -> Result<Chunk, BoxError> {
        let perlin = Perlin::new(Self::noise_seed(seed));
        let origin = pos.block_origin(0);
        let mut chunk = Chunk::new();

        for z in 0..SECTION_SIZE as u8 {
            for x in 0..SECTION_SIZE as u8 {
                let height = self.height_with(&perlin, origin.x + x as i64, origin.z + z as i64);
                let beach = height <= Self::SEA_LEVEL + 1;

                for y in 0..=height.max(Self::SEA_LEVEL) {
                    let block = if y == 0 {
                        block::BEDROCK
                    } else if y > height {
                        block::WATER
                    } else if beach && y > height - Self::DIRT_DEPTH {
                        block::SAND
                    } else if y == height {
                        block::GRASS_BLOCK
                    } else if y > height - Self::DIRT_DEPTH {
                        block::DIRT
                    } else {
                        block::STONE
                    };
                    chunk.set_block(LocalBlockPos { x, y, z }, block);
                }
            }
        }
        Ok(chunk)
    }
}

/// The generator a level type uses when the creation spec names none.
pub fn default_provider(level_type: LevelType) -> Arc<dyn ChunkGenerator> {
    match level_type {
        LevelType::Flat => Arc::new(FlatGenerator),
        LevelType::Amplified => Arc::new(TerrainGenerator::amplified()),
        LevelType::Default | LevelType::LargeBiomes => Arc::new(TerrainGenerator::new()),
    }
}

/// Look up a built-in generator by its persisted name.
pub fn provider_by_name(name: &str) -> Option<Arc<dyn ChunkGenerator>> {
    match name {
        FlatGenerator::NAME => Some(Arc::new(FlatGenerator)),
        TerrainGenerator::NAME => Some(Arc::new(TerrainGenerator::new())),
        TerrainGenerator::AMPLIFIED_NAME => Some(Arc::new(TerrainGenerator::amplified())),
        _ => None,
    }
}
