use std::fmt;

/// Number of chunks along each axis of a region file.
pub const REGION_SIZE: i32 = 32;

/// Absolute block position in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl BlockPos {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// The chunk this block belongs to.
    pub const fn chunk(&self) -> ChunkPos {
        ChunkPos {
            x: (self.x >> 4) as i32,
            z: (self.z >> 4) as i32,
        }
    }

    /// Position within the chunk (0..16 on x/z, y unchanged).
    pub const fn local(&self) -> LocalBlockPos {
        LocalBlockPos {
            x: (self.x & 0xF) as u8,
            y: self.y,
            z: (self.z & 0xF) as u8,
        }
    }
}

/// Chunk column position (each chunk is 16x16 blocks horizontally).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub const fn block_origin(&self, y: i64) -> BlockPos {
        BlockPos::new((self.x as i64) << 4, y, (self.z as i64) << 4)
    }

    /// The region file holding this chunk.
    pub const fn region(&self) -> (i32, i32) {
        (self.x.div_euclid(REGION_SIZE), self.z.div_euclid(REGION_SIZE))
    }

    /// Offset of this chunk inside its region file (0..32 each axis).
    pub const fn region_local(&self) -> (usize, usize) {
        (
            self.x.rem_euclid(REGION_SIZE) as usize,
            self.z.rem_euclid(REGION_SIZE) as usize,
        )
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Block position local to a chunk (x, z in 0..16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalBlockPos {
    pub x: u8,
    pub y: i64,
    pub z: u8,
}

impl LocalBlockPos {
    pub const fn section_index(&self) -> i32 {
        (self.y >> 4) as i32
    }

    pub const fn section_local_y(&self) -> u8 {
        (self.y.rem_euclid(16)) as u8
    }
}

/// A precise location in the world, as used by entities.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The block containing this position (floors each axis).
    pub fn block(&self) -> BlockPos {
        BlockPos::new(
            self.x.floor() as i64,
            self.y.floor() as i64,
            self.z.floor() as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_blocks_map_to_negative_chunks() {
        let pos = BlockPos::new(-1, 70, -17);
        assert_eq!(pos.chunk(), ChunkPos::new(-1, -2));
        let local = pos.local();
        assert_eq!((local.x, local.z), (15, 15));
    }

    #[test]
    fn chunk_origin_is_sixteen_blocks_per_chunk() {
        assert_eq!(ChunkPos::new(2, -3).block_origin(0), BlockPos::new(32, 0, -48));
        assert_eq!(ChunkPos::new(2, -3).block_origin(0).chunk(), ChunkPos::new(2, -3));
    }

    #[test]
    fn region_coordinates_floor() {
        assert_eq!(ChunkPos::new(31, 32).region(), (0, 1));
        assert_eq!(ChunkPos::new(-1, -33).region(), (-1, -2));
        assert_eq!(ChunkPos::new(-1, -33).region_local(), (31, 31));
    }

    #[test]
    fn position_floors_to_block() {
        assert_eq!(Position::new(-0.5, 64.9, 15.99).block(), BlockPos::new(-1, 64, 15));
    }

    #[test]
    fn section_indices() {
        let local = LocalBlockPos { x: 0, y: -1, z: 0 };
        assert_eq!(local.section_index(), -1);
        assert_eq!(local.section_local_y(), 15);
    }
}
