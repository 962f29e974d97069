use super::block::BlockId;
use super::position::LocalBlockPos;
use std::collections::HashMap;

/// Number of blocks along each axis of a chunk section.
pub const SECTION_SIZE: usize = 16;
/// Total block count in one section.
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;

/// A 16x16x16 cube of blocks.
///
/// Stored as a flat array in YZX order (x varies fastest), which is also the
/// order Anvil sections use, so persistence needs no remapping. A section
/// that is entirely air is never kept inside a `Chunk`.
#[derive(Clone, PartialEq, Eq)]
pub struct ChunkSection {
    blocks: Box<[BlockId; SECTION_VOLUME]>,
}

impl ChunkSection {
    pub fn new_filled(block: BlockId) -> Self {
        Self {
            blocks: Box::new([block; SECTION_VOLUME]),
        }
    }

    pub fn new_empty() -> Self {
        Self::new_filled(BlockId::AIR)
    }

    /// Build a section from a full YZX block array.
    pub fn from_blocks(blocks: Box<[BlockId; SECTION_VOLUME]>) -> Self {
        Self { blocks }
    }

    #[inline]
    pub const fn index(x: u8, y: u8, z: u8) -> usize {
        (y as usize) * SECTION_SIZE * SECTION_SIZE + (z as usize) * SECTION_SIZE + (x as usize)
    }

    #[inline]
    pub fn get(&self, x: u8, y: u8, z: u8) -> BlockId {
        self.blocks[Self::index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: u8, y: u8, z: u8, block: BlockId) {
        self.blocks[Self::index(x, y, z)] = block;
    }

    pub fn blocks(&self) -> &[BlockId; SECTION_VOLUME] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.is_air())
    }
}

impl std::fmt::Debug for ChunkSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let solid = self.blocks.iter().filter(|b| !b.is_air()).count();
        f.debug_struct("ChunkSection").field("solid", &solid).finish()
    }
}

/// A column of chunk sections, keyed by section index (y >> 4).
///
/// Only non-empty sections are stored (sparse).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chunk {
    sections: HashMap<i32, ChunkSection>,
}

impl Chunk {
    pub fn new() -> Self {
        Self {
            sections: HashMap::new(),
        }
    }

    pub fn get_block(&self, pos: LocalBlockPos) -> BlockId {
        let section_idx = pos.section_index();
        match self.sections.get(&section_idx) {
            Some(section) => section.get(pos.x, pos.section_local_y(), pos.z),
            None => BlockId::AIR,
        }
    }

    pub fn set_block(&mut self, pos: LocalBlockPos, block: BlockId) {
        let section_idx = pos.section_index();

        if block.is_air() {
            if let Some(section) = self.sections.get_mut(&section_idx) {
                section.set(pos.x, pos.section_local_y(), pos.z, block);
                if section.is_empty() {
                    self.sections.remove(&section_idx);
                }
            }
        } else {
            let section = self
                .sections
                .entry(section_idx)
                .or_insert_with(ChunkSection::new_empty);
            section.set(pos.x, pos.section_local_y(), pos.z, block);
        }
    }

    /// Install a whole section. All-air sections are dropped.
    pub fn insert_section(&mut self, section_idx: i32, section: ChunkSection) {
        if section.is_empty() {
            self.sections.remove(&section_idx);
        } else {
            self.sections.insert(section_idx, section);
        }
    }

    pub fn sections(&self) -> impl Iterator<Item = (&i32, &ChunkSection)> {
        self.sections.iter()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Y of the topmost non-air block in the column at local (x, z), if any.
    pub fn highest_block_y(&self, x: u8, z: u8) -> Option<i64> {
        let mut indices: Vec<i32> = self.sections.keys().copied().collect();
        indices.sort_unstable_by(|a, b| b.cmp(a));

        for idx in indices {
            let section = &self.sections[&idx];
            for y in (0..SECTION_SIZE as u8).rev() {
                if !section.get(x, y, z).is_air() {
                    return Some(idx as i64 * SECTION_SIZE as i64 + y as i64);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: u8, y: i64, z: u8) -> LocalBlockPos {
        LocalBlockPos { x, y, z }
    }

    #[test]
    fn clearing_last_block_frees_section() {
        let mut chunk = Chunk::new();
        chunk.set_block(at(3, 20, 4), BlockId(1));
        assert_eq!(chunk.section_count(), 1);
        chunk.set_block(at(3, 20, 4), BlockId::AIR);
        assert_eq!(chunk.section_count(), 0);
    }

    #[test]
    fn highest_block_scans_top_down() {
        let mut chunk = Chunk::new();
        chunk.set_block(at(1, 0, 1), BlockId(1));
        chunk.set_block(at(1, 70, 1), BlockId(2));
        chunk.set_block(at(2, 5, 1), BlockId(2));
        assert_eq!(chunk.highest_block_y(1, 1), Some(70));
        assert_eq!(chunk.highest_block_y(2, 1), Some(5));
        assert_eq!(chunk.highest_block_y(9, 9), None);
    }

    #[test]
    fn highest_block_below_zero() {
        let mut chunk = Chunk::new();
        chunk.set_block(at(0, -40, 0), BlockId(7));
        assert_eq!(chunk.highest_block_y(0, 0), Some(-40));
    }

    #[test]
    fn inserting_empty_section_is_a_no_op() {
        let mut chunk = Chunk::new();
        chunk.insert_section(2, ChunkSection::new_empty());
        assert_eq!(chunk.section_count(), 0);
        assert_eq!(chunk, Chunk::new());
    }
}
