use super::position::BlockPos;

/// Opaque block identifier. The engine stores these without interpreting them.
/// Game-specific layers assign meaning to specific IDs (e.g. 0 = air, 1 = stone).
///
/// The only semantic the engine enforces is that `BlockId::AIR` (0) is the
/// "empty" block: chunk sections filled entirely with AIR are deallocated and
/// height scans skip it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockId(pub u16);

impl BlockId {
    /// The universal "empty" block.
    pub const AIR: BlockId = BlockId(0);

    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub const fn is_air(self) -> bool {
        self.0 == Self::AIR.0
    }
}

/// A block as seen by a query: where it is and what occupies it.
///
/// This is a value snapshot; later writes to the world do not change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    pub pos: BlockPos,
    pub id: BlockId,
}

impl Block {
    pub const fn new(pos: BlockPos, id: BlockId) -> Self {
        Self { pos, id }
    }

    pub const fn is_air(&self) -> bool {
        self.id.is_air()
    }
}
