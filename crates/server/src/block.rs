//! Minecraft block state ids used by the generators and tests.
//!
//! BlockId values are MC block state IDs (from azalea-block), so the region
//! codec can name them without a mapping layer.

use trident_engine::world::block::BlockId;

// -- MC block state IDs (from azalea-block for MC 1.21.11) --

pub const STONE: BlockId = BlockId(1);
pub const GRASS_BLOCK: BlockId = BlockId(9); // snowy=false
pub const DIRT: BlockId = BlockId(10);
pub const BEDROCK: BlockId = BlockId(85);
pub const WATER: BlockId = BlockId(86); // level=0
pub const SAND: BlockId = BlockId(118);
pub const OAK_LOG: BlockId = BlockId(137); // axis=y
