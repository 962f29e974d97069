//! On-disk world layout:
//!
//! ```text
//! <worlds>/<name>/level.dat          world metadata (gzip NBT)
//! <worlds>/<name>/region/r.X.Z.mca   chunk data (Anvil)
//! ```

pub mod anvil;
pub mod level;

pub use anvil::{AnvilStore, MAX_Y, MIN_Y, is_storable};
pub use level::{LevelData, level_exists, read_level, write_level};
