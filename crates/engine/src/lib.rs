//! Game-agnostic voxel world substrate.
//!
//! The engine owns chunk storage and the rules for bringing chunks into
//! memory; it knows nothing about block semantics beyond `BlockId::AIR`.
//! Game layers plug in a [`world::source::ChunkSource`] for persistence and a
//! [`world::source::ChunkGenerator`] for procedural content.

pub mod world;
