//! Minecraft world server on the trident engine: named worlds with Anvil
//! persistence, world creation options, events, console commands and the
//! ambient simulation that keeps worlds ticking.

pub mod block;
pub mod commands;
pub mod error;
pub mod event_bus;
pub mod generator;
pub mod horse_color;
pub mod opts;
pub mod persistence;
pub mod simulation;
pub mod world;

pub use error::ServerError;
pub use world::{TridentWorld, World, WorldManager};
