//! The world contract and its one implementation.
//!
//! A [`TridentWorld`] is shared as `Arc<TridentWorld>` between the tick
//! tasks, the console and whatever else holds it. Every query is safe to call
//! from any thread: chunks come from the engine's [`ChunkTable`], entities
//! from a snapshot-on-read [`EntityTable`], and time from an atomic clock.

pub mod manager;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use trident_engine::world::ChunkTable;
use trident_engine::world::LoadedChunk;
use trident_engine::world::block::{Block, BlockId};
use trident_engine::world::clock::{TICKS_PER_DAY, WorldClock};
use trident_engine::world::entity::{Entity, EntityId, EntityKind, EntityTable};
use trident_engine::world::error::WorldError;
use trident_engine::world::position::{BlockPos, ChunkPos, Position};
use trident_engine::world::source::ChunkGenerator;
use uuid::Uuid;

use crate::error::ServerError;
use crate::event_bus::{EventBus, Ignorable, WeatherEvent};
use crate::generator;
use crate::opts::{
    Difficulty, Dimension, GameMode, GameRule, GameRuleMap, GenOpts, LevelType, Weather,
    WorldBorder, WorldCreateSpec, WorldOpts,
};
use crate::persistence::{self, AnvilStore, LevelData};

pub use manager::WorldManager;

/// A named, persistent, concurrently readable voxel world.
///
/// Chunk coordinates are in chunk-grid units (16 blocks per chunk on x and
/// z); block coordinates are in blocks.
pub trait World: Send + Sync {
    /// Stable for the world's lifetime.
    fn name(&self) -> &str;

    /// Time of day in `[0, 23999]`.
    fn time(&self) -> u32;

    fn players(&self) -> Vec<Entity>;

    /// Snapshot of every entity, players included.
    fn entities(&self) -> std::vec::IntoIter<Entity>;

    fn world_options(&self) -> &WorldOpts;

    /// Current weather. Unlike the option records this changes over time.
    fn weather(&self) -> Weather;

    fn generator_options(&self) -> &GenOpts;

    fn border(&self) -> &WorldBorder;

    fn dimension(&self) -> Dimension;

    /// The chunk at `(x, z)`, loaded from disk or generated on first access.
    /// Repeated calls return the same chunk until it is evicted.
    fn chunk_at(&self, x: i32, z: i32) -> Result<Arc<LoadedChunk>, WorldError>;

    /// Like [`World::chunk_at`], but with `generate == false` a chunk that is
    /// neither loaded nor stored comes back as `None` and nothing is loaded.
    fn chunk_at_or_none(
        &self,
        x: i32,
        z: i32,
        generate: bool,
    ) -> Result<Option<Arc<LoadedChunk>>, WorldError>;

    fn loaded_chunks(&self) -> Vec<Arc<LoadedChunk>>;

    /// Y of the topmost non-air block in block column `(x, z)`; 0 if the
    /// column is empty. Materializes the chunk.
    fn highest_y(&self, x: i64, z: i64) -> Result<i64, WorldError>;

    fn block_at(&self, x: i64, y: i64, z: i64) -> Result<Block, WorldError>;

    /// The block containing `pos`.
    fn block_at_pos(&self, pos: Position) -> Result<Block, WorldError> {
        let b = pos.block();
        self.block_at(b.x, b.y, b.z)
    }

    fn directory(&self) -> &Path;

    /// Write every dirty chunk and the level metadata. Returns the number of
    /// chunks written.
    fn save(&self) -> Result<usize, ServerError>;
}

pub struct TridentWorld {
    name: String,
    directory: PathBuf,
    dimension: Dimension,
    world_opts: WorldOpts,
    gen_opts: GenOpts,
    border: WorldBorder,
    spawn: Position,
    clock: WorldClock,
    weather: RwLock<Weather>,
    chunks: ChunkTable,
    entities: EntityTable,
    events: Arc<EventBus>,
    /// Serializes level.dat writes.
    level_lock: Mutex<()>,
}

/// UUID the vanilla server assigns an offline-mode player.
fn offline_uuid(name: &str) -> Uuid {
    Uuid::new_v3(&Uuid::NAMESPACE_URL, format!("OfflinePlayer:{}", name).as_bytes())
}

impl TridentWorld {
    /// Build a new world from `spec`. Reads the spec once; nothing is kept
    /// from it but the option records derived here.
    pub(crate) fn create(
        name: &str,
        directory: PathBuf,
        spec: &WorldCreateSpec,
        events: Arc<EventBus>,
    ) -> Result<Self, ServerError> {
        let generator = match spec.provider() {
            Some(provider) => Arc::clone(provider),
            None => generator::default_provider(spec.level_type()),
        };

        let world_opts = WorldOpts {
            difficulty: spec.difficulty(),
            difficulty_locked: spec.difficulty_locked(),
            game_mode: spec.game_mode(),
            game_rules: spec.game_rules().clone(),
            allow_features: spec.allow_features(),
        };
        let gen_opts = GenOpts {
            seed: spec.seed(),
            level_type: spec.level_type(),
            provider: generator.name().to_string(),
            option_string: spec.option_string().to_string(),
        };

        let chunks = ChunkTable::new(
            spec.seed(),
            Arc::new(AnvilStore::new(&directory)),
            Arc::clone(&generator),
        );
        let spawn = match spec.spawn() {
            Some(spawn) => spawn,
            None => Position::new(0.0, (chunks.highest_y(0, 0)? + 1) as f64, 0.0),
        };

        tracing::info!(
            "Created world '{}' ({:?}, generator '{}', seed {})",
            name,
            spec.dimension(),
            gen_opts.provider,
            gen_opts.seed
        );

        Ok(Self {
            name: name.to_string(),
            directory,
            dimension: spec.dimension(),
            world_opts,
            gen_opts,
            border: WorldBorder::default(),
            spawn,
            clock: WorldClock::default(),
            weather: RwLock::new(Weather::clear()),
            chunks,
            entities: EntityTable::new(),
            events,
            level_lock: Mutex::new(()),
        })
    }

    /// Reopen a world from its `level.dat` and region files.
    pub(crate) fn open(
        name: &str,
        directory: PathBuf,
        events: Arc<EventBus>,
    ) -> Result<Self, ServerError> {
        let level = persistence::read_level(&directory).map_err(ServerError::Level)?;

        let level_type = LevelType::from_name(&level.generator_name)?;
        let generator: Arc<dyn ChunkGenerator> =
            match generator::provider_by_name(&level.generator_provider) {
                Some(generator) => generator,
                None => {
                    tracing::warn!(
                        "World '{}' was generated by unknown provider '{}'; using the {} default",
                        name,
                        level.generator_provider,
                        level_type.name()
                    );
                    generator::default_provider(level_type)
                }
            };

        let mut game_rules = GameRuleMap::new();
        for (rule, value) in &level.game_rules {
            if let Err(e) = game_rules.set_by_name(rule, value) {
                tracing::warn!("World '{}': ignoring game rule: {}", name, e);
            }
        }

        let world_opts = WorldOpts {
            difficulty: Difficulty::from_id(level.difficulty as u8)?,
            difficulty_locked: level.difficulty_locked != 0,
            game_mode: GameMode::from_id(level.game_type)?,
            game_rules,
            allow_features: level.map_features != 0,
        };
        let gen_opts = GenOpts {
            seed: level.random_seed,
            level_type,
            provider: generator.name().to_string(),
            option_string: level.generator_options.clone(),
        };
        let weather = Weather {
            raining: level.raining != 0,
            thundering: level.thundering != 0,
            rain_time: level.rain_time,
            thunder_time: level.thunder_time,
        };
        let day_time = level.day_time.rem_euclid(TICKS_PER_DAY as i64) as u32;

        let chunks = ChunkTable::new(
            level.random_seed,
            Arc::new(AnvilStore::new(&directory)),
            generator,
        );

        tracing::info!(
            "Opened world '{}' from {} (time {}, generator '{}')",
            name,
            directory.display(),
            day_time,
            gen_opts.provider
        );

        Ok(Self {
            name: name.to_string(),
            directory,
            dimension: Dimension::from_id(level.dimension)?,
            world_opts,
            gen_opts,
            border: WorldBorder {
                center_x: level.border_center_x,
                center_z: level.border_center_z,
                size: level.border_size,
            },
            spawn: Position::new(level.spawn_x as f64, level.spawn_y as f64, level.spawn_z as f64),
            clock: WorldClock::new(day_time, level.time),
            weather: RwLock::new(weather),
            chunks,
            entities: EntityTable::new(),
            events,
            level_lock: Mutex::new(()),
        })
    }

    fn level_data(&self) -> LevelData {
        let weather = self.weather();
        let spawn = self.spawn.block();
        LevelData {
            level_name: self.name.clone(),
            random_seed: self.gen_opts.seed,
            day_time: self.clock.time() as i64,
            time: self.clock.full_time(),
            difficulty: self.world_opts.difficulty.id() as i8,
            difficulty_locked: self.world_opts.difficulty_locked as i8,
            game_type: self.world_opts.game_mode.id() as i32,
            dimension: self.dimension.id(),
            generator_name: self.gen_opts.level_type.name().to_string(),
            generator_options: self.gen_opts.option_string.clone(),
            generator_provider: self.gen_opts.provider.clone(),
            map_features: self.world_opts.allow_features as i8,
            spawn_x: spawn.x as i32,
            spawn_y: spawn.y as i32,
            spawn_z: spawn.z as i32,
            raining: weather.raining as i8,
            rain_time: weather.rain_time,
            thundering: weather.thundering as i8,
            thunder_time: weather.thunder_time,
            border_center_x: self.border.center_x,
            border_center_z: self.border.center_z,
            border_size: self.border.size,
            game_rules: self
                .world_opts
                .game_rules
                .iter()
                .filter(|(rule, value)| *value != rule.default_value())
                .map(|(rule, value)| (rule.name().to_string(), value.to_string()))
                .collect(),
        }
    }

    pub(crate) fn write_level(&self) -> Result<(), ServerError> {
        let _guard = self.level_lock.lock().expect("level lock poisoned");
        persistence::write_level(&self.directory, &self.level_data()).map_err(ServerError::Level)
    }

    // ── Time & weather ──────────────────────────────────────────────────

    /// Total ticks this world has run, never wrapping.
    pub fn full_time(&self) -> i64 {
        self.clock.full_time()
    }

    pub fn set_time(&self, time: u32) -> Result<(), ServerError> {
        Ok(self.clock.set_time(time)?)
    }

    /// Advance the world by `ticks`. Time of day stands still while the
    /// `doDaylightCycle` rule is off. Returns the time of day.
    pub fn tick(&self, ticks: u32) -> u32 {
        if self.world_opts.game_rules.get_bool(GameRule::DoDaylightCycle) {
            self.clock.advance(ticks)
        } else {
            self.clock.advance_frozen(ticks);
            self.clock.time()
        }
    }

    /// Replace the weather. A change of rain or thunder is announced as a
    /// [`WeatherEvent`] first; if a listener ignores it nothing changes and
    /// this returns `false`. Timer-only updates are applied silently.
    pub fn set_weather(&self, weather: Weather) -> bool {
        if !self.announce_weather(&self.weather(), weather) {
            return false;
        }
        *self.weather.write().expect("weather lock poisoned") = weather;
        true
    }

    /// Like [`set_weather`](Self::set_weather), but only while the weather is
    /// still `expected`. If something else changed it first, nothing is
    /// written and the weather now in place comes back as the error.
    pub fn replace_weather(&self, expected: Weather, weather: Weather) -> Result<bool, Weather> {
        let current = self.weather();
        if current != expected {
            return Err(current);
        }
        if !self.announce_weather(&expected, weather) {
            return Ok(false);
        }
        let mut slot = self.weather.write().expect("weather lock poisoned");
        if *slot != expected {
            return Err(*slot);
        }
        *slot = weather;
        Ok(true)
    }

    /// Dispatch a [`WeatherEvent`] if `to` changes the sky. `false` if a
    /// listener left it ignored.
    fn announce_weather(&self, from: &Weather, to: Weather) -> bool {
        if from.same_sky(&to) {
            return true;
        }
        let event = self.events.dispatch(WeatherEvent::new(&self.name, to));
        if event.is_ignored() {
            tracing::debug!("Weather change in '{}' ignored by a listener", self.name);
            return false;
        }
        true
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    // ── Entities ────────────────────────────────────────────────────────

    /// Add a player. UUIDs follow the offline-mode scheme, so a name always
    /// maps to the same UUID.
    pub fn spawn_player(&self, name: &str, position: Position) -> EntityId {
        let id = self.entities.spawn(
            offline_uuid(name),
            EntityKind::Player {
                name: name.to_string(),
            },
            position,
        );
        tracing::info!("Player '{}' joined '{}'", name, self.name);
        id
    }

    pub fn spawn_entity(&self, type_name: &str, position: Position) -> EntityId {
        self.entities.spawn(
            Uuid::new_v4(),
            EntityKind::Mob {
                type_name: type_name.to_string(),
            },
            position,
        )
    }

    pub fn despawn(&self, id: EntityId) -> Option<Entity> {
        self.entities.despawn(id)
    }

    /// Returns `false` if the entity is gone.
    pub fn move_entity(&self, id: EntityId, position: Position) -> bool {
        self.entities.move_to(id, position)
    }

    pub fn player(&self, name: &str) -> Option<Entity> {
        self.entities.find_player(name)
    }

    // ── Blocks & chunks ─────────────────────────────────────────────────

    /// Returns the block that was there before. Blocks the region format
    /// cannot hold are refused, so a later save never drops them.
    pub fn set_block(&self, x: i64, y: i64, z: i64, block: BlockId) -> Result<BlockId, WorldError> {
        if !(persistence::MIN_Y..=persistence::MAX_Y).contains(&y) {
            return Err(WorldError::invalid(format!(
                "y {y} is outside {}..={}",
                persistence::MIN_Y,
                persistence::MAX_Y
            )));
        }
        if !persistence::is_storable(block) {
            return Err(WorldError::invalid(format!("unknown block state {}", block.0)));
        }
        self.chunks.set_block(BlockPos::new(x, y, z), block)
    }

    /// The engine table, for preloading and eviction.
    pub fn chunk_table(&self) -> &ChunkTable {
        &self.chunks
    }

    pub fn spawn(&self) -> Position {
        self.spawn
    }

    /// The chunk containing the spawn point.
    pub fn spawn_chunk(&self) -> ChunkPos {
        self.spawn.block().chunk()
    }
}

impl World for TridentWorld {
    fn name(&self) -> &str {
        &self.name
    }

    fn time(&self) -> u32 {
        self.clock.time()
    }

    fn players(&self) -> Vec<Entity> {
        self.entities.players()
    }

    fn entities(&self) -> std::vec::IntoIter<Entity> {
        self.entities.snapshot().into_iter()
    }

    fn world_options(&self) -> &WorldOpts {
        &self.world_opts
    }

    fn weather(&self) -> Weather {
        *self.weather.read().expect("weather lock poisoned")
    }

    fn generator_options(&self) -> &GenOpts {
        &self.gen_opts
    }

    fn border(&self) -> &WorldBorder {
        &self.border
    }

    fn dimension(&self) -> Dimension {
        self.dimension
    }

    fn chunk_at(&self, x: i32, z: i32) -> Result<Arc<LoadedChunk>, WorldError> {
        self.chunks.chunk(ChunkPos::new(x, z))
    }

    fn chunk_at_or_none(
        &self,
        x: i32,
        z: i32,
        generate: bool,
    ) -> Result<Option<Arc<LoadedChunk>>, WorldError> {
        self.chunks.chunk_if(ChunkPos::new(x, z), generate)
    }

    fn loaded_chunks(&self) -> Vec<Arc<LoadedChunk>> {
        self.chunks.loaded_chunks()
    }

    fn highest_y(&self, x: i64, z: i64) -> Result<i64, WorldError> {
        self.chunks.highest_y(x, z)
    }

    fn block_at(&self, x: i64, y: i64, z: i64) -> Result<Block, WorldError> {
        let pos = BlockPos::new(x, y, z);
        Ok(Block::new(pos, self.chunks.get_block(pos)?))
    }

    fn directory(&self) -> &Path {
        &self.directory
    }

    fn save(&self) -> Result<usize, ServerError> {
        let written = self.chunks.save()?;
        self.write_level()?;
        tracing::info!("World '{}' saved ({} chunks)", self.name, written);
        Ok(written)
    }
}

impl std::fmt::Debug for TridentWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TridentWorld")
            .field("name", &self.name)
            .field("directory", &self.directory)
            .field("dimension", &self.dimension)
            .field("loaded_chunks", &self.chunks.chunk_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_uuid_is_stable_per_name() {
        assert_eq!(offline_uuid("Notch"), offline_uuid("Notch"));
        assert_ne!(offline_uuid("Notch"), offline_uuid("jeb_"));
        assert_eq!(offline_uuid("Notch").get_version_num(), 3);
    }
}
