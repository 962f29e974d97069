use std::fmt;
use std::sync::Arc;

use trident_engine::world::position::Position;
use trident_engine::world::source::ChunkGenerator;

use super::{Difficulty, Dimension, GameMode, GameRuleMap, LevelType};

/// Parameters for creating a world, collected before the world exists.
///
/// Not for concurrent mutation: configure it on one thread, then lend it to
/// `WorldManager::create_world`, which reads it exactly once and keeps only
/// the option records derived from it. The shared default instance is a
/// `&'static` value and cannot be mutated at all. The type is deliberately not
/// `Clone`, so `is_default()` can only be true for the shared instance.
pub struct WorldCreateSpec {
    difficulty: Difficulty,
    dimension: Dimension,
    game_mode: GameMode,
    game_rules: GameRuleMap,
    difficulty_locked: bool,
    spawn: Option<Position>,
    provider: Option<Arc<dyn ChunkGenerator>>,
    seed: i64,
    level_type: LevelType,
    allow_features: bool,
    option_string: String,
    def: bool,
}

static DEFAULT: WorldCreateSpec = WorldCreateSpec::vanilla(true);

impl WorldCreateSpec {
    const fn vanilla(def: bool) -> Self {
        Self {
            difficulty: Difficulty::Normal,
            dimension: Dimension::Overworld,
            game_mode: GameMode::Survival,
            game_rules: GameRuleMap::new(),
            difficulty_locked: false,
            spawn: None,
            provider: None,
            seed: 0,
            level_type: LevelType::Default,
            allow_features: true,
            option_string: String::new(),
            def,
        }
    }

    /// The process-wide all-vanilla spec.
    pub fn default_options() -> &'static WorldCreateSpec {
        &DEFAULT
    }

    /// A fresh spec with vanilla defaults, ready to configure.
    pub fn custom() -> Self {
        Self::vanilla(false)
    }

    pub fn is_default(&self) -> bool {
        self.def
    }

    // ── Builder ─────────────────────────────────────────────────────────

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_game_mode(mut self, game_mode: GameMode) -> Self {
        self.game_mode = game_mode;
        self
    }

    pub fn with_game_rules(mut self, game_rules: GameRuleMap) -> Self {
        self.game_rules = game_rules;
        self
    }

    pub fn with_difficulty_locked(mut self, locked: bool) -> Self {
        self.difficulty_locked = locked;
        self
    }

    pub fn with_spawn(mut self, spawn: Position) -> Self {
        self.spawn = Some(spawn);
        self
    }

    /// Use `provider` instead of the level type's default generator.
    pub fn with_provider(mut self, provider: Arc<dyn ChunkGenerator>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_level_type(mut self, level_type: LevelType) -> Self {
        self.level_type = level_type;
        self
    }

    pub fn with_allow_features(mut self, allow: bool) -> Self {
        self.allow_features = allow;
        self
    }

    pub fn with_option_string(mut self, options: impl Into<String>) -> Self {
        self.option_string = options.into();
        self
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn game_mode(&self) -> GameMode {
        self.game_mode
    }

    pub fn game_rules(&self) -> &GameRuleMap {
        &self.game_rules
    }

    pub fn difficulty_locked(&self) -> bool {
        self.difficulty_locked
    }

    pub fn spawn(&self) -> Option<Position> {
        self.spawn
    }

    pub fn provider(&self) -> Option<&Arc<dyn ChunkGenerator>> {
        self.provider.as_ref()
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn level_type(&self) -> LevelType {
        self.level_type
    }

    pub fn allow_features(&self) -> bool {
        self.allow_features
    }

    pub fn option_string(&self) -> &str {
        &self.option_string
    }
}

impl fmt::Debug for WorldCreateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldCreateSpec")
            .field("difficulty", &self.difficulty)
            .field("dimension", &self.dimension)
            .field("game_mode", &self.game_mode)
            .field("game_rules", &self.game_rules)
            .field("difficulty_locked", &self.difficulty_locked)
            .field("spawn", &self.spawn)
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("seed", &self.seed)
            .field("level_type", &self.level_type)
            .field("allow_features", &self.allow_features)
            .field("option_string", &self.option_string)
            .field("default", &self.def)
            .finish()
    }
}
