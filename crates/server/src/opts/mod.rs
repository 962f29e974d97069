//! World option records: the enums a world is configured with, the vanilla
//! game rule table, the creation spec and the immutable snapshots derived
//! from it.

pub mod create_spec;
pub mod game_rules;
pub mod records;

pub use create_spec::WorldCreateSpec;
pub use game_rules::{GameRule, GameRuleMap, GameRuleValue};
pub use records::{GenOpts, Weather, WorldBorder, WorldOpts};

use crate::error::ServerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Difficulty {
    Peaceful = 0,
    Easy = 1,
    Normal = 2,
    Hard = 3,
}

impl Difficulty {
    pub const fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Result<Self, ServerError> {
        match id {
            0 => Ok(Self::Peaceful),
            1 => Ok(Self::Easy),
            2 => Ok(Self::Normal),
            3 => Ok(Self::Hard),
            _ => Err(ServerError::invalid(format!("no difficulty with id = {id}"))),
        }
    }
}

/// Dimension of a world. Immutable once the world exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum Dimension {
    Nether = -1,
    Overworld = 0,
    End = 1,
}

impl Dimension {
    pub const fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Result<Self, ServerError> {
        match id {
            -1 => Ok(Self::Nether),
            0 => Ok(Self::Overworld),
            1 => Ok(Self::End),
            _ => Err(ServerError::invalid(format!("no dimension with id = {id}"))),
        }
    }

    /// Whether this dimension has a sky (day cycle, weather).
    pub const fn has_sky(self) -> bool {
        matches!(self, Self::Overworld)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GameMode {
    Survival = 0,
    Creative = 1,
    Adventure = 2,
    Spectator = 3,
}

impl GameMode {
    pub const fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: i32) -> Result<Self, ServerError> {
        match id {
            0 => Ok(Self::Survival),
            1 => Ok(Self::Creative),
            2 => Ok(Self::Adventure),
            3 => Ok(Self::Spectator),
            _ => Err(ServerError::invalid(format!("no game mode with id = {id}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelType {
    Default,
    Flat,
    LargeBiomes,
    Amplified,
}

impl LevelType {
    pub const ALL: [LevelType; 4] = [
        LevelType::Default,
        LevelType::Flat,
        LevelType::LargeBiomes,
        LevelType::Amplified,
    ];

    /// Name stored as `generatorName` in level.dat.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Flat => "flat",
            Self::LargeBiomes => "largeBiomes",
            Self::Amplified => "amplified",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ServerError> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ServerError::invalid(format!("no level type named '{name}'")))
    }
}
