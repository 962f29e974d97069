//! Snapshots a world hands out by reference. Built once from the creation
//! spec (or level.dat); callers cannot change world state through them.

use super::{Difficulty, GameMode, GameRuleMap, LevelType};

#[derive(Debug, Clone, PartialEq)]
pub struct WorldOpts {
    pub difficulty: Difficulty,
    pub difficulty_locked: bool,
    pub game_mode: GameMode,
    pub game_rules: GameRuleMap,
    pub allow_features: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenOpts {
    pub seed: i64,
    pub level_type: LevelType,
    /// Name of the chunk generator in use.
    pub provider: String,
    pub option_string: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBorder {
    pub center_x: f64,
    pub center_z: f64,
    /// Side length of the square border, in blocks.
    pub size: f64,
}

impl WorldBorder {
    pub const VANILLA_SIZE: f64 = 60_000_000.0;

    pub fn contains(&self, x: f64, z: f64) -> bool {
        let half = self.size / 2.0;
        (x - self.center_x).abs() <= half && (z - self.center_z).abs() <= half
    }
}

impl Default for WorldBorder {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_z: 0.0,
            size: Self::VANILLA_SIZE,
        }
    }
}

/// Live weather state. Unlike the other records this changes over time;
/// `World::weather` returns a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Weather {
    pub raining: bool,
    pub thundering: bool,
    /// Ticks until `raining` toggles. 0 means "not yet scheduled".
    pub rain_time: i32,
    /// Ticks until `thundering` toggles. 0 means "not yet scheduled".
    pub thunder_time: i32,
}

impl Weather {
    pub const fn clear() -> Self {
        Self {
            raining: false,
            thundering: false,
            rain_time: 0,
            thunder_time: 0,
        }
    }

    pub const fn rain() -> Self {
        Self {
            raining: true,
            ..Self::clear()
        }
    }

    pub const fn thunder() -> Self {
        Self {
            raining: true,
            thundering: true,
            ..Self::clear()
        }
    }

    /// Same sky, ignoring the timers.
    pub fn same_sky(&self, other: &Weather) -> bool {
        self.raining == other.raining && self.thundering == other.thundering
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_contains_is_square() {
        let border = WorldBorder {
            center_x: 100.0,
            center_z: -100.0,
            size: 50.0,
        };
        assert!(border.contains(125.0, -75.0));
        assert!(!border.contains(125.1, -100.0));
        assert!(WorldBorder::default().contains(29_999_999.0, 0.0));
    }
}
