use std::collections::BTreeMap;
use std::fmt;

use crate::error::ServerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameRuleValue {
    Bool(bool),
    Int(i32),
}

impl fmt::Display for GameRuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

/// The vanilla game rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GameRule {
    CommandBlockOutput,
    DoDaylightCycle,
    DoEntityDrops,
    DoFireTick,
    DoMobLoot,
    DoMobSpawning,
    DoTileDrops,
    DoWeatherCycle,
    KeepInventory,
    LogAdminCommands,
    MobGriefing,
    NaturalRegeneration,
    RandomTickSpeed,
    ReducedDebugInfo,
    SendCommandFeedback,
    ShowDeathMessages,
    SpawnRadius,
    SpectatorsGenerateChunks,
}

impl GameRule {
    pub const ALL: [GameRule; 18] = [
        GameRule::CommandBlockOutput,
        GameRule::DoDaylightCycle,
        GameRule::DoEntityDrops,
        GameRule::DoFireTick,
        GameRule::DoMobLoot,
        GameRule::DoMobSpawning,
        GameRule::DoTileDrops,
        GameRule::DoWeatherCycle,
        GameRule::KeepInventory,
        GameRule::LogAdminCommands,
        GameRule::MobGriefing,
        GameRule::NaturalRegeneration,
        GameRule::RandomTickSpeed,
        GameRule::ReducedDebugInfo,
        GameRule::SendCommandFeedback,
        GameRule::ShowDeathMessages,
        GameRule::SpawnRadius,
        GameRule::SpectatorsGenerateChunks,
    ];

    /// Name as used in commands and level.dat.
    pub const fn name(self) -> &'static str {
        match self {
            Self::CommandBlockOutput => "commandBlockOutput",
            Self::DoDaylightCycle => "doDaylightCycle",
            Self::DoEntityDrops => "doEntityDrops",
            Self::DoFireTick => "doFireTick",
            Self::DoMobLoot => "doMobLoot",
            Self::DoMobSpawning => "doMobSpawning",
            Self::DoTileDrops => "doTileDrops",
            Self::DoWeatherCycle => "doWeatherCycle",
            Self::KeepInventory => "keepInventory",
            Self::LogAdminCommands => "logAdminCommands",
            Self::MobGriefing => "mobGriefing",
            Self::NaturalRegeneration => "naturalRegeneration",
            Self::RandomTickSpeed => "randomTickSpeed",
            Self::ReducedDebugInfo => "reducedDebugInfo",
            Self::SendCommandFeedback => "sendCommandFeedback",
            Self::ShowDeathMessages => "showDeathMessages",
            Self::SpawnRadius => "spawnRadius",
            Self::SpectatorsGenerateChunks => "spectatorsGenerateChunks",
        }
    }

    pub const fn default_value(self) -> GameRuleValue {
        match self {
            Self::KeepInventory | Self::ReducedDebugInfo => GameRuleValue::Bool(false),
            Self::RandomTickSpeed => GameRuleValue::Int(3),
            Self::SpawnRadius => GameRuleValue::Int(10),
            _ => GameRuleValue::Bool(true),
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ServerError> {
        Self::ALL
            .into_iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| ServerError::invalid(format!("no game rule named '{name}'")))
    }

    /// Parse a textual value with this rule's type.
    pub fn parse_value(self, value: &str) -> Result<GameRuleValue, ServerError> {
        let invalid = || ServerError::invalid(format!("bad value '{}' for {}", value, self.name()));
        match self.default_value() {
            GameRuleValue::Bool(_) => value.parse().map(GameRuleValue::Bool).map_err(|_| invalid()),
            GameRuleValue::Int(_) => value.parse().map(GameRuleValue::Int).map_err(|_| invalid()),
        }
    }
}

/// Game rule values: vanilla defaults plus explicit overrides.
///
/// `new()` is `const`, so a rule map can live inside a static.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameRuleMap {
    overrides: BTreeMap<GameRule, GameRuleValue>,
}

impl GameRuleMap {
    pub const fn new() -> Self {
        Self {
            overrides: BTreeMap::new(),
        }
    }

    pub fn get(&self, rule: GameRule) -> GameRuleValue {
        self.overrides
            .get(&rule)
            .copied()
            .unwrap_or_else(|| rule.default_value())
    }

    /// Boolean value of `rule`; integer rules read as `value != 0`.
    pub fn get_bool(&self, rule: GameRule) -> bool {
        match self.get(rule) {
            GameRuleValue::Bool(b) => b,
            GameRuleValue::Int(i) => i != 0,
        }
    }

    /// Integer value of `rule`; boolean rules read as 0/1.
    pub fn get_int(&self, rule: GameRule) -> i32 {
        match self.get(rule) {
            GameRuleValue::Bool(b) => b as i32,
            GameRuleValue::Int(i) => i,
        }
    }

    /// Set a rule. The value must have the rule's type.
    pub fn set(&mut self, rule: GameRule, value: GameRuleValue) -> Result<(), ServerError> {
        let same_type = matches!(
            (rule.default_value(), value),
            (GameRuleValue::Bool(_), GameRuleValue::Bool(_)) | (GameRuleValue::Int(_), GameRuleValue::Int(_))
        );
        if !same_type {
            return Err(ServerError::invalid(format!(
                "{} does not take {:?}",
                rule.name(),
                value
            )));
        }
        if value == rule.default_value() {
            self.overrides.remove(&rule);
        } else {
            self.overrides.insert(rule, value);
        }
        Ok(())
    }

    /// Set a rule from its name and textual value.
    pub fn set_by_name(&mut self, name: &str, value: &str) -> Result<(), ServerError> {
        let rule = GameRule::from_name(name)?;
        let value = rule.parse_value(value)?;
        self.set(rule, value)
    }

    /// Every rule with its effective value, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (GameRule, GameRuleValue)> + '_ {
        GameRule::ALL.into_iter().map(|rule| (rule, self.get(rule)))
    }
}
