//! `level.dat`: per-world metadata as gzip-compressed NBT.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

pub const LEVEL_FILE: &str = "level.dat";

#[derive(Serialize, Deserialize, Debug)]
struct LevelRoot {
    #[serde(rename = "Data")]
    data: LevelData,
}

/// The `Data` compound of `level.dat`. Field names follow vanilla where
/// vanilla has an equivalent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LevelData {
    #[serde(rename = "LevelName")]
    pub level_name: String,
    #[serde(rename = "RandomSeed")]
    pub random_seed: i64,
    #[serde(rename = "DayTime")]
    pub day_time: i64,
    #[serde(rename = "Time")]
    pub time: i64,
    #[serde(rename = "Difficulty")]
    pub difficulty: i8,
    #[serde(rename = "DifficultyLocked")]
    pub difficulty_locked: i8,
    #[serde(rename = "GameType")]
    pub game_type: i32,
    #[serde(rename = "Dimension")]
    pub dimension: i32,
    #[serde(rename = "generatorName")]
    pub generator_name: String,
    #[serde(rename = "generatorOptions")]
    pub generator_options: String,
    /// Name of the chunk generator, so a reload picks the same one.
    #[serde(rename = "generatorProvider")]
    pub generator_provider: String,
    #[serde(rename = "MapFeatures")]
    pub map_features: i8,
    #[serde(rename = "SpawnX")]
    pub spawn_x: i32,
    #[serde(rename = "SpawnY")]
    pub spawn_y: i32,
    #[serde(rename = "SpawnZ")]
    pub spawn_z: i32,
    #[serde(rename = "raining")]
    pub raining: i8,
    #[serde(rename = "rainTime")]
    pub rain_time: i32,
    #[serde(rename = "thundering")]
    pub thundering: i8,
    #[serde(rename = "thunderTime")]
    pub thunder_time: i32,
    #[serde(rename = "BorderCenterX")]
    pub border_center_x: f64,
    #[serde(rename = "BorderCenterZ")]
    pub border_center_z: f64,
    #[serde(rename = "BorderSize")]
    pub border_size: f64,
    /// Only overridden rules are written; missing rules read as vanilla.
    #[serde(rename = "GameRules", default)]
    pub game_rules: BTreeMap<String, String>,
}

pub fn level_exists(world_dir: &Path) -> bool {
    world_dir.join(LEVEL_FILE).is_file()
}

pub fn read_level(world_dir: &Path) -> Result<LevelData> {
    let path = world_dir.join(LEVEL_FILE);
    let compressed = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;

    let mut bytes = Vec::new();
    GzDecoder::new(&compressed[..])
        .read_to_end(&mut bytes)
        .with_context(|| format!("decompressing {}", path.display()))?;
    let root: LevelRoot =
        fastnbt::from_bytes(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    Ok(root.data)
}

/// Written to a temp file first, then renamed over the old one.
pub fn write_level(world_dir: &Path, level: &LevelData) -> Result<()> {
    fs::create_dir_all(world_dir).with_context(|| format!("creating {}", world_dir.display()))?;

    let root = LevelRoot { data: level.clone() };
    let bytes = fastnbt::to_bytes(&root).context("serializing level data")?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&bytes)?;
    let compressed = encoder.finish()?;

    let path = world_dir.join(LEVEL_FILE);
    let tmp = world_dir.join(format!("{LEVEL_FILE}.tmp"));
    fs::write(&tmp, compressed).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LevelData {
        LevelData {
            level_name: "world".into(),
            random_seed: -42,
            day_time: 18_000,
            time: 90_000,
            difficulty: 2,
            difficulty_locked: 0,
            game_type: 0,
            dimension: 0,
            generator_name: "flat".into(),
            generator_options: String::new(),
            generator_provider: "flat".into(),
            map_features: 1,
            spawn_x: 0,
            spawn_y: 4,
            spawn_z: 0,
            raining: 1,
            rain_time: 1200,
            thundering: 0,
            thunder_time: 0,
            border_center_x: 0.0,
            border_center_z: 0.0,
            border_size: 60_000_000.0,
            game_rules: BTreeMap::from([("keepInventory".to_string(), "true".to_string())]),
        }
    }

    #[test]
    fn level_survives_write_and_read() {
        let dir = std::env::temp_dir().join(format!("trident_level_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        assert!(!level_exists(&dir));
        write_level(&dir, &sample()).unwrap();
        assert!(level_exists(&dir));
        assert!(!dir.join("level.dat.tmp").exists());
        assert_eq!(read_level(&dir).unwrap(), sample());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_level_is_an_error() {
        let dir = std::env::temp_dir().join("trident_level_missing_dir");
        assert!(read_level(&dir).is_err());
    }
}
