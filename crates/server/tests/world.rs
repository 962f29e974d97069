use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use trident_engine::world::block::BlockId;
use trident_engine::world::clock::TICKS_PER_DAY;
use trident_engine::world::error::WorldError;
use trident_engine::world::position::{BlockPos, ChunkPos, Position};
use trident_server::block;
use trident_server::event_bus::{Ignorable, ServerEvent};
use trident_server::generator::{FlatGenerator, TerrainGenerator};
use trident_server::opts::{Difficulty, Dimension, GameMode, GameRule, GameRuleMap, LevelType, Weather, WorldCreateSpec};
use trident_server::simulation::advance_weather;
use trident_server::{ServerError, World, WorldManager};

struct TempRoot(PathBuf);

impl TempRoot {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("trident_world_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        Self(dir)
    }
}

impl Drop for TempRoot {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn flat() -> WorldCreateSpec {
    WorldCreateSpec::custom().with_level_type(LevelType::Flat).with_seed(7)
}

#[test]
fn save_and_reopen_reproduces_blocks_and_state() {
    let root = TempRoot::new("roundtrip");
    let mut rules = GameRuleMap::new();
    rules.set_by_name("keepInventory", "true").unwrap();
    let spec = flat()
        .with_difficulty(Difficulty::Hard)
        .with_game_mode(GameMode::Creative)
        .with_game_rules(rules)
        .with_option_string("3;bedrock,stone");

    {
        let manager = WorldManager::new(&root.0);
        let world = manager.create_world("alpha", &spec).unwrap();
        world.set_block(5, 10, 5, block::STONE).unwrap();
        world.set_block(-20, 3, 40, block::SAND).unwrap();
        world.set_block(0, 3, 0, BlockId::AIR).unwrap();
        world.set_time(18_000).unwrap();
        assert!(world.set_weather(Weather { rain_time: 500, ..Weather::rain() }));

        let written = world.save().unwrap();
        assert!(written >= 2);
        assert_eq!(world.chunk_table().dirty_count(), 0);
        assert!(world.directory().join("level.dat").exists());
        assert!(world.directory().join("region/r.-1.0.mca").exists());
    }

    let manager = WorldManager::new(&root.0);
    let world = manager.load_world("alpha").unwrap();
    assert_eq!(world.block_at(5, 10, 5).unwrap().id, block::STONE);
    assert_eq!(world.block_at(-20, 3, 40).unwrap().id, block::SAND);
    assert_eq!(world.block_at(0, 3, 0).unwrap().id, BlockId::AIR);
    assert_eq!(world.block_at(1, 3, 0).unwrap().id, block::GRASS_BLOCK);
    // Everything read so far was on disk.
    assert_eq!(world.chunk_table().stats().generations, 0);

    assert_eq!(world.time(), 18_000);
    assert_eq!(world.weather(), Weather { rain_time: 500, ..Weather::rain() });
    let opts = world.world_options();
    assert_eq!(opts.difficulty, Difficulty::Hard);
    assert_eq!(opts.game_mode, GameMode::Creative);
    assert!(opts.game_rules.get_bool(GameRule::KeepInventory));
    let gen_opts = world.generator_options();
    assert_eq!(gen_opts.seed, 7);
    assert_eq!(gen_opts.level_type, LevelType::Flat);
    assert_eq!(gen_opts.provider, FlatGenerator::NAME);
    assert_eq!(gen_opts.option_string, "3;bedrock,stone");
    assert_eq!(world.spawn(), Position::new(0.0, 4.0, 0.0));
}

#[test]
fn default_spec_builds_a_vanilla_world() {
    let root = TempRoot::new("default");
    let manager = WorldManager::new(&root.0);
    let world = manager
        .create_world("world", WorldCreateSpec::default_options())
        .unwrap();

    assert!(WorldCreateSpec::default_options().is_default());
    assert_eq!(world.dimension(), Dimension::Overworld);
    assert_eq!(world.world_options().difficulty, Difficulty::Normal);
    assert_eq!(world.world_options().game_mode, GameMode::Survival);
    assert!(world.world_options().allow_features);
    assert_eq!(world.generator_options().provider, TerrainGenerator::NAME);
    assert_eq!(world.weather(), Weather::clear());
    assert_eq!(world.spawn().y, (world.highest_y(0, 0).unwrap() + 1) as f64);
}

#[test]
fn world_names_are_unique() {
    let root = TempRoot::new("unique");
    let manager = WorldManager::new(&root.0);
    manager.create_world("alpha", &flat()).unwrap();

    let err = manager.create_world("alpha", &flat()).unwrap_err();
    assert!(matches!(err, ServerError::WorldExists(_)));

    // A second server over the same directory sees it on disk.
    let other = WorldManager::new(&root.0);
    let err = other.create_world("alpha", &flat()).unwrap_err();
    assert!(matches!(err, ServerError::WorldExists(_)));

    assert!(matches!(manager.load_world("beta"), Err(ServerError::UnknownWorld(_))));
    assert!(matches!(manager.create_world("../up", &flat()), Err(ServerError::InvalidArgument(_))));
    assert!(matches!(manager.create_world("", &flat()), Err(ServerError::InvalidArgument(_))));
}

#[test]
fn load_or_create_returns_the_loaded_instance() {
    let root = TempRoot::new("load_or_create");
    let manager = WorldManager::new(&root.0);
    let a = manager.load_or_create("alpha", &flat()).unwrap();
    let b = manager.load_or_create("alpha", &flat()).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &manager.get("alpha").unwrap()));
    assert!(Arc::ptr_eq(&a, &manager.load_world("alpha").unwrap()));
    assert_eq!(manager.worlds().len(), 1);
}

#[test]
fn unload_saves_and_reload_sees_changes() {
    let root = TempRoot::new("unload");
    let manager = WorldManager::new(&root.0);
    let world = manager.create_world("alpha", &flat()).unwrap();
    world.set_block(3, 20, 3, block::OAK_LOG).unwrap();
    drop(world);

    assert!(manager.unload_world("alpha", true).unwrap());
    assert!(!manager.unload_world("alpha", true).unwrap());
    assert!(manager.get("alpha").is_none());

    let world = manager.load_world("alpha").unwrap();
    assert_eq!(world.block_at(3, 20, 3).unwrap().id, block::OAK_LOG);
}

#[test]
fn failed_unload_keeps_the_loaded_instance() {
    let root = TempRoot::new("unload_failed");
    let manager = WorldManager::new(&root.0);
    let world = manager.create_world("alpha", &flat()).unwrap();
    // Only the raw chunk table takes a state the region format cannot name.
    world
        .chunk_table()
        .set_block(BlockPos::new(1, 10, 1), BlockId(60_000))
        .unwrap();

    assert!(manager.unload_world("alpha", true).is_err());
    assert!(Arc::ptr_eq(&world, &manager.get("alpha").unwrap()));
    assert!(Arc::ptr_eq(&world, &manager.load_world("alpha").unwrap()));
    assert!(world.chunk_table().is_dirty(ChunkPos::new(0, 0)));

    world.set_block(1, 10, 1, block::STONE).unwrap();
    assert!(manager.unload_world("alpha", true).unwrap());
    assert!(manager.get("alpha").is_none());
}

#[test]
fn blocks_that_cannot_be_saved_are_refused() {
    let root = TempRoot::new("unsaveable");
    let manager = WorldManager::new(&root.0);
    let world = manager.create_world("alpha", &flat()).unwrap();

    for (y, id) in [(10, BlockId(60_000)), (100_000, block::STONE), (-100_000, block::STONE)] {
        let err = world.set_block(1, y, 1, id).unwrap_err();
        assert!(matches!(err, WorldError::InvalidArgument(_)));
    }
    world.set_block(1, 10, 1, block::STONE).unwrap();

    // Past the checks, the save itself refuses and keeps the chunk dirty.
    world
        .chunk_table()
        .set_block(BlockPos::new(2, 100_000, 2), block::STONE)
        .unwrap();
    let err = world.save().unwrap_err();
    assert!(matches!(err, ServerError::World(WorldError::Save { .. })));
    assert!(world.chunk_table().is_dirty(ChunkPos::new(0, 0)));

    world
        .chunk_table()
        .set_block(BlockPos::new(2, 100_000, 2), BlockId::AIR)
        .unwrap();
    world.save().unwrap();
    drop(world);
    assert!(manager.unload_world("alpha", false).unwrap());

    let world = manager.load_world("alpha").unwrap();
    assert_eq!(world.block_at(1, 10, 1).unwrap().id, block::STONE);
}

#[test]
fn chunk_access_through_the_trait() {
    let root = TempRoot::new("trait");
    let manager = WorldManager::new(&root.0);
    let world = manager.create_world("alpha", &flat()).unwrap();
    let w: &dyn World = &*world;

    let first = w.chunk_at(4, -9).unwrap();
    let second = w.chunk_at(4, -9).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.pos(), ChunkPos::new(4, -9));
    assert!(Arc::ptr_eq(&first, &w.chunk_at_or_none(4, -9, false).unwrap().unwrap()));

    let before = w.loaded_chunks().len();
    assert!(w.chunk_at_or_none(100, 100, false).unwrap().is_none());
    assert_eq!(w.loaded_chunks().len(), before);
    assert!(w.chunk_at_or_none(100, 100, true).unwrap().is_some());
    assert_eq!(w.loaded_chunks().len(), before + 1);

    // Saved then evicted: found in storage without generating.
    w.save().unwrap();
    assert!(world.chunk_table().unload(ChunkPos::new(4, -9), true).unwrap());
    let generations = world.chunk_table().stats().generations;
    assert!(w.chunk_at_or_none(4, -9, false).unwrap().is_some());
    assert_eq!(world.chunk_table().stats().generations, generations);
}

#[test]
fn concurrent_first_access_generates_once() {
    let root = TempRoot::new("concurrent");
    let manager = WorldManager::new(&root.0);
    let world = manager.create_world("alpha", &flat()).unwrap();
    let generations = world.chunk_table().stats().generations;

    let n = 16;
    let barrier = Barrier::new(n);
    let chunks: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..n)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    world.chunk_at(-30, 12).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(chunks.iter().all(|c| Arc::ptr_eq(c, &chunks[0])));
    assert_eq!(world.chunk_table().stats().generations, generations + 1);
}

#[test]
fn block_queries_agree() {
    let root = TempRoot::new("blocks");
    let manager = WorldManager::new(&root.0);
    let world = manager.create_world("alpha", &flat()).unwrap();
    world.set_block(-1, 3, -17, block::SAND).unwrap();

    let by_pos = world.block_at_pos(Position::new(-0.5, 3.2, -16.1)).unwrap();
    let by_xyz = world.block_at(-1, 3, -17).unwrap();
    assert_eq!(by_pos, by_xyz);
    assert_eq!(by_xyz.id, block::SAND);

    assert_eq!(world.highest_y(200, -300).unwrap(), 3);
    world.set_block(200, 50, -300, block::STONE).unwrap();
    assert_eq!(world.highest_y(200, -300).unwrap(), 50);
}

#[test]
fn time_wraps_at_the_day_boundary() {
    let root = TempRoot::new("time");
    let manager = WorldManager::new(&root.0);
    let world = manager.create_world("alpha", &flat()).unwrap();

    assert_eq!(world.tick(TICKS_PER_DAY), 0);
    world.set_time(23_999).unwrap();
    assert_eq!(world.tick(1), 0);
    assert_eq!(world.tick(100), 100);
    assert!(world.set_time(TICKS_PER_DAY).is_err());
    assert_eq!(world.full_time(), TICKS_PER_DAY as i64 + 101);

    let mut rules = GameRuleMap::new();
    rules.set_by_name("doDaylightCycle", "false").unwrap();
    let frozen = manager
        .create_world("frozen", &flat().with_game_rules(rules))
        .unwrap();
    frozen.tick(500);
    assert_eq!(frozen.time(), 0);
    assert_eq!(frozen.full_time(), 500);
}

#[test]
fn ignored_weather_event_vetoes_the_change() {
    let root = TempRoot::new("weather");
    let manager = WorldManager::new(&root.0);
    let world = manager.create_world("alpha", &flat()).unwrap();
    let mut rx = manager.events().subscribe();

    let dispatched = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&dispatched);
    manager.events().listen(move |event| {
        counter.fetch_add(1, Ordering::SeqCst);
        if let ServerEvent::Weather(w) = event {
            if w.weather().thundering {
                w.ignore(true);
            }
        }
    });

    assert!(world.set_weather(Weather::rain()));
    assert!(!world.set_weather(Weather::thunder()));
    assert_eq!(world.weather(), Weather::rain());
    // Timers alone are not announced.
    assert!(world.set_weather(Weather { rain_time: 40, ..Weather::rain() }));
    assert_eq!(dispatched.load(Ordering::SeqCst), 2);

    assert!(!rx.try_recv().unwrap().is_ignored());
    assert!(rx.try_recv().unwrap().is_ignored());
}

#[test]
fn weather_cycle_respects_vetoes() {
    let root = TempRoot::new("weather_cycle");
    let manager = WorldManager::new(&root.0);
    let world = manager.create_world("alpha", &flat()).unwrap();
    manager.events().listen(|event| event.ignore(true));

    world.set_weather(Weather { rain_time: 2, ..Weather::clear() });
    let mut rng = fastrand::Rng::with_seed(1);
    advance_weather(&world, &mut rng);
    assert_eq!(world.weather().rain_time, 1);
    advance_weather(&world, &mut rng);
    // Would have started raining; the listener said no.
    assert!(!world.weather().raining);
    assert_eq!(world.weather().rain_time, 0);
    advance_weather(&world, &mut rng);
    assert!(world.weather().rain_time >= 12_000);
}

#[test]
fn weather_tick_yields_to_a_concurrent_change() {
    let root = TempRoot::new("weather_race");
    let manager = WorldManager::new(&root.0);
    let world = manager.create_world("alpha", &flat()).unwrap();
    world.set_weather(Weather { rain_time: 1, thunder_time: 50_000, ..Weather::clear() });

    // While the tick is announcing rain, a console command sets thunder.
    let w = Arc::clone(&world);
    let fired = Arc::new(AtomicBool::new(false));
    let f = Arc::clone(&fired);
    manager.events().listen(move |event| {
        if let ServerEvent::Weather(e) = event {
            if e.weather().raining && !f.swap(true, Ordering::SeqCst) {
                assert!(w.set_weather(Weather::thunder()));
            }
        }
    });

    let mut rng = fastrand::Rng::with_seed(3);
    advance_weather(&world, &mut rng);
    assert!(fired.load(Ordering::SeqCst));
    assert_eq!(world.weather(), Weather::thunder());

    let stale = Weather::clear();
    assert_eq!(world.replace_weather(stale, Weather::rain()), Err(Weather::thunder()));
    assert_eq!(world.replace_weather(Weather::thunder(), Weather::rain()), Ok(true));
    assert_eq!(world.weather(), Weather::rain());
}

#[test]
fn entity_views_are_snapshots() {
    let root = TempRoot::new("entities");
    let manager = WorldManager::new(&root.0);
    let world = manager.create_world("alpha", &flat()).unwrap();

    let steve = world.spawn_player("Steve", world.spawn());
    world.spawn_player("Alex", world.spawn());
    let zombie = world.spawn_entity("zombie", Position::new(4.0, 4.0, 4.0));

    assert!(world.move_entity(zombie, Position::new(9.0, 4.0, 9.0)));
    let entities = world.entities();
    world.despawn(zombie).unwrap();
    world.despawn(steve).unwrap();
    assert_eq!(entities.count(), 3);
    assert!(!world.move_entity(zombie, Position::new(0.0, 4.0, 0.0)));

    let players = world.players();
    assert_eq!(players.len(), 1);
    assert!(players[0].is_player());
    assert!(world.player("Alex").is_some());
    assert!(world.player("Steve").is_none());
}
