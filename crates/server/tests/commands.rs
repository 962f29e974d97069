use std::path::PathBuf;

use trident_server::commands::{self, CommandRegistry};
use trident_server::opts::{LevelType, Weather, WorldCreateSpec};
use trident_server::{ServerError, TridentWorld, World, WorldManager};

fn setup(name: &str) -> (PathBuf, WorldManager, std::sync::Arc<TridentWorld>, CommandRegistry) {
    let root = std::env::temp_dir().join(format!("trident_cmd_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&root);
    let manager = WorldManager::new(&root);
    let world = manager
        .create_world("world", &WorldCreateSpec::custom().with_level_type(LevelType::Flat))
        .unwrap();
    (root, manager, world, commands::standard().unwrap())
}

#[test]
fn time_and_weather_commands_change_the_world() {
    let (root, manager, world, registry) = setup("time_weather");

    registry.dispatch(&manager, &world, "time set 6000").unwrap();
    assert_eq!(world.time(), 6000);
    registry.dispatch(&manager, &world, "/time add 19000").unwrap();
    assert_eq!(world.time(), 1000);
    assert!(registry.dispatch(&manager, &world, "time").unwrap().contains("1000"));

    registry.dispatch(&manager, &world, "weather thunder").unwrap();
    assert_eq!(world.weather(), Weather::thunder());
    assert!(registry.dispatch(&manager, &world, "weather").unwrap().contains("thunder"));

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn bad_input_is_reported() {
    let (root, manager, world, registry) = setup("bad_input");

    let err = registry.dispatch(&manager, &world, "fly").unwrap_err();
    assert!(matches!(err, ServerError::UnknownCommand(_)));
    let err = registry.dispatch(&manager, &world, "time set noon").unwrap_err();
    assert!(matches!(err, ServerError::InvalidArgument(_)));
    let err = registry.dispatch(&manager, &world, "time set 24000").unwrap_err();
    assert!(matches!(err, ServerError::World(_)));
    assert_eq!(registry.dispatch(&manager, &world, "   ").unwrap(), "");

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn listing_and_saving() {
    let (root, manager, world, registry) = setup("listing");
    world.set_block(1, 10, 1, trident_server::block::STONE).unwrap();

    let help = registry.dispatch(&manager, &world, "help").unwrap();
    for name in ["help", "save", "time", "weather", "chunks", "worlds"] {
        assert!(help.contains(name), "help is missing {name}");
    }
    assert!(registry.dispatch(&manager, &world, "? save").unwrap().contains("save-all"));
    assert!(registry.dispatch(&manager, &world, "ls").unwrap().starts_with("world"));

    registry.dispatch(&manager, &world, "save").unwrap();
    assert_eq!(world.chunk_table().dirty_count(), 0);
    assert!(registry.dispatch(&manager, &world, "chunks").unwrap().contains("0 dirty"));

    let _ = std::fs::remove_dir_all(&root);
}
