use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use trident_engine::world::position::ChunkPos;
use trident_server::commands;
use trident_server::event_bus::{Ignorable, ServerEvent};
use trident_server::opts::{LevelType, WorldCreateSpec};
use trident_server::simulation::{self, SimulationLayer, TimeLayer, WeatherLayer};
use trident_server::{World, WorldManager};

/// Value following `flag` on the command line.
fn arg(flag: &str) -> Option<String> {
    std::env::args().skip_while(|a| a != flag).nth(1)
}

#[tokio::main]
async fn main() {
    let worlds_dir: PathBuf = arg("--worlds").unwrap_or_else(|| "worlds".into()).into();
    let world_name = arg("--world").unwrap_or_else(|| "world".into());
    let seed: Option<i64> = arg("--seed").and_then(|s| s.parse().ok());
    let flat = std::env::args().any(|a| a == "--flat");
    let spawn_radius: i32 = arg("--spawn-radius")
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);
    let autosave = Duration::from_secs(
        arg("--autosave")
            .and_then(|s| s.parse().ok())
            .unwrap_or(300),
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Trident world server");

    let manager = Arc::new(WorldManager::new(worlds_dir.clone()));

    let spec = if seed.is_none() && !flat {
        None
    } else {
        let level_type = if flat { LevelType::Flat } else { LevelType::Default };
        Some(
            WorldCreateSpec::custom()
                .with_seed(seed.unwrap_or_else(|| fastrand::i64(..)))
                .with_level_type(level_type),
        )
    };
    let spec = spec.as_ref().unwrap_or(WorldCreateSpec::default_options());

    let world = match manager.load_or_create(&world_name, spec) {
        Ok(world) => world,
        Err(e) => {
            tracing::error!("Cannot open world '{}': {}", world_name, e);
            std::process::exit(1);
        }
    };

    // ── Spawn area ───────────────────────────────────────────────────────
    let spawn_chunk: ChunkPos = world.spawn_chunk();
    let preload = {
        let world = Arc::clone(&world);
        tokio::task::spawn_blocking(move || world.chunk_table().preload_area(spawn_chunk, spawn_radius))
    };
    match preload.await {
        Ok(Ok(n)) => tracing::info!("Spawn area ready: {} chunks around {}", n, spawn_chunk),
        Ok(Err(e)) => tracing::error!("Spawn preload failed: {}", e),
        Err(e) => tracing::error!("Spawn preload task failed: {}", e),
    }

    // ── Events ───────────────────────────────────────────────────────────
    let mut events = manager.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match &event {
                ServerEvent::Weather(e) if !event.is_ignored() => {
                    tracing::info!("Weather in '{}' is now {:?}", e.world(), e.weather());
                }
                _ => tracing::debug!("Event: {:?}", event),
            }
        }
    });

    // ── Simulation ───────────────────────────────────────────────────────
    let layers: Vec<Box<dyn SimulationLayer>> = vec![Box::new(TimeLayer), Box::new(WeatherLayer::new())];
    simulation::start(Arc::clone(&manager), layers);

    // ── Periodic autosave ────────────────────────────────────────────────
    let save_manager = Arc::clone(&manager);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(autosave);
        interval.tick().await; // first tick is immediate, skip it
        loop {
            interval.tick().await;
            tracing::info!("Autosaving...");
            match save_manager.save_all() {
                Ok(n) => tracing::info!("Autosave complete: {} chunks", n),
                Err(e) => tracing::error!("Autosave failed: {}", e),
            }
        }
    });

    // ── Console ──────────────────────────────────────────────────────────
    let registry = match commands::standard() {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!("Command table: {}", e);
            std::process::exit(1);
        }
    };
    let console_manager = Arc::clone(&manager);
    let console_world = Arc::clone(&world);
    let console = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if matches!(line.trim(), "stop" | "exit") {
                return;
            }
            match registry.dispatch(&console_manager, &console_world, &line) {
                Ok(out) if out.is_empty() => {}
                Ok(out) => println!("{out}"),
                Err(e) => println!("{e}"),
            }
        }
        // No stdin (detached); keep running until Ctrl+C.
        std::future::pending::<()>().await;
    });

    tracing::info!("World '{}' running; type 'help' for commands", world.name());

    tokio::select! {
        _ = console => tracing::info!("Stop requested, shutting down..."),
        _ = tokio::signal::ctrl_c() => tracing::info!("Ctrl+C received, shutting down..."),
    }

    // ── Save on shutdown ─────────────────────────────────────────────────
    tracing::info!("Saving worlds before exit...");
    match manager.save_all() {
        Ok(n) => tracing::info!("Shutdown save complete: {} chunks written", n),
        Err(e) => tracing::error!("Shutdown save failed: {}", e),
    }
}
