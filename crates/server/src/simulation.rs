//! Ambient simulation.
//!
//! Each [`SimulationLayer`] runs on its own tokio task and ticks every loaded
//! world on its interval. Layers are expected to be cheap per tick; heavy
//! work should be amortized across ticks.
//!
//! # Adding a new layer
//!
//! 1. Implement [`SimulationLayer`] for your struct.
//! 2. Push a `Box::new(YourLayer)` into the `layers` vec in `main.rs`.

use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::opts::{GameRule, Weather};
use crate::world::{TridentWorld, World, WorldManager};

/// One game tick.
pub const TICK: Duration = Duration::from_millis(50);

pub trait SimulationLayer: Send + Sync + 'static {
    /// Used for logging.
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    fn tick(&self, world: &TridentWorld);
}

/// Advances world time one tick per [`TICK`].
pub struct TimeLayer;

impl SimulationLayer for TimeLayer {
    fn name(&self) -> &'static str {
        "time"
    }

    fn interval(&self) -> Duration {
        TICK
    }

    fn tick(&self, world: &TridentWorld) {
        world.tick(1);
    }
}

/// Rain and thunder on vanilla timers.
pub struct WeatherLayer {
    rng: Mutex<fastrand::Rng>,
}

impl WeatherLayer {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl Default for WeatherLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationLayer for WeatherLayer {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn interval(&self) -> Duration {
        TICK
    }

    fn tick(&self, world: &TridentWorld) {
        let mut rng = self.rng.lock().expect("weather rng poisoned");
        advance_weather(world, &mut rng);
    }
}

// Durations in ticks, as vanilla draws them.
const RAIN_ON: Range<i32> = 12_000..24_000;
const RAIN_OFF: Range<i32> = 12_000..180_000;
const THUNDER_ON: Range<i32> = 3_600..15_600;
const THUNDER_OFF: Range<i32> = 12_000..180_000;

/// Count one timer down, toggling its flag when it runs out. An unscheduled
/// timer (0) gets a fresh duration for the current state.
fn step_timer(on: &mut bool, timer: &mut i32, rng: &mut fastrand::Rng, on_for: Range<i32>, off_for: Range<i32>) {
    if *timer <= 0 {
        *timer = if *on { rng.i32(on_for) } else { rng.i32(off_for) };
    } else {
        *timer -= 1;
        if *timer == 0 {
            *on = !*on;
        }
    }
}

/// One weather tick for `world`. Skipped in dimensions without a sky and
/// while `doWeatherCycle` is off.
///
/// If a listener cancels a change of sky, the sky stays as it was and the
/// expired timer is rescheduled on the next tick. Weather set by anyone else
/// while the tick runs wins; the tick is dropped.
pub fn advance_weather(world: &TridentWorld, rng: &mut fastrand::Rng) {
    if !world.dimension().has_sky()
        || !world.world_options().game_rules.get_bool(GameRule::DoWeatherCycle)
    {
        return;
    }

    let current = world.weather();
    let mut next = current;
    step_timer(&mut next.thundering, &mut next.thunder_time, rng, THUNDER_ON, THUNDER_OFF);
    step_timer(&mut next.raining, &mut next.rain_time, rng, RAIN_ON, RAIN_OFF);

    let applied = match world.replace_weather(current, next) {
        Ok(applied) => applied,
        Err(_) => {
            tracing::debug!("Weather in '{}' changed during the tick, skipping it", world.name());
            return;
        }
    };
    if !applied {
        // Same sky as before, so this is not announced.
        let _ = world.replace_weather(
            current,
            Weather {
                raining: current.raining,
                thundering: current.thundering,
                ..next
            },
        );
    }
}

/// Spawn one tokio task per layer, each ticking every loaded world.
pub fn start(manager: Arc<WorldManager>, layers: Vec<Box<dyn SimulationLayer>>) -> Vec<JoinHandle<()>> {
    layers
        .into_iter()
        .map(|layer| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(layer.interval());
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                // The first tick fires immediately; skip it.
                interval.tick().await;

                tracing::info!("Simulation layer '{}' started (interval {:?})", layer.name(), layer.interval());

                loop {
                    interval.tick().await;
                    for world in manager.worlds() {
                        layer.tick(&world);
                    }
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_schedules_then_counts_down_and_toggles() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut on = false;
        let mut timer = 0;

        step_timer(&mut on, &mut timer, &mut rng, 5..6, 3..4);
        assert_eq!((on, timer), (false, 3));
        step_timer(&mut on, &mut timer, &mut rng, 5..6, 3..4);
        step_timer(&mut on, &mut timer, &mut rng, 5..6, 3..4);
        assert_eq!((on, timer), (false, 1));
        step_timer(&mut on, &mut timer, &mut rng, 5..6, 3..4);
        assert_eq!((on, timer), (true, 0));
        step_timer(&mut on, &mut timer, &mut rng, 5..6, 3..4);
        assert_eq!((on, timer), (true, 5));
    }
}
