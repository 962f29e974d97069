use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use super::error::WorldError;

/// Ticks in one in-game day.
pub const TICKS_PER_DAY: u32 = 24_000;

/// World time, readable from any thread without blocking the ticker.
///
/// `time()` is the time of day in `[0, 23999]` and wraps to 0 only at the day
/// boundary. `full_time()` counts every tick ever advanced and never wraps.
pub struct WorldClock {
    day_time: AtomicU32,
    full_time: AtomicI64,
}

impl WorldClock {
    pub fn new(day_time: u32, full_time: i64) -> Self {
        Self {
            day_time: AtomicU32::new(day_time % TICKS_PER_DAY),
            full_time: AtomicI64::new(full_time),
        }
    }

    pub fn time(&self) -> u32 {
        self.day_time.load(Ordering::Acquire)
    }

    pub fn full_time(&self) -> i64 {
        self.full_time.load(Ordering::Acquire)
    }

    /// Advance both counters by `ticks`. Returns the new time of day.
    pub fn advance(&self, ticks: u32) -> u32 {
        self.full_time.fetch_add(ticks as i64, Ordering::AcqRel);
        self.advance_day(ticks)
    }

    /// Advance only the full-time counter (day time frozen).
    pub fn advance_frozen(&self, ticks: u32) {
        self.full_time.fetch_add(ticks as i64, Ordering::AcqRel);
    }

    fn advance_day(&self, ticks: u32) -> u32 {
        let step = ticks % TICKS_PER_DAY;
        let prev = self
            .day_time
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some((t + step) % TICKS_PER_DAY)
            })
            .unwrap_or_else(|t| t);
        (prev + step) % TICKS_PER_DAY
    }

    /// Set the time of day. Values outside `[0, 23999]` are rejected.
    pub fn set_time(&self, time: u32) -> Result<(), WorldError> {
        if time >= TICKS_PER_DAY {
            return Err(WorldError::invalid(format!(
                "time {} outside [0, {}]",
                time,
                TICKS_PER_DAY - 1
            )));
        }
        self.day_time.store(time, Ordering::Release);
        Ok(())
    }
}

impl Default for WorldClock {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
