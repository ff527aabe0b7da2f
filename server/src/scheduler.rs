//! Fixed-rate driver advancing every room.

use crate::registry::RoomRegistry;
use log::debug;
use shared::Snapshot;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

pub struct TickScheduler {
    period: Duration,
    tick: u64,
    /// Rooms empty for longer than this many ticks are dropped.
    max_idle_ticks: Option<u64>,
}

impl TickScheduler {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / tick_rate.max(1) as f64),
            tick: 0,
            max_idle_ticks: None,
        }
    }

    /// Enables dropping of rooms that stayed empty for `idle`.
    pub fn with_room_idle_timeout(mut self, idle: Option<Duration>) -> Self {
        let period = self.period.as_secs_f64();
        self.max_idle_ticks = idle.map(|idle| (idle.as_secs_f64() / period).round().max(1.0) as u64);
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Interval firing once per period. A late loop skips the missed ticks
    /// instead of bursting them, so the ball never speeds up to catch up.
    pub fn interval(&self) -> Interval {
        let mut timer = interval(self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer
    }

    /// Advances every room once and returns the snapshots to broadcast.
    pub fn run_tick(&mut self, registry: &mut RoomRegistry) -> Vec<Snapshot> {
        self.tick += 1;
        let snapshots = registry.tick_all();

        if let Some(max_idle_ticks) = self.max_idle_ticks {
            registry.collect_idle(max_idle_ticks);
        }

        if self.tick % 600 == 0 {
            debug!("Tick {}: {} rooms", self.tick, registry.len());
        }
        snapshots
    }
}
