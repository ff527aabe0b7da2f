//! Mapping from room key to [`Room`].
//!
//! The registry is a plain owned value: the server loop creates one at
//! startup and hands `&mut` access to the gateway and the scheduler in turn.
//! Every operation addressing an unknown room or session is a silent no-op.

use crate::room::{Room, TickReport};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{GameRules, SessionId, Side, Snapshot};
use std::collections::HashMap;

/// Every room of the server, keyed by room name.
///
/// Owned by the server loop and passed to the scheduler and the gateway; it
/// also holds the rules shared by all rooms and the RNG used for serves.
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    rules: GameRules,
    rng: StdRng,
}

impl RoomRegistry {
    /// Creates an empty registry whose serves are seeded from OS entropy.
    pub fn new(rules: GameRules) -> Self {
        Self::with_rng(rules, StdRng::from_entropy())
    }

    /// Registry with a deterministic serve sequence, for tests.
    pub fn seeded(rules: GameRules, seed: u64) -> Self {
        Self::with_rng(rules, StdRng::seed_from_u64(seed))
    }

    fn with_rng(rules: GameRules, rng: StdRng) -> Self {
        Self {
            rooms: HashMap::new(),
            rules,
            rng,
        }
    }

    /// Rules applied to every room.
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Returns the room for `key`, creating an empty one on first use.
    pub fn ensure(&mut self, key: &str) -> &mut Room {
        self.rooms.entry(key.to_string()).or_insert_with(|| {
            info!("Created room {}", key);
            Room::new()
        })
    }

    /// Looks up a room without creating it.
    pub fn get(&self, key: &str) -> Option<&Room> {
        self.rooms.get(key)
    }

    /// Mutable lookup. Unlike [`RoomRegistry::ensure`], a missing room stays missing.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Room> {
        self.rooms.get_mut(key)
    }

    /// Iterates rooms in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Room)> {
        self.rooms.iter()
    }

    /// Number of rooms, empty ones included.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Seats `session` in `key`, creating the room if needed. A full room
    /// ignores the request.
    pub fn join(&mut self, key: &str, session: SessionId, name: Option<&str>) -> Option<Side> {
        let side = self.ensure(key).join(session, name);
        if side.is_none() {
            debug!("Ignored join of session {} to room {}", session, key);
        }
        side
    }

    /// Moves the paddle of `session` in `key`.
    ///
    /// Returns false for unknown rooms and for sessions not seated there. Unlike
    /// a join, a move never creates a room.
    pub fn move_paddle(&mut self, key: &str, session: SessionId, y: f32) -> bool {
        self.rooms
            .get_mut(key)
            .map(|room| room.move_paddle(session, y))
            .unwrap_or(false)
    }

    /// Resets score, winner and ball of `key`. Returns false if the room does
    /// not exist.
    pub fn restart(&mut self, key: &str) -> bool {
        let Some(room) = self.rooms.get_mut(key) else {
            return false;
        };
        room.restart(&self.rules, &mut self.rng);
        info!("Restarted room {}", key);
        true
    }

    /// Removes `session` from every room it is seated in. Returns the keys of
    /// the rooms it left.
    pub fn disconnect(&mut self, session: SessionId) -> Vec<String> {
        let mut left = Vec::new();
        for (key, room) in self.rooms.iter_mut() {
            if let Some(side) = room.remove(session) {
                info!("Session {} left room {} ({:?} side)", session, key, side);
                left.push(key.clone());
            }
        }
        left
    }

    /// Removes `session` from a single room.
    pub fn leave(&mut self, key: &str, session: SessionId) -> Option<Side> {
        self.rooms.get_mut(key)?.remove(session)
    }

    /// Advances every room by one tick and returns their snapshots.
    pub fn tick_all(&mut self) -> Vec<Snapshot> {
        let mut snapshots = Vec::with_capacity(self.rooms.len());
        for (key, room) in self.rooms.iter_mut() {
            if let TickReport::Finished(side) = room.advance(&self.rules, &mut self.rng) {
                let name = room.winner().map(|winner| winner.name.as_str()).unwrap_or("");
                info!(
                    "Room {} finished: {} ({:?}) wins {}-{}",
                    key, name, side, room.score.left, room.score.right
                );
            }
            snapshots.push(room.snapshot(key));
        }
        snapshots
    }

    /// Drops rooms that have been empty for more than `max_idle_ticks` ticks.
    /// Returns the number of rooms removed.
    pub fn collect_idle(&mut self, max_idle_ticks: u64) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|key, room| {
            let keep = room.player_count() > 0 || room.idle_ticks() <= max_idle_ticks;
            if !keep {
                info!("Dropping idle room {}", key);
            }
            keep
        });
        before - self.rooms.len()
    }
}
