//! One two-player match: seated players, ball, score and winner.
//!
//! A room moves through `Empty -> Filling -> Active -> Finished`. The phase is
//! never stored; it is derived from the occupied slots and the winner so that
//! it cannot drift out of sync with them.

use log::info;
use rand::Rng;
use shared::{
    clamp_paddle, step, Ball, BallView, GameRules, Paddles, PlayerView, Score, SessionId, Side,
    Snapshot, StepOutcome, DEFAULT_PLAYER_NAME, MAX_NAME_LEN,
};

/// A seated player. Moved only by its own session's intents.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: SessionId,
    pub name: String,
    /// Paddle center, in percent of the court height.
    pub y: f32,
}

impl Player {
    /// Player with a cleaned up display name and a centered paddle.
    pub fn new(id: SessionId, name: Option<&str>) -> Self {
        Self {
            id,
            name: display_name(name),
            y: shared::COURT_CENTER,
        }
    }
}

/// Trims the requested name, falls back to the placeholder when nothing is
/// left and caps the length.
fn display_name(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name.chars().take(MAX_NAME_LEN).collect(),
        None => DEFAULT_PLAYER_NAME.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Winner {
    pub side: Side,
    /// Player name at the time of winning, or the slot label if the slot was empty.
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    Empty,
    Filling,
    Active,
    Finished,
}

/// What a single tick did to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReport {
    /// Nobody is seated; nothing moved.
    Idle,
    /// A winner is set; physics is suspended until a restart.
    Suspended,
    Stepped(StepOutcome),
    /// The point scored this tick ended the match.
    Finished(Side),
}

#[derive(Debug, Clone)]
pub struct Room {
    left: Option<Player>,
    right: Option<Player>,
    pub ball: Ball,
    pub score: Score,
    winner: Option<Winner>,
    tick: u64,
    idle_ticks: u64,
}

impl Default for Room {
    fn default() -> Self {
        Self::new()
    }
}

impl Room {
    /// Empty room with the kickoff ball and a 0-0 score.
    pub fn new() -> Self {
        Self {
            left: None,
            right: None,
            ball: Ball::kickoff(),
            score: Score::default(),
            winner: None,
            tick: 0,
            idle_ticks: 0,
        }
    }

    /// Lifecycle phase, derived from the seated players and the winner.
    pub fn phase(&self) -> RoomPhase {
        if self.winner.is_some() {
            return RoomPhase::Finished;
        }
        match self.player_count() {
            0 => RoomPhase::Empty,
            1 => RoomPhase::Filling,
            _ => RoomPhase::Active,
        }
    }

    pub fn player_count(&self) -> usize {
        self.left.is_some() as usize + self.right.is_some() as usize
    }

    /// Player seated on `side`, if any.
    pub fn player(&self, side: Side) -> Option<&Player> {
        match side {
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        }
    }

    fn slot_mut(&mut self, side: Side) -> &mut Option<Player> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Seated players, left slot first.
    pub fn players(&self) -> impl Iterator<Item = (Side, &Player)> {
        self.left
            .iter()
            .map(|player| (Side::Left, player))
            .chain(self.right.iter().map(|player| (Side::Right, player)))
    }

    /// Slot occupied by `session`.
    pub fn side_of(&self, session: SessionId) -> Option<Side> {
        self.players()
            .find(|(_, player)| player.id == session)
            .map(|(side, _)| side)
    }

    pub fn contains(&self, session: SessionId) -> bool {
        self.side_of(session).is_some()
    }

    pub fn winner(&self) -> Option<&Winner> {
        self.winner.as_ref()
    }

    /// Ticks this room has been advanced, finished ticks included.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Consecutive ticks this room has spent without any player.
    pub fn idle_ticks(&self) -> u64 {
        self.idle_ticks
    }

    /// Seats `session` in the first open slot, left before right.
    ///
    /// Returns `None` when the room is full or the session is already seated.
    pub fn join(&mut self, session: SessionId, name: Option<&str>) -> Option<Side> {
        if self.contains(session) {
            return None;
        }

        let side = [Side::Left, Side::Right]
            .into_iter()
            .find(|side| self.player(*side).is_none())?;

        let player = Player::new(session, name);
        info!("Seated session {} ({}) on the {:?} side", session, player.name, side);
        *self.slot_mut(side) = Some(player);
        Some(side)
    }

    /// Moves the session's paddle to `y`, clamped to the court.
    ///
    /// Returns false when the session is not seated here or `y` is NaN.
    pub fn move_paddle(&mut self, session: SessionId, y: f32) -> bool {
        let Some(y) = clamp_paddle(y) else {
            return false;
        };
        let Some(side) = self.side_of(session) else {
            return false;
        };

        match self.slot_mut(side) {
            Some(player) => {
                player.y = y;
                true
            }
            None => false,
        }
    }

    /// Unseats `session`, leaving the other player in place.
    pub fn remove(&mut self, session: SessionId) -> Option<Side> {
        let side = self.side_of(session)?;
        self.slot_mut(side).take();
        Some(side)
    }

    /// Clears the winner, zeroes the score and serves a new ball.
    pub fn restart<R: Rng + ?Sized>(&mut self, rules: &GameRules, rng: &mut R) {
        self.winner = None;
        self.score.reset();
        self.ball = Ball::serve(rng, rules.ball_speed);
    }

    fn paddles(&self) -> Paddles {
        Paddles {
            left: self.left.as_ref().map(|player| player.y),
            right: self.right.as_ref().map(|player| player.y),
        }
    }

    /// Sets the winner once a side has reached the win score. Returns the side
    /// when the winner was set by this call.
    fn settle_winner(&mut self, rules: &GameRules) -> Option<Side> {
        if self.winner.is_some() {
            return None;
        }
        let side = self.score.leader(rules.win_score)?;
        let name = self
            .player(side)
            .map(|player| player.name.clone())
            .unwrap_or_else(|| side.label().to_string());
        self.winner = Some(Winner { side, name });
        Some(side)
    }

    /// Runs one simulation tick.
    pub fn advance<R: Rng + ?Sized>(&mut self, rules: &GameRules, rng: &mut R) -> TickReport {
        self.tick += 1;

        if self.player_count() == 0 {
            self.idle_ticks += 1;
        } else {
            self.idle_ticks = 0;
        }

        if let Some(side) = self.settle_winner(rules) {
            return TickReport::Finished(side);
        }
        if self.winner.is_some() {
            return TickReport::Suspended;
        }
        if self.player_count() == 0 {
            return TickReport::Idle;
        }

        let paddles = self.paddles();
        let outcome = step(&mut self.ball, &mut self.score, paddles, rules, rng);

        if let StepOutcome::Scored(_) = outcome {
            if let Some(side) = self.settle_winner(rules) {
                return TickReport::Finished(side);
            }
        }
        TickReport::Stepped(outcome)
    }

    pub fn snapshot(&self, key: &str) -> Snapshot {
        Snapshot {
            room: key.to_string(),
            tick: self.tick,
            players: self
                .players()
                .map(|(side, player)| PlayerView {
                    id: player.id,
                    y: player.y,
                    name: player.name.clone(),
                    side,
                })
                .collect(),
            ball: BallView {
                x: self.ball.x,
                y: self.ball.y,
            },
            score: self.score,
            winner: self.winner.as_ref().map(|winner| winner.name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    fn full_room() -> Room {
        let mut room = Room::new();
        room.join(1, Some("L"));
        room.join(2, Some("R"));
        room
    }

    #[test]
    fn test_room_creation() {
        let room = Room::new();
        assert_eq!(room.phase(), RoomPhase::Empty);
        assert_eq!(room.player_count(), 0);
        assert_eq!(room.ball, Ball::kickoff());
        assert_eq!(room.score, Score::default());
        assert!(room.winner().is_none());
    }

    #[test]
    fn test_join_assigns_slots_in_order() {
        let mut room = Room::new();

        assert_eq!(room.join(1, Some("L")), Some(Side::Left));
        assert_eq!(room.phase(), RoomPhase::Filling);
        assert_eq!(room.join(2, Some("R")), Some(Side::Right));
        assert_eq!(room.phase(), RoomPhase::Active);

        let left = room.player(Side::Left).unwrap();
        assert_eq!(left.id, 1);
        assert_eq!(left.name, "L");
        assert_eq!(left.y, 50.0);
        assert_eq!(room.player(Side::Right).unwrap().y, 50.0);
    }

    #[test]
    fn test_third_join_is_ignored() {
        let mut room = full_room();

        assert_eq!(room.join(3, Some("Late")), None);
        assert_eq!(room.player_count(), 2);
        assert!(!room.contains(3));
    }

    #[test]
    fn test_double_join_is_ignored() {
        let mut room = Room::new();
        room.join(1, Some("L"));

        assert_eq!(room.join(1, Some("L again")), None);
        assert_eq!(room.player_count(), 1);
    }

    #[test]
    fn test_display_name_rules() {
        let mut room = Room::new();
        room.join(1, None);
        room.join(2, Some("   "));
        assert_eq!(room.player(Side::Left).unwrap().name, DEFAULT_PLAYER_NAME);
        assert_eq!(room.player(Side::Right).unwrap().name, DEFAULT_PLAYER_NAME);

        let long = "x".repeat(100);
        let player = Player::new(3, Some(&long));
        assert_eq!(player.name.chars().count(), MAX_NAME_LEN);

        let player = Player::new(4, Some("  Ada  "));
        assert_eq!(player.name, "Ada");
    }

    #[test]
    fn test_move_paddle_clamps() {
        let mut room = full_room();

        assert!(room.move_paddle(1, 130.0));
        assert_eq!(room.player(Side::Left).unwrap().y, 100.0);
        assert!(room.move_paddle(2, -5.0));
        assert_eq!(room.player(Side::Right).unwrap().y, 0.0);
        assert!(room.move_paddle(2, 33.0));
        assert_eq!(room.player(Side::Right).unwrap().y, 33.0);
    }

    #[test]
    fn test_move_paddle_rejects_strangers_and_nan() {
        let mut room = full_room();

        assert!(!room.move_paddle(9, 10.0));
        assert!(!room.move_paddle(1, f32::NAN));
        assert_eq!(room.player(Side::Left).unwrap().y, 50.0);
    }

    #[test]
    fn test_first_tick_moves_ball() {
        let mut room = full_room();

        let report = room.advance(&GameRules::default(), &mut rng());

        assert_eq!(report, TickReport::Stepped(StepOutcome::Moved));
        assert_approx_eq!(room.ball.x, 50.5);
        assert_approx_eq!(room.ball.y, 50.5);
        assert_eq!(room.score, Score::default());
        assert_eq!(room.tick(), 1);
    }

    #[test]
    fn test_empty_room_stays_static() {
        let mut room = Room::new();

        for _ in 0..10 {
            assert_eq!(room.advance(&GameRules::default(), &mut rng()), TickReport::Idle);
        }
        assert_eq!(room.ball, Ball::kickoff());
        assert_eq!(room.idle_ticks(), 10);
    }

    #[test]
    fn test_idle_counter_resets_on_join() {
        let mut room = Room::new();
        room.advance(&GameRules::default(), &mut rng());
        room.join(1, None);
        room.advance(&GameRules::default(), &mut rng());
        assert_eq!(room.idle_ticks(), 0);
    }

    #[test]
    fn test_winning_point_finishes_match() {
        let rules = GameRules::default();
        let mut room = full_room();
        room.score = Score { left: 4, right: 2 };
        room.ball = Ball {
            x: 98.0,
            y: 90.0,
            vx: 0.5,
            vy: 0.0,
        };

        let report = room.advance(&rules, &mut rng());

        assert_eq!(report, TickReport::Finished(Side::Left));
        assert_eq!(room.phase(), RoomPhase::Finished);
        assert_eq!(room.score, Score { left: 5, right: 2 });
        assert_eq!(room.winner().unwrap().name, "L");
        assert_eq!(room.snapshot("g1").winner.as_deref(), Some("L"));
    }

    #[test]
    fn test_finished_room_is_frozen() {
        let rules = GameRules::default();
        let mut room = full_room();
        room.score = Score { left: 5, right: 0 };

        assert_eq!(room.advance(&rules, &mut rng()), TickReport::Finished(Side::Left));
        let ball = room.ball;

        for _ in 0..30 {
            assert_eq!(room.advance(&rules, &mut rng()), TickReport::Suspended);
        }
        assert_eq!(room.ball, ball);
        assert_eq!(room.score, Score { left: 5, right: 0 });
        assert_eq!(room.winner().unwrap().side, Side::Left);
    }

    #[test]
    fn test_winner_label_for_empty_slot() {
        let rules = GameRules::default();
        let mut room = full_room();
        room.remove(2);
        room.score = Score { left: 0, right: 5 };

        room.advance(&rules, &mut rng());

        assert_eq!(room.winner().unwrap().name, "Right");
    }

    #[test]
    fn test_restart_resets_match() {
        let rules = GameRules::default();
        let mut room = full_room();
        room.score = Score { left: 5, right: 1 };
        room.advance(&rules, &mut rng());
        assert_eq!(room.phase(), RoomPhase::Finished);

        room.restart(&rules, &mut rng());

        assert_eq!(room.phase(), RoomPhase::Active);
        assert!(room.winner().is_none());
        assert_eq!(room.score, Score::default());
        assert_eq!(room.ball.x, 50.0);
        assert_eq!(room.ball.y, 50.0);
        assert_eq!(room.ball.vx.abs(), 0.5);
    }

    #[test]
    fn test_remove_keeps_other_player() {
        let mut room = full_room();

        assert_eq!(room.remove(1), Some(Side::Left));
        assert_eq!(room.remove(1), None);
        assert_eq!(room.phase(), RoomPhase::Filling);
        assert_eq!(room.player(Side::Right).unwrap().id, 2);

        // The next joiner takes the free left slot.
        assert_eq!(room.join(3, Some("New")), Some(Side::Left));
    }

    #[test]
    fn test_snapshot_lists_left_first() {
        let mut room = Room::new();
        room.join(1, Some("L"));
        room.join(2, Some("R"));
        room.remove(1);
        room.join(3, Some("N"));

        let snapshot = room.snapshot("g1");
        assert_eq!(snapshot.room, "g1");
        let ids: Vec<_> = snapshot.players.iter().map(|p| (p.id, p.side)).collect();
        assert_eq!(ids, vec![(3, Side::Left), (2, Side::Right)]);
        assert_eq!(snapshot.ball, BallView { x: 50.0, y: 50.0 });
        assert!(snapshot.winner.is_none());
    }
}
