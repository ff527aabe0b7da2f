//! Ball integration and collision resolution for a single tick.
//!
//! These are plain functions over plain data: the server runs them once per
//! tick and per room, and a client may run the same code to predict motion
//! between snapshots.

use crate::{GameRules, COURT_CENTER, COURT_MAX, COURT_MIN};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Positional role of a player within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Label used in place of a player name when the slot is empty.
    pub fn label(self) -> &'static str {
        match self {
            Side::Left => "Left",
            Side::Right => "Right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Ball {
    /// Ball of a freshly created room: centered, heading down-right.
    pub fn kickoff() -> Self {
        Self {
            x: COURT_CENTER,
            y: COURT_CENTER,
            vx: crate::BALL_SPEED,
            vy: crate::BALL_SPEED,
        }
    }

    /// Centered ball with a random direction.
    ///
    /// `vx` is `±speed` with equal probability, `vy` is uniform in
    /// `[-speed, speed]`.
    pub fn serve<R: Rng + ?Sized>(rng: &mut R, speed: f32) -> Self {
        let vx = if rng.gen_bool(0.5) { speed } else { -speed };
        let vy = rng.gen_range(-speed..=speed);
        Self {
            x: COURT_CENTER,
            y: COURT_CENTER,
            vx,
            vy,
        }
    }

    /// Moves the ball by one tick of its velocity.
    pub fn integrate(&mut self) {
        self.x += self.vx;
        self.y += self.vy;
    }

    /// Reflects off the top and bottom walls. The ball may sit slightly past
    /// the wall for one tick; its position is not corrected.
    pub fn bounce_walls(&mut self) {
        if self.y <= COURT_MIN || self.y >= COURT_MAX {
            self.vy = -self.vy;
        }
    }
}

impl Default for Ball {
    fn default() -> Self {
        Self::kickoff()
    }
}

/// Points per side of one match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub left: u32,
    pub right: u32,
}

impl Score {
    /// Awards one point to `side`.
    pub fn credit(&mut self, side: Side) {
        match side {
            Side::Left => self.left += 1,
            Side::Right => self.right += 1,
        }
    }

    /// Points scored by `side`.
    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Side that has reached `threshold`, left first.
    pub fn leader(&self, threshold: u32) -> Option<Side> {
        if self.left >= threshold {
            Some(Side::Left)
        } else if self.right >= threshold {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// Back to 0-0.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Paddle centers of the seated players. A missing side never collides.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Paddles {
    pub left: Option<f32>,
    pub right: Option<f32>,
}

impl Paddles {
    /// Paddle center on `side`, if a player sits there.
    pub fn get(&self, side: Side) -> Option<f32> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Ball travelled without reaching a guarded baseline.
    Moved,
    /// The paddle on this side returned the ball.
    Returned(Side),
    /// This side earned a point and the ball was served again.
    Scored(Side),
}

/// Advances the ball by one tick.
///
/// The left zone is evaluated first; the right zone is only checked when the
/// left one did not fire, so a single tick scores at most one point. Zones
/// ignore the direction of travel: a ball inside a zone is returned or
/// conceded on every tick it spends there.
pub fn step<R: Rng + ?Sized>(
    ball: &mut Ball,
    score: &mut Score,
    paddles: Paddles,
    rules: &GameRules,
    rng: &mut R,
) -> StepOutcome {
    ball.integrate();
    ball.bounce_walls();

    let zone = if ball.x <= COURT_MIN + rules.paddle_zone {
        Some(Side::Left)
    } else if ball.x >= COURT_MAX - rules.paddle_zone {
        Some(Side::Right)
    } else {
        None
    };

    let Some(side) = zone else {
        return StepOutcome::Moved;
    };
    let Some(paddle_y) = paddles.get(side) else {
        return StepOutcome::Moved;
    };

    if ball.y >= paddle_y - rules.paddle_reach && ball.y <= paddle_y + rules.paddle_reach {
        ball.vx = -ball.vx;
        StepOutcome::Returned(side)
    } else {
        let scorer = side.opponent();
        score.credit(scorer);
        *ball = Ball::serve(rng, rules.ball_speed);
        StepOutcome::Scored(scorer)
    }
}
