//! Types and rules shared between the Pong server and its clients.
//!
//! All positions are percentages of the court: `(0, 0)` is the top-left corner
//! and `(100, 100)` the bottom-right one. The left paddle guards `x = 0`, the
//! right paddle guards `x = 100`.

pub mod physics;
pub mod protocol;

pub use physics::{step, Ball, Paddles, Score, Side, StepOutcome};
pub use protocol::{
    BallView, ClientMessage, Codec, CodecError, EncodedFrame, PlayerView, ServerMessage, SessionId,
    Snapshot,
};

pub const COURT_MIN: f32 = 0.0;
pub const COURT_MAX: f32 = 100.0;
pub const COURT_CENTER: f32 = 50.0;

/// Half height of a paddle: the ball is returned when it is within this
/// distance of the paddle center.
pub const PADDLE_REACH: f32 = 10.0;
/// Thickness of the zone in front of each baseline where a paddle is checked.
pub const PADDLE_ZONE: f32 = 2.0;
pub const BALL_SPEED: f32 = 0.5;
pub const WIN_SCORE: u32 = 5;
pub const TICK_RATE: u32 = 60;

pub const DEFAULT_PLAYER_NAME: &str = "Anonymous";
pub const MAX_NAME_LEN: usize = 24;

/// Process-wide match rules.
///
/// Every room of a server plays by the same rules; they are never tuned per
/// room.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameRules {
    /// Points needed to win a match.
    pub win_score: u32,
    pub paddle_reach: f32,
    pub paddle_zone: f32,
    /// Horizontal speed of a served ball, in percent of the court per tick.
    pub ball_speed: f32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            win_score: WIN_SCORE,
            paddle_reach: PADDLE_REACH,
            paddle_zone: PADDLE_ZONE,
            ball_speed: BALL_SPEED,
        }
    }
}

impl GameRules {
    pub fn with_win_score(win_score: u32) -> Self {
        Self {
            win_score,
            ..Self::default()
        }
    }
}

/// Clamps a paddle position to the court, infinities included. Only NaN,
/// which has no position, yields `None`.
pub fn clamp_paddle(y: f32) -> Option<f32> {
    if y.is_nan() {
        None
    } else {
        Some(y.clamp(COURT_MIN, COURT_MAX))
    }
}
