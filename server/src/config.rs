//! Command line and environment configuration of the server.

use clap::Parser;
use shared::{GameRules, TICK_RATE, WIN_SCORE};
use std::time::Duration;

/// Authoritative multiplayer Pong server
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct ServerConfig {
    /// IP address to bind to
    #[clap(short = 'H', long, env = "PONG_HOST", default_value = "0.0.0.0")]
    pub host: String,
    /// Port to listen on
    #[clap(short, long, env = "PONG_PORT", default_value = "4000")]
    pub port: u16,
    /// Simulation ticks per second
    #[clap(
        short,
        long,
        env = "PONG_TICK_RATE",
        default_value_t = TICK_RATE,
        value_parser = clap::value_parser!(u32).range(1..=1000)
    )]
    pub tick_rate: u32,
    /// Maximum number of concurrent sessions
    #[clap(short, long, env = "PONG_MAX_CLIENTS", default_value = "64")]
    pub max_clients: usize,
    /// Points needed to win a match
    #[clap(
        short,
        long,
        env = "PONG_WIN_SCORE",
        default_value_t = WIN_SCORE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub win_score: u32,
    /// Drop rooms that stayed empty for this many seconds (rooms are kept forever if unset)
    #[clap(long, env = "PONG_ROOM_IDLE_SECS")]
    pub room_idle_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            tick_rate: TICK_RATE,
            max_clients: 64,
            win_score: WIN_SCORE,
            room_idle_secs: None,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn rules(&self) -> GameRules {
        GameRules::with_win_score(self.win_score)
    }

    pub fn room_idle_timeout(&self) -> Option<Duration> {
        self.room_idle_secs.map(Duration::from_secs)
    }
}
