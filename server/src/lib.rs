//! # Pong Server Library
//!
//! Authoritative server for two-player Pong matches. The server owns the
//! simulation of every match ("room"), enforces scoring and the win
//! condition, and streams each room's state to its players at a fixed tick
//! rate. Clients only send intents and render what they receive.
//!
//! ## Architecture
//!
//! ### Single-Owner Event Loop
//! One task owns the [`registry::RoomRegistry`] and the session table. It
//! alternates between applying inbound events and running scheduled ticks,
//! and every event runs to completion, so no intent is ever applied halfway
//! through a tick and rooms never need locks.
//!
//! ### WebSocket Sessions
//! Each connection is a WebSocket with a reader task feeding the loop and a
//! writer task draining a bounded per-session queue. Text frames carry JSON,
//! binary frames carry bincode; a session is answered in the encoding it
//! last used.
//!
//! ## Module Organization
//!
//! - `room`: one match, its slots, ball, score and winner
//! - `registry`: room lookup and creation, intent entry points
//! - `scheduler`: fixed-rate tick driver
//! - `session`: connected sessions and room subscriptions
//! - `gateway`: intent dispatch and snapshot fan-out
//! - `network`: listener, connection tasks and the server loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         host: "127.0.0.1".to_string(),
//!         port: 4000,
//!         ..ServerConfig::default()
//!     };
//!
//!     // Runs until a shutdown is requested through `Server::handle`.
//!     Server::bind(&config).await?.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod network;
pub mod registry;
pub mod room;
pub mod scheduler;
pub mod session;
