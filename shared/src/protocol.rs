//! Wire messages exchanged over a session and the codecs that carry them.
//!
//! Text frames carry JSON, binary frames carry bincode. Both encodings use the
//! same externally tagged message enums, e.g. `{"join":{"room":"g1","name":"L"}}`.

use crate::physics::{Score, Side};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Server-assigned identifier of a connected session.
pub type SessionId = u32;

/// Intents sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        room: String,
        #[serde(default)]
        name: Option<String>,
    },
    Move {
        room: String,
        y: f32,
    },
    Restart {
        room: String,
    },
}

/// Messages pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome { session_id: SessionId },
    Joined { room: String, side: Side },
    State(Snapshot),
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: SessionId,
    pub y: f32,
    pub name: String,
    pub side: Side,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallView {
    pub x: f32,
    pub y: f32,
}

/// Complete externally visible state of one room at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub room: String,
    pub tick: u64,
    /// Seated players, left slot first.
    pub players: Vec<PlayerView>,
    pub ball: BallView,
    pub score: Score,
    pub winner: Option<String>,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("json codec: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bincode codec: {0}")]
    Bincode(#[from] bincode::Error),
}

/// An encoded message, ready to be written as a WebSocket frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedFrame {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Codec {
    #[default]
    Json,
    Bincode,
}

impl Codec {
    pub fn encode<T: Serialize>(self, value: &T) -> Result<EncodedFrame, CodecError> {
        match self {
            Codec::Json => Ok(EncodedFrame::Text(serde_json::to_string(value)?)),
            Codec::Bincode => Ok(EncodedFrame::Binary(bincode::serialize(value)?)),
        }
    }

    pub fn decode_text<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn decode_binary<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Decodes a frame with the codec matching its kind.
    pub fn decode<T: DeserializeOwned>(frame: &EncodedFrame) -> Result<T, CodecError> {
        match frame {
            EncodedFrame::Text(text) => Self::decode_text(text),
            EncodedFrame::Binary(bytes) => Self::decode_binary(bytes),
        }
    }
}
