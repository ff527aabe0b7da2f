use shared::CodecError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors raised by the transport around the game loop.
///
/// None of these originate from game state: invalid intents are ignored
/// rather than reported.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("malformed frame: {0}")]
    Codec(#[from] CodecError),
    #[error("server loop is no longer running")]
    LoopClosed,
}
