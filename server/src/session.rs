//! Connected sessions and their room subscriptions
//!
//! This module tracks the server side of every open connection:
//! - Session lifecycle (accept, capacity limit, close)
//! - The room a session is subscribed to, if any
//! - The codec the session speaks and its outbound frame queue
//!
//! Each session owns a bounded queue drained by its connection's writer task.
//! Frames are pushed with `try_send`, so a slow reader only loses its own
//! frames and never holds up the tick.

use log::{debug, info};
use shared::{Codec, SessionId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::Message;

/// Outcome of queueing a frame for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The queue was full; this frame was dropped.
    Dropped,
    /// The writer task is gone.
    Closed,
}

/// A connected session
#[derive(Debug)]
pub struct Session {
    /// Unique session identifier assigned by the server
    pub id: SessionId,
    /// Remote address, for logging
    pub addr: SocketAddr,
    pub connected_at: Instant,
    /// Last time a frame was received from this session
    pub last_seen: Instant,
    /// Room whose snapshots this session receives
    pub room: Option<String>,
    /// Codec of the last frame received; replies use the same one
    pub codec: Codec,
    outbound: mpsc::Sender<Message>,
}

impl Session {
    pub fn new(id: SessionId, addr: SocketAddr, outbound: mpsc::Sender<Message>) -> Self {
        let now = Instant::now();
        Self {
            id,
            addr,
            connected_at: now,
            last_seen: now,
            room: None,
            codec: Codec::default(),
            outbound,
        }
    }

    /// Records activity and the codec the session just used.
    pub fn touch(&mut self, codec: Codec) {
        self.last_seen = Instant::now();
        self.codec = codec;
    }

    /// Queues `message` without waiting.
    ///
    /// A full queue drops the frame for this session only, so a slow reader
    /// never holds up the tick.
    pub fn deliver(&self, message: Message) -> Delivery {
        match self.outbound.try_send(message) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => {
                debug!("Outbound queue of session {} is full, dropping frame", self.id);
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

/// Manages all connected sessions
///
/// Enforces the connection limit and hands out session ids. Ids start at 1
/// and are never reused during the process lifetime.
pub struct SessionManager {
    sessions: HashMap<SessionId, Session>,
    next_session_id: SessionId,
    max_sessions: usize,
}

impl SessionManager {
    /// Creates a manager accepting at most `max_sessions` concurrent sessions.
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            next_session_id: 1,
            max_sessions,
        }
    }

    /// Registers a new connection. Returns `None` if the server is full.
    pub fn add_session(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::Sender<Message>,
    ) -> Option<SessionId> {
        if self.sessions.len() >= self.max_sessions {
            return None;
        }

        let id = self.next_session_id;
        self.next_session_id += 1;

        info!("Session {} connected from {}", id, addr);
        self.sessions.insert(id, Session::new(id, addr, outbound));
        Some(id)
    }

    /// Forgets a session. Dropping it closes its outbound queue, which stops
    /// the writer task.
    pub fn remove_session(&mut self, id: SessionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        info!(
            "Session {} disconnected after {:.1}s",
            id,
            session.connected_at.elapsed().as_secs_f32()
        );
        Some(session)
    }

    /// Looks up a session by id.
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Points the session's subscription at `room`, returning the previous one.
    pub fn subscribe(&mut self, id: SessionId, room: Option<String>) -> Option<String> {
        let session = self.sessions.get_mut(&id)?;
        std::mem::replace(&mut session.room, room)
    }

    /// Sessions subscribed to `room`.
    pub fn subscribers<'a>(&'a self, room: &'a str) -> impl Iterator<Item = &'a Session> + 'a {
        self.sessions
            .values()
            .filter(move |session| session.room.as_deref() == Some(room))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
