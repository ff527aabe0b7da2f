//! Boundary between the transport and the game state.
//!
//! Inbound frames become [`Intent`]s which are applied to the registry one at
//! a time, each running to completion. Outbound snapshots are encoded once
//! per codec and queued on every subscribed session.

use crate::registry::RoomRegistry;
use crate::session::{Delivery, SessionManager};
use log::{debug, warn};
use shared::{ClientMessage, Codec, EncodedFrame, ServerMessage, SessionId, Snapshot};
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// A request from a session to affect room state.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Join { room: String, name: Option<String> },
    Move { room: String, y: f32 },
    Restart { room: String },
    /// The transport lost the connection.
    Disconnect,
}

impl From<ClientMessage> for Intent {
    fn from(message: ClientMessage) -> Self {
        match message {
            ClientMessage::Join { room, name } => Intent::Join { room, name },
            ClientMessage::Move { room, y } => Intent::Move { room, y },
            ClientMessage::Restart { room } => Intent::Restart { room },
        }
    }
}

/// Encodes `message` as a WebSocket frame.
pub fn encode(codec: Codec, message: &ServerMessage) -> Option<Message> {
    match codec.encode(message) {
        Ok(EncodedFrame::Text(text)) => Some(Message::Text(text)),
        Ok(EncodedFrame::Binary(bytes)) => Some(Message::Binary(bytes)),
        Err(e) => {
            warn!("Failed to encode {:?} message: {}", codec, e);
            None
        }
    }
}

pub struct SessionGateway {
    sessions: SessionManager,
}

impl SessionGateway {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: SessionManager::new(max_sessions),
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Registers a connection and greets it. Returns `None` if the server is full.
    pub fn connect(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::Sender<Message>,
    ) -> Option<SessionId> {
        let session_id = self.sessions.add_session(addr, outbound)?;
        self.send(session_id, &ServerMessage::Welcome { session_id });
        Some(session_id)
    }

    /// Records that `session_id` just spoke `codec`.
    pub fn touch(&mut self, session_id: SessionId, codec: Codec) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.touch(codec);
        }
    }

    /// Applies one intent. Intents naming unknown rooms or sessions, joins to
    /// full rooms and moves by unseated sessions change nothing.
    pub fn apply(&mut self, registry: &mut RoomRegistry, session_id: SessionId, intent: Intent) {
        debug!("Session {} intent {:?}", session_id, intent);

        match intent {
            Intent::Join { room, name } => self.join(registry, session_id, room, name),
            Intent::Move { room, y } => {
                registry.move_paddle(&room, session_id, y);
            }
            Intent::Restart { room } => {
                registry.restart(&room);
            }
            Intent::Disconnect => {
                registry.disconnect(session_id);
                self.sessions.remove_session(session_id);
            }
        }
    }

    fn join(
        &mut self,
        registry: &mut RoomRegistry,
        session_id: SessionId,
        room: String,
        name: Option<String>,
    ) {
        let Some(session) = self.sessions.get(session_id) else {
            return;
        };
        let previous = session.room.clone();

        let Some(side) = registry.join(&room, session_id, name.as_deref()) else {
            return;
        };

        // A session plays in one room at a time; the old seat is only given
        // up once the new room has taken it.
        if let Some(previous) = previous.filter(|previous| *previous != room) {
            registry.leave(&previous, session_id);
        }
        self.sessions.subscribe(session_id, Some(room.clone()));
        self.send(session_id, &ServerMessage::Joined { room, side });
    }

    fn send(&self, session_id: SessionId, message: &ServerMessage) {
        let Some(session) = self.sessions.get(session_id) else {
            return;
        };
        if let Some(frame) = encode(session.codec, message) {
            session.deliver(frame);
        }
    }

    /// Queues each snapshot on the sessions subscribed to its room. Returns
    /// the number of frames queued.
    pub fn broadcast(&self, snapshots: Vec<Snapshot>) -> usize {
        let mut queued = 0;

        for snapshot in snapshots {
            let room = snapshot.room.clone();
            let mut subscribers = self.sessions.subscribers(&room).peekable();
            if subscribers.peek().is_none() {
                continue;
            }

            let message = ServerMessage::State(snapshot);
            let mut json = None;
            let mut binary = None;

            for session in subscribers {
                let cached = match session.codec {
                    Codec::Json => &mut json,
                    Codec::Bincode => &mut binary,
                };
                if cached.is_none() {
                    *cached = encode(session.codec, &message);
                }
                let Some(frame) = cached.clone() else {
                    continue;
                };

                match session.deliver(frame) {
                    Delivery::Queued => queued += 1,
                    Delivery::Dropped => {}
                    Delivery::Closed => debug!("Session {} writer is gone", session.id),
                }
            }
        }

        queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{GameRules, Side};

    fn test_addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    fn registry() -> RoomRegistry {
        RoomRegistry::seeded(GameRules::default(), 5)
    }

    fn decode(message: Message) -> ServerMessage {
        match message {
            Message::Text(text) => Codec::decode_text(&text).unwrap(),
            Message::Binary(bytes) => Codec::decode_binary(&bytes).unwrap(),
            other => panic!("Unexpected frame {:?}", other),
        }
    }

    fn connect(gateway: &mut SessionGateway) -> (SessionId, mpsc::Receiver<Message>) {
        let (tx, mut rx) = mpsc::channel(16);
        let id = gateway.connect(test_addr(), tx).unwrap();
        match decode(rx.try_recv().unwrap()) {
            ServerMessage::Welcome { session_id } => assert_eq!(session_id, id),
            other => panic!("Expected welcome, got {:?}", other),
        }
        (id, rx)
    }

    fn join(room: &str, name: &str) -> Intent {
        Intent::Join {
            room: room.to_string(),
            name: Some(name.to_string()),
        }
    }

    #[test]
    fn test_intent_from_client_message() {
        let intent = Intent::from(ClientMessage::Move {
            room: "g1".into(),
            y: 3.0,
        });
        assert_eq!(
            intent,
            Intent::Move {
                room: "g1".into(),
                y: 3.0
            }
        );
    }

    #[test]
    fn test_connect_when_full() {
        let mut gateway = SessionGateway::new(1);
        let (_id, _rx) = connect(&mut gateway);

        let (tx, _rx2) = mpsc::channel(4);
        assert!(gateway.connect(test_addr(), tx).is_none());
    }

    #[test]
    fn test_join_subscribes_and_confirms() {
        let mut gateway = SessionGateway::new(8);
        let mut registry = registry();
        let (id, mut rx) = connect(&mut gateway);

        gateway.apply(&mut registry, id, join("g1", "L"));

        assert_eq!(
            decode(rx.try_recv().unwrap()),
            ServerMessage::Joined {
                room: "g1".into(),
                side: Side::Left
            }
        );
        assert_eq!(gateway.sessions().get(id).unwrap().room.as_deref(), Some("g1"));
    }

    #[test]
    fn test_join_full_room_is_silent() {
        let mut gateway = SessionGateway::new(8);
        let mut registry = registry();
        let (a, _rx_a) = connect(&mut gateway);
        let (b, _rx_b) = connect(&mut gateway);
        let (c, mut rx_c) = connect(&mut gateway);

        gateway.apply(&mut registry, a, join("g1", "A"));
        gateway.apply(&mut registry, b, join("g1", "B"));
        gateway.apply(&mut registry, c, join("g1", "C"));

        assert!(rx_c.try_recv().is_err());
        assert!(gateway.sessions().get(c).unwrap().room.is_none());
        assert_eq!(registry.get("g1").unwrap().player_count(), 2);
    }

    #[test]
    fn test_switching_rooms_leaves_previous() {
        let mut gateway = SessionGateway::new(8);
        let mut registry = registry();
        let (id, _rx) = connect(&mut gateway);

        gateway.apply(&mut registry, id, join("g1", "A"));
        gateway.apply(&mut registry, id, join("g2", "A"));

        assert_eq!(registry.get("g1").unwrap().player_count(), 0);
        assert!(registry.get("g2").unwrap().contains(id));
        assert_eq!(gateway.sessions().get(id).unwrap().room.as_deref(), Some("g2"));
    }

    #[test]
    fn test_join_full_room_keeps_current_seat() {
        let mut gateway = SessionGateway::new(8);
        let mut registry = registry();
        let (a, _rx_a) = connect(&mut gateway);
        let (b, _rx_b) = connect(&mut gateway);
        let (c, mut rx_c) = connect(&mut gateway);

        gateway.apply(&mut registry, a, join("full", "A"));
        gateway.apply(&mut registry, b, join("full", "B"));
        gateway.apply(&mut registry, c, join("mine", "C"));
        rx_c.try_recv().unwrap();

        gateway.apply(&mut registry, c, join("full", "C"));

        assert!(rx_c.try_recv().is_err());
        assert!(registry.get("mine").unwrap().contains(c));
        assert!(!registry.get("full").unwrap().contains(c));
        assert_eq!(gateway.sessions().get(c).unwrap().room.as_deref(), Some("mine"));

        let snapshots = registry
            .tick_all()
            .into_iter()
            .filter(|snapshot| snapshot.room == "mine")
            .collect();
        assert_eq!(gateway.broadcast(snapshots), 1);
        assert!(matches!(decode(rx_c.try_recv().unwrap()), ServerMessage::State(_)));
    }

    #[test]
    fn test_move_and_restart() {
        let mut gateway = SessionGateway::new(8);
        let mut registry = registry();
        let (id, _rx) = connect(&mut gateway);
        gateway.apply(&mut registry, id, join("g1", "A"));

        gateway.apply(
            &mut registry,
            id,
            Intent::Move {
                room: "g1".into(),
                y: -20.0,
            },
        );
        assert_eq!(registry.get("g1").unwrap().player(Side::Left).unwrap().y, 0.0);

        gateway.apply(
            &mut registry,
            id,
            Intent::Restart {
                room: "missing".into(),
            },
        );
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_oversized_move_is_clamped() {
        let mut gateway = SessionGateway::new(8);
        let mut registry = registry();
        let (id, _rx) = connect(&mut gateway);
        gateway.apply(&mut registry, id, join("g1", "A"));

        let message: ClientMessage = Codec::decode_text(r#"{"move":{"room":"g1","y":1e39}}"#).unwrap();
        gateway.apply(&mut registry, id, Intent::from(message));
        assert_eq!(registry.get("g1").unwrap().player(Side::Left).unwrap().y, 100.0);

        let message: ClientMessage = Codec::decode_text(r#"{"move":{"room":"g1","y":-1e39}}"#).unwrap();
        gateway.apply(&mut registry, id, Intent::from(message));
        assert_eq!(registry.get("g1").unwrap().player(Side::Left).unwrap().y, 0.0);
    }

    #[test]
    fn test_disconnect_removes_player_and_session() {
        let mut gateway = SessionGateway::new(8);
        let mut registry = registry();
        let (a, _rx_a) = connect(&mut gateway);
        let (b, _rx_b) = connect(&mut gateway);
        gateway.apply(&mut registry, a, join("g1", "A"));
        gateway.apply(&mut registry, b, join("g1", "B"));

        gateway.apply(&mut registry, a, Intent::Disconnect);
        gateway.apply(&mut registry, a, Intent::Disconnect);

        let room = registry.get("g1").unwrap();
        assert_eq!(room.player_count(), 1);
        assert!(room.contains(b));
        assert!(gateway.sessions().get(a).is_none());
        assert_eq!(gateway.sessions().len(), 1);
    }

    #[test]
    fn test_broadcast_reaches_subscribers_in_their_codec() {
        let mut gateway = SessionGateway::new(8);
        let mut registry = registry();
        let (a, mut rx_a) = connect(&mut gateway);
        let (b, mut rx_b) = connect(&mut gateway);
        let (c, mut rx_c) = connect(&mut gateway);

        gateway.apply(&mut registry, a, join("g1", "A"));
        gateway.touch(b, Codec::Bincode);
        gateway.apply(&mut registry, b, join("g1", "B"));
        gateway.apply(&mut registry, c, join("g2", "C"));
        rx_a.try_recv().unwrap();
        rx_b.try_recv().unwrap();
        rx_c.try_recv().unwrap();

        let snapshots: Vec<_> = registry
            .tick_all()
            .into_iter()
            .filter(|snapshot| snapshot.room == "g1")
            .collect();
        assert_eq!(gateway.broadcast(snapshots), 2);

        let frame_a = rx_a.try_recv().unwrap();
        assert!(frame_a.is_text());
        let frame_b = rx_b.try_recv().unwrap();
        assert!(frame_b.is_binary());

        match (decode(frame_a), decode(frame_b)) {
            (ServerMessage::State(sa), ServerMessage::State(sb)) => {
                assert_eq!(sa, sb);
                assert_eq!(sa.players.len(), 2);
                assert_eq!(sa.room, "g1");
            }
            other => panic!("Expected two states, got {:?}", other),
        }
        assert!(rx_c.try_recv().is_err());
    }
}
