//! Server network layer: WebSocket sessions feeding the game loop
//!
//! Every connection gets a reader and a writer task. Readers decode frames
//! into intents and push them onto a single event channel; the server loop
//! owns the registry and the sessions and is the only place state changes.
//! It alternates between applying events and running scheduled ticks, so an
//! intent is never applied in the middle of a tick.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::gateway::{encode, Intent, SessionGateway};
use crate::registry::RoomRegistry;
use crate::scheduler::TickScheduler;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientMessage, Codec, ServerMessage, SessionId};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

/// Frames queued per session before further snapshots are dropped.
const OUTBOUND_QUEUE: usize = 64;

/// Messages sent from connection tasks to the server loop
#[derive(Debug)]
pub enum ServerEvent {
    Connected {
        addr: SocketAddr,
        outbound: mpsc::Sender<Message>,
        /// Receives the session id, or `None` if the server is full.
        reply: oneshot::Sender<Option<SessionId>>,
    },
    Frame {
        session_id: SessionId,
        codec: Codec,
        message: ClientMessage,
    },
    Closed {
        session_id: SessionId,
    },
    Shutdown,
}

/// Cloneable handle used to stop a running server.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    events: mpsc::UnboundedSender<ServerEvent>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        if self.events.send(ServerEvent::Shutdown).is_err() {
            debug!("Server loop already stopped");
        }
    }
}

/// Main server coordinating sessions and simulation
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    registry: RoomRegistry,
    gateway: SessionGateway,
    scheduler: TickScheduler,

    events_tx: mpsc::UnboundedSender<ServerEvent>,
    events_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let addr = config.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on ws://{}", local_addr);

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            registry: RoomRegistry::new(config.rules()),
            gateway: SessionGateway::new(config.max_clients),
            scheduler: TickScheduler::new(config.tick_rate)
                .with_room_idle_timeout(config.room_idle_timeout()),
            events_tx,
            events_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            events: self.events_tx.clone(),
        }
    }

    /// Spawns the task accepting new connections
    fn spawn_acceptor(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            loop {
                let accepted = tokio::select! {
                    accepted = listener.accept() => accepted,
                    _ = events.closed() => break,
                };

                match accepted {
                    Ok((stream, addr)) => {
                        let events = events.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, events).await {
                                warn!("Connection from {} ended with error: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Connected {
                addr,
                outbound,
                reply,
            } => {
                let session_id = self.gateway.connect(addr, outbound);
                if session_id.is_none() {
                    info!("Rejected connection from {}: server full", addr);
                }
                // The connection task may be gone already; free its slot.
                if let Err(Some(session_id)) = reply.send(session_id) {
                    debug!("Session {} vanished before registration", session_id);
                    self.gateway
                        .apply(&mut self.registry, session_id, Intent::Disconnect);
                }
            }
            ServerEvent::Frame {
                session_id,
                codec,
                message,
            } => {
                self.gateway.touch(session_id, codec);
                self.gateway
                    .apply(&mut self.registry, session_id, Intent::from(message));
            }
            ServerEvent::Closed { session_id } => {
                self.gateway
                    .apply(&mut self.registry, session_id, Intent::Disconnect);
            }
            ServerEvent::Shutdown => {}
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(mut self) -> Result<(), ServerError> {
        self.spawn_acceptor();

        let mut ticker = self.scheduler.interval();
        info!(
            "Server started: {} Hz, first to {} points",
            (1.0 / self.scheduler.period().as_secs_f64()).round(),
            self.registry.rules().win_score
        );

        loop {
            tokio::select! {
                event = self.events_rx.recv() => {
                    match event {
                        Some(ServerEvent::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                        Some(event) => self.handle_event(event),
                    }
                },

                _ = ticker.tick() => {
                    let snapshots = self.scheduler.run_tick(&mut self.registry);
                    self.gateway.broadcast(snapshots);
                },
            }
        }

        Ok(())
    }
}

/// Decodes an inbound frame. Control frames yield `None`.
fn decode_frame(frame: &Message) -> Result<Option<(Codec, ClientMessage)>, ServerError> {
    match frame {
        Message::Text(text) => Ok(Some((Codec::Json, Codec::decode_text(text)?))),
        Message::Binary(bytes) => Ok(Some((Codec::Bincode, Codec::decode_binary(bytes)?))),
        _ => Ok(None),
    }
}

/// Runs one WebSocket connection until either side closes it
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    events: mpsc::UnboundedSender<ServerEvent>,
) -> Result<(), ServerError> {
    let socket = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut frames) = socket.split();

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);
    let (reply_tx, reply_rx) = oneshot::channel();
    events
        .send(ServerEvent::Connected {
            addr,
            outbound: outbound_tx,
            reply: reply_tx,
        })
        .map_err(|_| ServerError::LoopClosed)?;

    let Some(session_id) = reply_rx.await.map_err(|_| ServerError::LoopClosed)? else {
        let rejected = ServerMessage::Rejected {
            reason: "server full".to_string(),
        };
        if let Some(frame) = encode(Codec::Json, &rejected) {
            sink.send(frame).await?;
        }
        sink.send(Message::Close(None)).await?;
        return Ok(());
    };

    // The writer stops once the session, and with it the last sender, is dropped.
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = frames.next().await {
        let frame = match frame {
            Ok(Message::Close(_)) => break,
            Ok(frame) => frame,
            Err(e) => {
                debug!("Session {} read error: {}", session_id, e);
                break;
            }
        };

        match decode_frame(&frame) {
            Ok(Some((codec, message))) => {
                let event = ServerEvent::Frame {
                    session_id,
                    codec,
                    message,
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring frame from session {}: {}", session_id, e),
        }
    }

    let _ = events.send(ServerEvent::Closed { session_id });
    if let Err(e) = writer.await {
        error!("Writer task of session {} panicked: {}", session_id, e);
    }
    Ok(())
}
