//! Headless client for smoke testing a running server.
//!
//! Joins a room, keeps its paddle on the ball, prints the state once a second
//! and restarts finished matches.

use clap::Parser;
use futures::{SinkExt, StreamExt};
use shared::{ClientMessage, Codec, EncodedFrame, ServerMessage, Side};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server WebSocket URL
    #[clap(short, long, default_value = "ws://127.0.0.1:4000")]
    url: String,
    /// Room to join
    #[clap(short, long, default_value = "game1")]
    room: String,
    /// Display name
    #[clap(short, long, default_value = "Bot")]
    name: String,
    /// Number of snapshots to receive before leaving
    #[clap(short, long, default_value = "600")]
    snapshots: u64,
    /// Speak bincode instead of JSON
    #[clap(short, long)]
    binary: bool,
}

fn frame(codec: Codec, message: &ClientMessage) -> Result<Message, Box<dyn std::error::Error>> {
    Ok(match codec.encode(message)? {
        EncodedFrame::Text(text) => Message::Text(text),
        EncodedFrame::Binary(bytes) => Message::Binary(bytes),
    })
}

fn decode(message: &Message) -> Option<ServerMessage> {
    match message {
        Message::Text(text) => Codec::decode_text(text).ok(),
        Message::Binary(bytes) => Codec::decode_binary(bytes).ok(),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let codec = if args.binary { Codec::Bincode } else { Codec::Json };

    println!("Connecting to {}", args.url);
    let (socket, _) = connect_async(args.url.as_str()).await?;
    let (mut sink, mut stream) = socket.split();

    let join = ClientMessage::Join {
        room: args.room.clone(),
        name: Some(args.name.clone()),
    };
    sink.send(frame(codec, &join)?).await?;

    let mut side: Option<Side> = None;
    let mut received = 0;
    let mut restart_sent = false;

    while let Some(message) = stream.next().await {
        let Some(message) = decode(&message?) else {
            continue;
        };

        match message {
            ServerMessage::Welcome { session_id } => {
                println!("Connected as session {}", session_id);
            }
            ServerMessage::Joined { room, side: seat } => {
                println!("Joined room {} on the {:?} side", room, seat);
                side = Some(seat);
            }
            ServerMessage::Rejected { reason } => {
                println!("Rejected: {}", reason);
                break;
            }
            ServerMessage::State(snapshot) => {
                received += 1;

                if received % 60 == 0 {
                    println!(
                        "tick {}: ball ({:.1}, {:.1}) score {}-{} players {}",
                        snapshot.tick,
                        snapshot.ball.x,
                        snapshot.ball.y,
                        snapshot.score.left,
                        snapshot.score.right,
                        snapshot.players.len()
                    );
                }

                match &snapshot.winner {
                    Some(winner) if !restart_sent => {
                        restart_sent = true;
                        println!("{} wins, restarting", winner);
                        let restart = ClientMessage::Restart {
                            room: args.room.clone(),
                        };
                        sink.send(frame(codec, &restart)?).await?;
                    }
                    Some(_) => {}
                    None => restart_sent = false,
                }

                if snapshot.winner.is_none() && side.is_some() && received % 3 == 0 {
                    let track = ClientMessage::Move {
                        room: args.room.clone(),
                        y: snapshot.ball.y,
                    };
                    sink.send(frame(codec, &track)?).await?;
                }

                if received >= args.snapshots {
                    break;
                }
            }
        }
    }

    sink.send(Message::Close(None)).await?;
    println!("Test client finished after {} snapshots", received);
    Ok(())
}
