//! Server-pushed events: the wire enums, the reconciler that folds them
//! into the stores, and the WebSocket connection that feeds it.

pub mod events;
pub mod reconcile;

pub use events::{ClientEvent, ServerEvent};
pub use reconcile::{EchoRegistry, Reconciler};

use futures_util::{SinkExt, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

const RECONNECT_FLOOR: Duration = Duration::from_secs(1);
const RECONNECT_CEILING: Duration = Duration::from_secs(30);

/// Handle to the background socket task. Dropping it closes the
/// connection and stops reconnecting.
pub struct SocketHandle {
    outbound: mpsc::UnboundedSender<ClientEvent>,
}

impl SocketHandle {
    /// Queues an outbound event. Returns false once the background task
    /// has stopped.
    pub fn send(&self, event: ClientEvent) -> bool {
        self.outbound.send(event).is_ok()
    }
}

/// Spawns the socket task: connect, feed inbound events to the
/// reconciler, drain the outbound queue, and reconnect with exponential
/// backoff on any failure. Room membership is replayed after each
/// reconnect so a dropped connection does not silently unsubscribe the
/// open views.
pub fn spawn(url: impl Into<String>, reconciler: Arc<Reconciler>) -> SocketHandle {
    let (outbound, rx) = mpsc::unbounded_channel();
    let url = url.into();
    tokio::spawn(run(url, reconciler, rx));
    SocketHandle { outbound }
}

async fn run(
    url: String,
    reconciler: Arc<Reconciler>,
    mut rx: mpsc::UnboundedReceiver<ClientEvent>,
) {
    let mut backoff = RECONNECT_FLOOR;
    let mut rooms: HashSet<String> = HashSet::new();

    loop {
        let stream = match connect_async(&url).await {
            Ok((stream, _)) => {
                log::info!("socket connected: {}", url);
                backoff = RECONNECT_FLOOR;
                stream
            }
            Err(error) => {
                log::warn!("socket connect failed, retrying in {:?}: {}", backoff, error);
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(RECONNECT_CEILING);
                continue;
            }
        };

        let (mut sink, mut source) = stream.split();

        let mut resubscribed = true;
        for room in &rooms {
            let event = ClientEvent::JoinRoom { room: room.clone() };
            if send_event(&mut sink, &event).await.is_err() {
                resubscribed = false;
                break;
            }
        }
        if !resubscribed {
            continue;
        }

        loop {
            tokio::select! {
                outgoing = rx.recv() => {
                    let Some(event) = outgoing else {
                        // Handle dropped; close and stop for good
                        let _ = sink.close().await;
                        return;
                    };
                    track_rooms(&mut rooms, &event);
                    if send_event(&mut sink, &event).await.is_err() {
                        break;
                    }
                }
                incoming = source.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(text))) => {
                            if let Some(event) = decode_event(&text) {
                                reconciler.apply(event);
                            }
                        }
                        Some(Ok(WsMessage::Ping(payload))) => {
                            if sink.send(WsMessage::Pong(payload)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(WsMessage::Close(_))) | None => {
                            log::info!("socket closed by server");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(error)) => {
                            log::warn!("socket read error: {}", error);
                            break;
                        }
                    }
                }
            }
        }

        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(RECONNECT_CEILING);
    }
}

async fn send_event<S>(sink: &mut S, event: &ClientEvent) -> Result<(), ()>
where
    S: SinkExt<WsMessage> + Unpin,
{
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(error) => {
            log::error!("unencodable outbound event: {}", error);
            return Ok(());
        }
    };
    sink.send(WsMessage::Text(text)).await.map_err(|_| {
        log::warn!("socket write failed");
    })
}

fn track_rooms(rooms: &mut HashSet<String>, event: &ClientEvent) {
    match event {
        ClientEvent::JoinRoom { room } => {
            rooms.insert(room.clone());
        }
        ClientEvent::LeaveRoom { room } => {
            rooms.remove(room);
        }
    }
}

/// Parses an inbound frame, tolerating events this build does not know.
fn decode_event(text: &str) -> Option<ServerEvent> {
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(error) => {
            log::debug!("ignoring unrecognized socket frame: {}", error);
            None
        }
    }
}
