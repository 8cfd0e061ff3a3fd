use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use helio_core::{parse_event, ControlCommand};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use url::Url;

use crate::state::SocketEvent;

/// Flat delay between reconnect attempts; no backoff growth, no ceiling.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Owns the one WebSocket for the whole session. Connects, forwards
/// parsed frames to the session loop, transmits queued commands while the
/// connection is open, and on any close or error reconnects after a flat
/// delay, forever. Returns only when the session loop goes away.
pub async fn socket_loop(
    url: Url,
    events: mpsc::Sender<SocketEvent>,
    mut commands: mpsc::Receiver<ControlCommand>,
) {
    loop {
        // Anything queued while we were down never reaches the wire.
        while let Ok(command) = commands.try_recv() {
            warn!(event = "command_dropped", command = ?command, reason = "disconnected");
        }

        match connect_async(url.clone()).await {
            Err(err) => {
                warn!(event = "connect_error", url = %url, error = %err);
            }
            Ok((mut ws, _)) => {
                if events.send(SocketEvent::Connected).await.is_err() {
                    let _ = ws.close(None).await;
                    return;
                }
                loop {
                    tokio::select! {
                        inbound = ws.next() => match inbound {
                            Some(Ok(Message::Text(text))) => match parse_event(&text) {
                                Ok(Some(event)) => {
                                    if events.send(SocketEvent::Event(event)).await.is_err() {
                                        let _ = ws.close(None).await;
                                        return;
                                    }
                                }
                                Ok(None) => debug!(event = "unknown_frame_type"),
                                Err(err) => warn!(event = "malformed_frame", error = %err),
                            },
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(err)) => {
                                warn!(event = "socket_error", error = %err);
                                break;
                            }
                        },
                        outbound = commands.recv() => match outbound {
                            Some(command) => {
                                if ws.send(Message::Text(command.to_json())).await.is_err() {
                                    break;
                                }
                            }
                            // Session loop is gone; tear the socket down.
                            None => {
                                let _ = ws.close(None).await;
                                return;
                            }
                        },
                    }
                }
                let _ = ws.close(None).await;
                if events.send(SocketEvent::Disconnected).await.is_err() {
                    return;
                }
            }
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
