//! Per-connection handler: event decoding and outbound delivery.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register with the coordinator → lobby listing is queued
//!   2. Spawn a writer task draining the connection's outbound channel
//!   3. Loop: receive frames → decode → hand to the coordinator
//!   4. On close: disconnect (leave the room) exactly once

use std::sync::Arc;

use bingo_protocol::{ClientEvent, Codec, ServerEvent};
use bingo_session::event_channel;
use bingo_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{BingoError, Coordinator};

/// Drop guard that disconnects the connection when the handler exits.
///
/// Covers a panicking handler. Since `Drop` is synchronous, it spawns a
/// fire-and-forget task; after a normal exit that task finds the session
/// already gone and does nothing.
struct DisconnectGuard {
    connection_id: ConnectionId,
    coordinator: Arc<Coordinator>,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let connection_id = self.connection_id;
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            coordinator.disconnect(connection_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    coordinator: Arc<Coordinator>,
    codec: Arc<C>,
) -> Result<(), BingoError> {
    let connection_id = conn.id();
    tracing::debug!(%connection_id, "handling new connection");

    let (tx, rx) = event_channel();
    coordinator.connect(connection_id, tx).await?;
    let _guard = DisconnectGuard {
        connection_id,
        coordinator: Arc::clone(&coordinator),
    };

    let writer = tokio::spawn(write_events(conn.clone(), rx, Arc::clone(&codec)));

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%connection_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%connection_id, error = %e, "recv error");
                break;
            }
        };

        match codec.decode::<ClientEvent>(&data) {
            Ok(event) => {
                tracing::debug!(%connection_id, event = event.name(), "client event");
                coordinator.handle(connection_id, event).await;
            }
            Err(e) => {
                tracing::warn!(%connection_id, error = %e, "undecodable frame");
                coordinator
                    .send_to(connection_id, ServerEvent::error(e.to_string()))
                    .await;
            }
        }
    }

    coordinator.disconnect(connection_id).await;
    writer.abort();
    Ok(())
}

/// Drains a connection's outbound channel onto the socket, in order.
///
/// Ends when every sender is gone or the socket stops accepting frames.
async fn write_events<C: Codec>(
    conn: WebSocketConnection,
    mut rx: UnboundedReceiver<ServerEvent>,
    codec: Arc<C>,
) {
    let connection_id = conn.id();
    while let Some(event) = rx.recv().await {
        let text = match codec.encode(&event) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(%connection_id, event = event.name(), error = %e, "encode failed");
                continue;
            }
        };
        if let Err(e) = conn.send(&text).await {
            tracing::debug!(%connection_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}
