use crate::ConnectionHandler;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::WebSocketUpgrade;
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info, warn};

/// Outbound frames buffered per socket before events are dropped
const OUTBOUND_BUFFER: usize = 64;

pub async fn handle_websocket(
    ws: WebSocketUpgrade,
    connection_handler: ConnectionHandler,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| listen(socket, connection_handler))
}

async fn listen(socket: WebSocket, connection_handler: ConnectionHandler) {
    let (ws_sender, ws_receiver) = socket.split();
    let (tx, rx) = tokio::sync::mpsc::channel(OUTBOUND_BUFFER);
    let connection_handler = connection_handler.with_sender(tx);
    let connection_id = connection_handler.connection_id();

    if let Err(e) = connection_handler.connect().await {
        error!(%connection_id, error = %e, "Failed to register connection");
        return;
    }

    let sender_task = handle_outgoing_messages(rx, ws_sender);
    let receiver_task = handle_incoming_messages(ws_receiver, &connection_handler);

    tokio::select! {
        _ = sender_task => {
            info!(%connection_id, "Sender task completed");
        }
        _ = receiver_task => {
            info!(%connection_id, "Receiver task completed");
        }
    }

    if let Err(e) = connection_handler.disconnect().await {
        error!(%connection_id, error = %e, "Failed to disconnect");
    }
}

pub async fn handle_outgoing_messages(
    mut rx: Receiver<Message>,
    mut ws_sender: SplitSink<WebSocket, Message>,
) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = ws_sender.send(msg).await {
            error!(error = %e, "Failed to send message");
            break;
        }
    }
}

pub async fn handle_incoming_messages(
    mut receiver: SplitStream<WebSocket>,
    connection_handler: &ConnectionHandler,
) {
    while let Some(message) = receiver.next().await {
        match message {
            Ok(message) => {
                if !handle_message(message, connection_handler).await {
                    break;
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to receive message");
                break;
            }
        }
    }
}

/// Returns `false` once the socket should be torn down
pub async fn handle_message(message: Message, connection_handler: &ConnectionHandler) -> bool {
    match message {
        Message::Text(text) => {
            if let Err(e) = connection_handler.handle_text(&text).await {
                error!(error = %e, "Failed to handle command");
                return false;
            }
            true
        }
        Message::Close(_) => {
            info!(
                connection_id = %connection_handler.connection_id(),
                "Client closed the connection"
            );
            false
        }
        Message::Ping(_) | Message::Pong(_) => {
            debug!("Control frame");
            true
        }
        Message::Binary(_) => {
            warn!(
                connection_id = %connection_handler.connection_id(),
                "Unsupported binary message"
            );
            true
        }
    }
}
