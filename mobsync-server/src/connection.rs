use axum::extract::ws::Message;
use mobsync_core::ConnectionId;
use tokio::sync::mpsc::Sender;

/// Outbound half of one live WebSocket
#[derive(Debug, Clone)]
pub struct Connection {
    pub connection_id: ConnectionId,
    pub sender: Sender<Message>,
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.connection_id == other.connection_id
    }
}

impl Connection {
    pub fn new(connection_id: ConnectionId, sender: Sender<Message>) -> Self {
        Connection {
            connection_id,
            sender,
        }
    }
}
