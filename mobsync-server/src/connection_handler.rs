use crate::{Connection, ConnectionRepository, Result, SessionHandle};
use axum::extract::ws::Message;
use mobsync_core::{ClientEvent, ConnectionId, SessionCommand};
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, instrument, warn};

/// Per-socket glue between the WebSocket and the session runtime
#[derive(Clone)]
pub struct ConnectionHandler {
    connection_id: ConnectionId,
    connection_repo: Arc<dyn ConnectionRepository>,
    session: SessionHandle,
    sender: Option<Sender<Message>>,
}

impl ConnectionHandler {
    pub fn new(connection_repo: Arc<dyn ConnectionRepository>, session: SessionHandle) -> Self {
        ConnectionHandler {
            connection_id: ConnectionId::new(),
            connection_repo,
            session,
            sender: None,
        }
    }

    /// Fresh handler for a new socket, sharing the repository and runtime
    pub fn new_from(cloneable: &Self) -> Self {
        ConnectionHandler {
            connection_id: ConnectionId::new(),
            connection_repo: cloneable.connection_repo.clone(),
            session: cloneable.session.clone(),
            sender: None,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn with_sender(&self, sender: Sender<Message>) -> Self {
        let mut new_self = self.clone();
        new_self.sender = Some(sender);
        new_self
    }

    /// Register the outbound half so the runtime can reach this socket
    #[instrument(skip(self), fields(connection_id = %self.connection_id))]
    pub async fn connect(&self) -> Result<()> {
        let Some(sender) = &self.sender else {
            warn!("Connect without an outbound sender");
            return Ok(());
        };

        self.connection_repo
            .add_connection(Connection::new(self.connection_id, sender.clone()))
            .await?;
        info!("Client connected");
        Ok(())
    }

    /// Decode one text frame and forward it to the runtime
    ///
    /// Frames that do not decode are logged and dropped.
    #[instrument(skip(self, text), fields(connection_id = %self.connection_id))]
    pub async fn handle_text(&self, text: &str) -> Result<()> {
        let event = match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Failed to parse client event");
                return Ok(());
            }
        };

        let command = SessionCommand::from_client(self.connection_id, event);
        debug!(command = command.name(), "Forwarding command");
        self.session.submit(command).await
    }

    #[instrument(skip(self), fields(connection_id = %self.connection_id))]
    pub async fn disconnect(&self) -> Result<()> {
        let submitted = self
            .session
            .submit(SessionCommand::Disconnect {
                connection_id: self.connection_id,
            })
            .await;

        self.connection_repo
            .remove_connection(self.connection_id)
            .await?;
        info!("Client disconnected");

        submitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStorage, RuntimeOptions, SessionRuntime};
    use mobsync_core::{ServerEvent, SessionSettings};

    fn handler() -> (ConnectionHandler, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let (session, _task) = SessionRuntime::spawn(
            SessionSettings::default(),
            storage.clone(),
            RuntimeOptions::default(),
        );
        (ConnectionHandler::new(storage.clone(), session), storage)
    }

    #[tokio::test]
    async fn test_connect_registers_connection() {
        let (handler, storage) = handler();
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let handler = handler.with_sender(tx);

        handler.connect().await.unwrap();

        let connections = storage.get_all_connections().await.unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].connection_id, handler.connection_id());
    }

    #[tokio::test]
    async fn test_new_from_allocates_fresh_id() {
        let (handler, _) = handler();
        let other = ConnectionHandler::new_from(&handler);

        assert_ne!(handler.connection_id(), other.connection_id());
    }

    #[tokio::test]
    async fn test_join_round_trip() {
        let (handler, _) = handler();
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let handler = handler.with_sender(tx);
        handler.connect().await.unwrap();

        handler
            .handle_text(r#"{"event":"joinSession","data":{"username":"Alice"}}"#)
            .await
            .unwrap();

        let Some(Message::Text(text)) = rx.recv().await else {
            panic!("Expected a text frame");
        };
        let event: ServerEvent = serde_json::from_str(&text).unwrap();
        assert!(matches!(
            event,
            ServerEvent::SessionJoined { participant_id, .. } if participant_id == handler.connection_id()
        ));
    }

    #[tokio::test]
    async fn test_malformed_text_is_ignored() {
        let (handler, _) = handler();

        assert!(handler.handle_text("{not json").await.is_ok());
        assert!(handler
            .handle_text(r#"{"event":"launchRockets"}"#)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_unregisters() {
        let (handler, storage) = handler();
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let handler = handler.with_sender(tx);
        handler.connect().await.unwrap();

        handler.disconnect().await.unwrap();

        assert!(storage.get_all_connections().await.unwrap().is_empty());
    }
}
