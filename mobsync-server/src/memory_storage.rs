use crate::{Connection, ConnectionRepository, Result, ServerError};
use async_trait::async_trait;
use mobsync_core::ConnectionId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, instrument};

#[derive(Default)]
pub struct MemoryStorage {
    connections: Arc<RwLock<HashMap<ConnectionId, Connection>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRepository for MemoryStorage {
    #[instrument(skip(self, connection))]
    async fn add_connection(&self, connection: Connection) -> Result<()> {
        debug!(connection_id = %connection.connection_id, "Adding connection");
        match self.connections.write() {
            Ok(mut connections) => {
                connections.insert(connection.connection_id, connection);
                debug!("Connection added successfully");
                Ok(())
            }
            Err(e) => {
                error!(?e, "Failed to add connection");
                Err(ServerError::Internal(e.to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    async fn remove_connection(&self, id: ConnectionId) -> Result<()> {
        debug!(%id, "Removing connection");
        match self.connections.write() {
            Ok(mut connections) => {
                connections.remove(&id);
                debug!("Connection removed successfully");
                Ok(())
            }
            Err(e) => {
                error!(?e, "Failed to remove connection");
                Err(ServerError::Internal(e.to_string()))
            }
        }
    }

    #[instrument(skip(self), level = "trace")]
    async fn get_connection(&self, id: ConnectionId) -> Result<Option<Connection>> {
        match self.connections.read() {
            Ok(connections) => Ok(connections.get(&id).cloned()),
            Err(e) => {
                error!(?e, "Failed to get connection");
                Err(ServerError::Internal(e.to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_all_connections(&self) -> Result<Vec<Connection>> {
        match self.connections.read() {
            Ok(connections) => {
                let connections: Vec<_> = connections.values().cloned().collect();
                debug!(
                    connection_count = connections.len(),
                    "Retrieved all connections"
                );
                Ok(connections)
            }
            Err(e) => {
                error!(?e, "Failed to get all connections");
                Err(ServerError::Internal(e.to_string()))
            }
        }
    }
}
