use crate::{Connection, Result};
use async_trait::async_trait;
use mobsync_core::ConnectionId;

#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    async fn add_connection(&self, connection: Connection) -> Result<()>;
    async fn remove_connection(&self, id: ConnectionId) -> Result<()>;
    async fn get_connection(&self, id: ConnectionId) -> Result<Option<Connection>>;
    async fn get_all_connections(&self) -> Result<Vec<Connection>>;
}
