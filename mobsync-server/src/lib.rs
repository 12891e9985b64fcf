pub mod config;
mod connection;
mod connection_handler;
mod connection_repository;
pub mod error;
mod memory_storage;
pub mod route;
mod session_runtime;
pub mod telemetry;
pub mod ticker;
pub mod websocket_listener;

pub use config::{LogFormat, ServerConfig};
pub use connection::Connection;
pub use connection_handler::ConnectionHandler;
pub use connection_repository::ConnectionRepository;
pub use error::{Result, ServerError};
pub use memory_storage::MemoryStorage;
pub use route::{create_router, create_session_route};
pub use session_runtime::{RuntimeOptions, SessionHandle, SessionRuntime};
pub use ticker::TokioTicker;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

/// Bound listener plus the running session runtime
pub struct Server {
    listener: TcpListener,
    router: axum::Router,
    runtime: JoinHandle<()>,
}

impl Server {
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let options = RuntimeOptions {
            queue_size: config.queue_size,
            batch_size: config.batch_size,
            ..RuntimeOptions::default()
        };
        Self::bind_with(config, options).await
    }

    pub async fn bind_with(config: &ServerConfig, options: RuntimeOptions) -> Result<Self> {
        config.validate()?;
        let settings = config.session_settings()?;
        let addr = config.socket_addr()?;

        let storage: Arc<dyn ConnectionRepository> = Arc::new(MemoryStorage::new());
        let (session, runtime) = SessionRuntime::spawn(settings, storage.clone(), options);
        let router = create_router(ConnectionHandler::new(storage, session));

        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            router,
            runtime,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(addr = %self.local_addr()?, "Listening");

        let result = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await;

        self.runtime.abort();
        result.map_err(ServerError::from)
    }
}
