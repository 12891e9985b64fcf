use clap::Parser;
use mobsync_server::telemetry::{init_telemetry, shutdown_telemetry};
use mobsync_server::{Result, Server, ServerConfig};
use tracing::{error, info};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    init_telemetry(config.log_format)?;

    info!(
        host = %config.host,
        port = config.port,
        roles = ?config.default_roles,
        duration = config.default_duration,
        reset_stops_timer = config.reset_stops_timer,
        "Starting mobsync server"
    );

    let server = Server::bind(&config).await?;
    let result = server.run_until(shutdown_signal()).await;

    shutdown_telemetry();
    result
}
