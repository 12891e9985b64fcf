use crate::{Result, ServerError};
use clap::{Parser, ValueEnum};
use mobsync_core::{ResetPolicy, RoleList, SessionSettings};
use std::net::{IpAddr, SocketAddr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "mobsync-server")]
#[command(version, about = "Real-time mob programming session server")]
pub struct ServerConfig {
    /// Interface to bind
    #[arg(long, env = "MOBSYNC_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short = 'p', long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Roles a new session starts with, comma separated
    #[arg(
        long,
        env = "MOBSYNC_DEFAULT_ROLES",
        value_delimiter = ',',
        default_value = "Driver,Navigator"
    )]
    pub default_roles: Vec<String>,

    /// Countdown length of a new session, in seconds
    #[arg(long, env = "MOBSYNC_DEFAULT_DURATION", default_value_t = 600)]
    pub default_duration: u32,

    /// Make a reset also stop a running countdown
    #[arg(long, env = "MOBSYNC_RESET_STOPS_TIMER")]
    pub reset_stops_timer: bool,

    /// Pending commands the session runtime accepts
    #[arg(long, default_value_t = 1024)]
    pub queue_size: usize,

    /// Commands processed per runtime poll
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            default_roles: vec!["Driver".to_string(), "Navigator".to_string()],
            default_duration: 600,
            reset_stops_timer: false,
            queue_size: 1024,
            batch_size: 64,
            log_format: LogFormat::Pretty,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ServerError::invalid_config(format!("invalid host {:?}", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Domain defaults for new sessions
    pub fn session_settings(&self) -> Result<SessionSettings> {
        let roles = RoleList::new(self.default_roles.iter().map(|r| r.trim()))
            .map_err(|e| ServerError::invalid_config(format!("default roles: {}", e)))?;

        let policy = if self.reset_stops_timer {
            ResetPolicy::Stop
        } else {
            ResetPolicy::KeepRunning
        };

        SessionSettings::new()
            .with_default_roles(roles)
            .with_default_duration(self.default_duration)
            .map(|settings| settings.with_reset_policy(policy))
            .map_err(|e| ServerError::invalid_config(format!("default duration: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_size == 0 {
            return Err(ServerError::invalid_config("queue size must be positive"));
        }
        if self.batch_size == 0 {
            return Err(ServerError::invalid_config("batch size must be positive"));
        }
        self.socket_addr()?;
        self.session_settings()?;
        Ok(())
    }
}
