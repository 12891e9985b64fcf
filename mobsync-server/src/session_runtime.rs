use crate::ticker::TokioTicker;
use crate::{ConnectionRepository, Result, ServerError};
use axum::extract::ws::Message;
use mobsync_core::{Dispatch, DomainLoop, SessionCommand, SessionSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub queue_size: usize,
    pub batch_size: usize,
    pub tick_period: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            queue_size: 1024,
            batch_size: 64,
            tick_period: crate::ticker::TICK_PERIOD,
        }
    }
}

/// Cloneable entry point into the session runtime
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub async fn submit(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ServerError::ChannelClosed)
    }
}

/// Single task owning every session
///
/// Connection handlers and tick tasks talk to it through [`SessionHandle`];
/// nothing else touches session state. The task ends once every handle is
/// dropped.
pub struct SessionRuntime {
    domain: DomainLoop,
    connections: Arc<dyn ConnectionRepository>,
    batch_size: usize,
}

impl SessionRuntime {
    pub fn spawn(
        settings: SessionSettings,
        connections: Arc<dyn ConnectionRepository>,
        options: RuntimeOptions,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(options.queue_size);
        let ticker = TokioTicker::new(tx.downgrade()).with_period(options.tick_period);

        let runtime = SessionRuntime {
            domain: DomainLoop::new(
                settings,
                Box::new(ticker),
                options.batch_size,
                options.queue_size,
            ),
            connections,
            batch_size: options.batch_size,
        };

        let task = tokio::spawn(runtime.run(rx));
        (SessionHandle { commands: tx }, task)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        info!("Session runtime started");

        while let Some(command) = commands.recv().await {
            self.enqueue(command);
            while self.domain.pending() < self.batch_size {
                match commands.try_recv() {
                    Ok(command) => self.enqueue(command),
                    Err(_) => break,
                }
            }

            while self.domain.poll() > 0 {}

            for dispatch in self.domain.drain_dispatches() {
                deliver(&self.connections, dispatch).await;
            }
        }

        info!(
            sessions = self.domain.event_loop().session_count(),
            "Session runtime stopped"
        );
    }

    fn enqueue(&mut self, command: SessionCommand) {
        if let Err(e) = self.domain.submit(command) {
            warn!(error = %e, "Command dropped");
        }
    }
}

/// Serialize once and fan out
///
/// A full or closed outbound buffer only affects that one recipient.
#[instrument(
    skip_all,
    fields(event = dispatch.event.name(), recipients = dispatch.recipients.len())
)]
async fn deliver(connections: &Arc<dyn ConnectionRepository>, dispatch: Dispatch) {
    let payload = match serde_json::to_string(&dispatch.event) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, "Failed to serialize event");
            return;
        }
    };

    for recipient in dispatch.recipients {
        let connection = match connections.get_connection(recipient).await {
            Ok(Some(connection)) => connection,
            Ok(None) => {
                debug!(%recipient, "Recipient already gone");
                continue;
            }
            Err(e) => {
                error!(%recipient, error = %e, "Failed to look up connection");
                continue;
            }
        };

        match connection.sender.try_send(Message::Text(payload.clone())) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(%recipient, "Outbound buffer full, event dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%recipient, "Outbound channel closed");
            }
        }
    }
}
