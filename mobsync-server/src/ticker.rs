use mobsync_core::{SessionCommand, SessionId, TickHandle, Ticker};
use std::time::Duration;
use tokio::sync::mpsc::WeakSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::trace;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Ticker backed by one tokio task per running timer
///
/// Ticks are fed back into the session runtime's own command channel. The
/// ticker holds only a weak sender so it never keeps the runtime alive.
#[derive(Debug, Clone)]
pub struct TokioTicker {
    commands: WeakSender<SessionCommand>,
    period: Duration,
}

impl TokioTicker {
    pub fn new(commands: WeakSender<SessionCommand>) -> Self {
        Self {
            commands,
            period: TICK_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

impl Ticker for TokioTicker {
    fn schedule(&mut self, session_id: &SessionId, epoch: u64) -> Box<dyn TickHandle> {
        let commands = self.commands.clone();
        let session_id = session_id.clone();
        let period = self.period;

        let task = tokio::spawn(async move {
            // First tick one full period after start
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let Some(commands) = commands.upgrade() else {
                    break;
                };
                trace!(%session_id, epoch, "Tick");
                let tick = SessionCommand::Tick {
                    session_id: session_id.clone(),
                    epoch,
                };
                if commands.send(tick).await.is_err() {
                    break;
                }
            }
        });

        Box::new(TokioTickHandle { task })
    }
}

#[derive(Debug)]
pub struct TokioTickHandle {
    task: JoinHandle<()>,
}

impl TickHandle for TokioTickHandle {
    fn cancel(&mut self) {
        self.task.abort();
    }
}

impl Drop for TokioTickHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
