use crate::application::{Dispatch, SessionCommand, SessionEventLoop};
use crate::config::SessionSettings;
use crate::domain::Ticker;
use std::collections::VecDeque;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueueError {
    #[error("Command queue is full ({max} pending), dropped {command}")]
    Full { max: usize, command: &'static str },
}

/// Session event loop - processes commands in batches
///
/// Failed commands are logged and dropped; they never produce outbound
/// events.
#[derive(Debug)]
pub struct DomainLoop {
    /// Stateful event loop (owns sessions)
    event_loop: SessionEventLoop,

    /// Commands waiting for the next poll, oldest first
    inbound: VecDeque<SessionCommand>,

    max_queue_size: usize,

    /// Outbound dispatches (caller drains this)
    outbound: Vec<Dispatch>,

    /// Max commands to process per poll
    batch_size: usize,
}

impl DomainLoop {
    pub fn new(
        settings: SessionSettings,
        ticker: Box<dyn Ticker>,
        batch_size: usize,
        max_queue_size: usize,
    ) -> Self {
        Self {
            event_loop: SessionEventLoop::new(settings, ticker),
            inbound: VecDeque::with_capacity(max_queue_size),
            max_queue_size,
            outbound: Vec::new(),
            batch_size,
        }
    }

    /// Queue a command for the next poll
    ///
    /// Client commands and ticks share this queue, so a tick is processed
    /// strictly after every command submitted before it.
    pub fn submit(&mut self, cmd: SessionCommand) -> Result<(), QueueError> {
        if self.inbound.len() >= self.max_queue_size {
            return Err(QueueError::Full {
                max: self.max_queue_size,
                command: cmd.name(),
            });
        }
        self.inbound.push_back(cmd);
        Ok(())
    }

    /// Process up to `batch_size` commands
    /// Returns number of commands processed
    pub fn poll(&mut self) -> usize {
        let mut processed = 0;

        while processed < self.batch_size {
            let Some(cmd) = self.inbound.pop_front() else {
                break;
            };

            let name = cmd.name();
            let connection_id = cmd.connection_id();
            match self.event_loop.handle_command(cmd) {
                Ok(dispatches) => self.outbound.extend(dispatches),
                Err(e) if e.is_unresolved() => {
                    debug!(command = name, ?connection_id, error = %e, "Command dropped");
                }
                Err(e) => {
                    warn!(command = name, ?connection_id, error = %e, "Command rejected");
                }
            }
            processed += 1;
        }

        processed
    }

    /// Drain all emitted dispatches (caller's responsibility)
    pub fn drain_dispatches(&mut self) -> Vec<Dispatch> {
        std::mem::take(&mut self.outbound)
    }

    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    /// Get reference to event loop (for queries)
    pub fn event_loop(&self) -> &SessionEventLoop {
        &self.event_loop
    }
}
