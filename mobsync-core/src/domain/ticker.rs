use crate::domain::SessionId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Handle to a recurring one-second tick for one session
///
/// Implementations must stop delivering ticks once [`TickHandle::cancel`] has
/// been called, and must cancel themselves when dropped.
pub trait TickHandle: Send + fmt::Debug {
    fn cancel(&mut self);
}

/// Schedules recurring ticks for running timers
///
/// Each scheduled tick is delivered back to the session event loop as
/// `SessionCommand::Tick { session_id, epoch }`, on the same queue as client
/// commands.
pub trait Ticker: Send {
    fn schedule(&mut self, session_id: &SessionId, epoch: u64) -> Box<dyn TickHandle>;
}

#[derive(Debug, Default)]
struct ManualTickerState {
    /// Currently scheduled epoch per session
    active: HashMap<SessionId, u64>,
    scheduled: usize,
    cancelled: usize,
}

/// Deterministic ticker that never fires on its own
///
/// Records which sessions have a live tick so the caller can drive ticks by
/// hand. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct ManualTicker {
    state: Arc<Mutex<ManualTickerState>>,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Epoch of the live tick for a session, if any
    pub fn active_epoch(&self, session_id: &SessionId) -> Option<u64> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.active.get(session_id).copied())
    }

    pub fn is_active(&self, session_id: &SessionId) -> bool {
        self.active_epoch(session_id).is_some()
    }

    /// Number of live ticks across all sessions
    pub fn active_count(&self) -> usize {
        self.state.lock().map(|state| state.active.len()).unwrap_or(0)
    }

    pub fn scheduled_count(&self) -> usize {
        self.state.lock().map(|state| state.scheduled).unwrap_or(0)
    }

    pub fn cancelled_count(&self) -> usize {
        self.state.lock().map(|state| state.cancelled).unwrap_or(0)
    }
}

impl Ticker for ManualTicker {
    fn schedule(&mut self, session_id: &SessionId, epoch: u64) -> Box<dyn TickHandle> {
        if let Ok(mut state) = self.state.lock() {
            state.active.insert(session_id.clone(), epoch);
            state.scheduled += 1;
        }

        Box::new(ManualTickHandle {
            session_id: session_id.clone(),
            epoch,
            state: Arc::clone(&self.state),
            cancelled: false,
        })
    }
}

#[derive(Debug)]
struct ManualTickHandle {
    session_id: SessionId,
    epoch: u64,
    state: Arc<Mutex<ManualTickerState>>,
    cancelled: bool,
}

impl TickHandle for ManualTickHandle {
    fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;

        if let Ok(mut state) = self.state.lock() {
            if state.active.get(&self.session_id) == Some(&self.epoch) {
                state.active.remove(&self.session_id);
            }
            state.cancelled += 1;
        }
    }
}

impl Drop for ManualTickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
