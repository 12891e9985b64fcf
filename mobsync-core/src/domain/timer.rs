use crate::domain::{SessionId, TickHandle, Ticker};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest duration the timer itself accepts, in seconds
pub const MIN_DURATION_SECS: u32 = 1;

/// Longest duration (one hour), in seconds
pub const MAX_DURATION_SECS: u32 = 3600;

/// Duration of a freshly created session, in seconds
pub const DEFAULT_DURATION_SECS: u32 = 600;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TimerError {
    #[error("Duration must be between 1 and 3600 seconds, got {0}")]
    DurationOutOfRange(u32),
}

/// Observable state of a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    /// Not running, remaining equals duration
    Idle,
    /// Counting down once per second
    Running,
    /// Not running, remaining kept at its last value
    Paused,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerState::Idle => write!(f, "Idle"),
            TimerState::Running => write!(f, "Running"),
            TimerState::Paused => write!(f, "Paused"),
        }
    }
}

/// What a reset does to a running countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResetPolicy {
    /// Only restore remaining; a running countdown keeps ticking from the top
    #[default]
    KeepRunning,
    /// Restore remaining and stop the countdown
    Stop,
}

/// Result of delivering one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer not running or tick from a superseded epoch
    Ignored,
    /// One second elapsed
    Updated { remaining: u32 },
    /// Countdown reached zero; the timer is stopped and rewound
    Expired,
}

/// Per-session countdown
///
/// The state is `Running` exactly when a tick handle is held. Every start
/// opens a new epoch, and ticks carrying an older epoch are ignored.
#[derive(Debug)]
pub struct Timer {
    duration: u32,
    remaining: u32,
    state: TimerState,
    epoch: u64,
    tick: Option<Box<dyn TickHandle>>,
}

impl Timer {
    pub fn new(duration: u32) -> Result<Self, TimerError> {
        Self::validate_duration(duration)?;
        Ok(Timer {
            duration,
            remaining: duration,
            state: TimerState::Idle,
            epoch: 0,
            tick: None,
        })
    }

    pub fn validate_duration(duration: u32) -> Result<u32, TimerError> {
        if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&duration) {
            return Err(TimerError::DurationOutOfRange(duration));
        }
        Ok(duration)
    }

    // Getters

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn has_tick(&self) -> bool {
        self.tick.is_some()
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    // Transitions

    /// Idle/Paused -> Running
    ///
    /// Returns `false` when already running.
    pub fn start(&mut self, session_id: &SessionId, ticker: &mut dyn Ticker) -> bool {
        if self.is_running() {
            return false;
        }

        // Cancel before re-arm
        self.cancel_tick();
        self.epoch += 1;
        self.tick = Some(ticker.schedule(session_id, self.epoch));
        self.state = TimerState::Running;
        true
    }

    /// Running -> Paused, keeping remaining exactly as it is
    ///
    /// Returns `false` when not running.
    pub fn pause(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.cancel_tick();
        self.state = TimerState::Paused;
        true
    }

    /// Rewind remaining to the full duration
    ///
    /// Returns `true` when the reset also stopped a running countdown.
    pub fn reset(&mut self, policy: ResetPolicy) -> bool {
        self.remaining = self.duration;

        match (policy, self.state) {
            (ResetPolicy::KeepRunning, TimerState::Running) => false,
            (ResetPolicy::Stop, TimerState::Running) => {
                self.stop();
                true
            }
            _ => {
                self.state = TimerState::Idle;
                false
            }
        }
    }

    /// Deliver one tick
    pub fn tick(&mut self, epoch: u64) -> TickOutcome {
        if !self.is_running() || epoch != self.epoch {
            return TickOutcome::Ignored;
        }

        self.remaining = self.remaining.saturating_sub(1);

        if self.remaining == 0 {
            self.stop();
            self.remaining = self.duration;
            return TickOutcome::Expired;
        }

        TickOutcome::Updated {
            remaining: self.remaining,
        }
    }

    /// Change the configured duration
    ///
    /// While not running, remaining follows the new duration immediately and
    /// a paused countdown becomes idle. While running, remaining is left
    /// alone unless it would exceed the new duration.
    pub fn set_duration(&mut self, duration: u32) -> Result<(), TimerError> {
        self.duration = Self::validate_duration(duration)?;

        if self.is_running() {
            self.remaining = self.remaining.min(duration);
        } else {
            self.remaining = duration;
            self.state = TimerState::Idle;
        }

        Ok(())
    }

    /// Cancel the tick and go back to idle
    pub fn stop(&mut self) {
        self.cancel_tick();
        self.state = TimerState::Idle;
    }

    fn cancel_tick(&mut self) {
        if let Some(mut tick) = self.tick.take() {
            tick.cancel();
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Timer {
            duration: DEFAULT_DURATION_SECS,
            remaining: DEFAULT_DURATION_SECS,
            state: TimerState::Idle,
            epoch: 0,
            tick: None,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel_tick();
    }
}
