mod commands;
mod event_loop;
mod events;
pub mod runtime;

pub use commands::{ClientEvent, SessionCommand};
pub use event_loop::{RouterError, SessionEventLoop, MIN_CLIENT_DURATION_SECS};
pub use events::{Dispatch, ServerEvent};
pub use runtime::{DomainLoop, QueueError};
