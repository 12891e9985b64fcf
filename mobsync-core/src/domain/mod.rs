pub mod participant;
pub mod registry;
pub mod roles;
pub mod session;
pub mod ticker;
pub mod timer;

pub use participant::{ConnectionId, Participant, ParticipantError};
pub use registry::{Removal, SessionRegistry};
pub use roles::{RoleError, RoleList, DEFAULT_ROLES};
pub use session::{Session, SessionError, SessionId, SessionIdError, SessionSnapshot};
pub use ticker::{ManualTicker, TickHandle, Ticker};
pub use timer::{
    ResetPolicy, TickOutcome, Timer, TimerError, TimerState, DEFAULT_DURATION_SECS,
    MAX_DURATION_SECS, MIN_DURATION_SECS,
};
