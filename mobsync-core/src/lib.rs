pub mod application;
pub mod config;
pub mod domain;

pub use application::{
    ClientEvent, Dispatch, DomainLoop, QueueError, RouterError, ServerEvent, SessionCommand,
    SessionEventLoop,
};
pub use config::SessionSettings;
pub use domain::{
    ConnectionId, ManualTicker, Participant, ParticipantError, ResetPolicy, RoleError, RoleList,
    Session, SessionError, SessionId, SessionRegistry, SessionSnapshot, TickHandle, Ticker,
    TimerState,
};
