use crate::domain::{ConnectionId, SessionId};
use serde::{Deserialize, Serialize};

/// Events a client may send
///
/// Wire shape: `{"event": "<name>", "data": <payload>}`. Disconnects are not
/// part of the wire format; the transport reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Join a session, creating it when the id is absent or unknown
    JoinSession {
        #[serde(default)]
        session_id: Option<String>,
        username: String,
    },
    StartTimer,
    PauseTimer,
    ResetTimer,
    /// New duration in seconds
    UpdateTimerDuration(u32),
    /// Complete replacement role list
    UpdateRoles(Vec<String>),
    ReorderParticipants {
        src_id: ConnectionId,
        target_id: ConnectionId,
    },
    ChangeUsername(String),
}

/// Commands processed by the session event loop
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Join {
        connection_id: ConnectionId,
        session_id: Option<String>,
        username: String,
    },
    StartTimer {
        connection_id: ConnectionId,
    },
    PauseTimer {
        connection_id: ConnectionId,
    },
    ResetTimer {
        connection_id: ConnectionId,
    },
    UpdateTimerDuration {
        connection_id: ConnectionId,
        seconds: u32,
    },
    UpdateRoles {
        connection_id: ConnectionId,
        roles: Vec<String>,
    },
    ReorderParticipants {
        connection_id: ConnectionId,
        source: ConnectionId,
        target: ConnectionId,
    },
    ChangeUsername {
        connection_id: ConnectionId,
        username: String,
    },
    /// The connection went away
    Disconnect { connection_id: ConnectionId },
    /// One second elapsed for a running session timer
    Tick { session_id: SessionId, epoch: u64 },
}

impl SessionCommand {
    /// Attach the sending connection to a wire event
    pub fn from_client(connection_id: ConnectionId, event: ClientEvent) -> Self {
        match event {
            ClientEvent::JoinSession {
                session_id,
                username,
            } => SessionCommand::Join {
                connection_id,
                session_id,
                username,
            },
            ClientEvent::StartTimer => SessionCommand::StartTimer { connection_id },
            ClientEvent::PauseTimer => SessionCommand::PauseTimer { connection_id },
            ClientEvent::ResetTimer => SessionCommand::ResetTimer { connection_id },
            ClientEvent::UpdateTimerDuration(seconds) => SessionCommand::UpdateTimerDuration {
                connection_id,
                seconds,
            },
            ClientEvent::UpdateRoles(roles) => SessionCommand::UpdateRoles {
                connection_id,
                roles,
            },
            ClientEvent::ReorderParticipants { src_id, target_id } => {
                SessionCommand::ReorderParticipants {
                    connection_id,
                    source: src_id,
                    target: target_id,
                }
            }
            ClientEvent::ChangeUsername(username) => SessionCommand::ChangeUsername {
                connection_id,
                username,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::Join { .. } => "Join",
            SessionCommand::StartTimer { .. } => "StartTimer",
            SessionCommand::PauseTimer { .. } => "PauseTimer",
            SessionCommand::ResetTimer { .. } => "ResetTimer",
            SessionCommand::UpdateTimerDuration { .. } => "UpdateTimerDuration",
            SessionCommand::UpdateRoles { .. } => "UpdateRoles",
            SessionCommand::ReorderParticipants { .. } => "ReorderParticipants",
            SessionCommand::ChangeUsername { .. } => "ChangeUsername",
            SessionCommand::Disconnect { .. } => "Disconnect",
            SessionCommand::Tick { .. } => "Tick",
        }
    }

    /// Connection that issued the command, `None` for internal ticks
    pub fn connection_id(&self) -> Option<ConnectionId> {
        match self {
            SessionCommand::Join { connection_id, .. }
            | SessionCommand::StartTimer { connection_id }
            | SessionCommand::PauseTimer { connection_id }
            | SessionCommand::ResetTimer { connection_id }
            | SessionCommand::UpdateTimerDuration { connection_id, .. }
            | SessionCommand::UpdateRoles { connection_id, .. }
            | SessionCommand::ReorderParticipants { connection_id, .. }
            | SessionCommand::ChangeUsername { connection_id, .. }
            | SessionCommand::Disconnect { connection_id } => Some(*connection_id),
            SessionCommand::Tick { .. } => None,
        }
    }
}
