use crate::domain::{ConnectionId, Participant, Session, SessionId, SessionSnapshot};
use serde::{Deserialize, Serialize};

/// Events the server sends to clients
///
/// Wire shape: `{"event": "<name>", "data": {...}}` with camelCase fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Full state sync, sent only to the joining connection
    SessionJoined {
        session_id: SessionId,
        participant_id: ConnectionId,
        participants: Vec<Participant>,
        roles: Vec<String>,
        timer_duration: u32,
        time_remaining: u32,
        is_running: bool,
    },
    ParticipantJoined {
        participants: Vec<Participant>,
    },
    ParticipantLeft {
        participants: Vec<Participant>,
    },
    TimerStarted {
        is_running: bool,
    },
    TimerPaused {
        is_running: bool,
        time_remaining: u32,
    },
    TimerReset {
        time_remaining: u32,
        is_running: bool,
    },
    /// Live countdown, once per second while running
    TimerUpdate {
        time_remaining: u32,
    },
    /// Countdown expired and roles were rotated
    TimerEnded {
        participants: Vec<Participant>,
        time_remaining: u32,
        is_running: bool,
    },
    TimerDurationUpdated {
        timer_duration: u32,
        time_remaining: u32,
    },
    RolesUpdated {
        roles: Vec<String>,
        participants: Vec<Participant>,
    },
    ParticipantsReordered {
        participants: Vec<Participant>,
    },
    UsernameChanged {
        participant_id: ConnectionId,
        old_username: String,
        new_username: String,
        participants: Vec<Participant>,
    },
}

impl ServerEvent {
    pub fn session_joined(participant_id: ConnectionId, snapshot: SessionSnapshot) -> Self {
        ServerEvent::SessionJoined {
            session_id: snapshot.session_id,
            participant_id,
            participants: snapshot.participants,
            roles: snapshot.roles,
            timer_duration: snapshot.timer_duration,
            time_remaining: snapshot.time_remaining,
            is_running: snapshot.is_running,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::SessionJoined { .. } => "sessionJoined",
            ServerEvent::ParticipantJoined { .. } => "participantJoined",
            ServerEvent::ParticipantLeft { .. } => "participantLeft",
            ServerEvent::TimerStarted { .. } => "timerStarted",
            ServerEvent::TimerPaused { .. } => "timerPaused",
            ServerEvent::TimerReset { .. } => "timerReset",
            ServerEvent::TimerUpdate { .. } => "timerUpdate",
            ServerEvent::TimerEnded { .. } => "timerEnded",
            ServerEvent::TimerDurationUpdated { .. } => "timerDurationUpdated",
            ServerEvent::RolesUpdated { .. } => "rolesUpdated",
            ServerEvent::ParticipantsReordered { .. } => "participantsReordered",
            ServerEvent::UsernameChanged { .. } => "usernameChanged",
        }
    }
}

/// An outbound event together with the connections that should receive it
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub recipients: Vec<ConnectionId>,
    pub event: ServerEvent,
}

impl Dispatch {
    /// Direct reply to a single connection
    pub fn to(recipient: ConnectionId, event: ServerEvent) -> Self {
        Self {
            recipients: vec![recipient],
            event,
        }
    }

    /// Broadcast to every member of a session
    pub fn broadcast(session: &Session, event: ServerEvent) -> Self {
        Self {
            recipients: session.member_ids(),
            event,
        }
    }

    /// Broadcast to every member of a session except one connection
    pub fn broadcast_except(session: &Session, excluded: ConnectionId, event: ServerEvent) -> Self {
        Self {
            recipients: session
                .member_ids()
                .into_iter()
                .filter(|id| *id != excluded)
                .collect(),
            event,
        }
    }
}
