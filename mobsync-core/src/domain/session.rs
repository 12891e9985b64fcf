use crate::domain::roles::{assign_initial, reassign_by_position, rotate};
use crate::domain::{
    ConnectionId, Participant, ParticipantError, ResetPolicy, RoleError, RoleList, TickOutcome,
    Ticker, Timer, TimerError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length of a client-supplied session id
pub const MAX_SESSION_ID_LENGTH: usize = 64;

/// Opaque, globally unique session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SessionIdError {
    #[error("Session id cannot be empty")]
    Empty,

    #[error("Session id must be at most 64 characters")]
    TooLong,

    #[error("Session id contains invalid character {0:?}")]
    InvalidCharacter(char),
}

impl SessionId {
    /// Allocate a fresh random id
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4().to_string())
    }

    /// Accept a client-supplied id
    ///
    /// Surrounding whitespace is ignored. Anything else the user typed is
    /// kept, up to 64 characters without control characters.
    pub fn parse(raw: &str) -> Result<Self, SessionIdError> {
        let raw = raw.trim();

        if raw.is_empty() {
            return Err(SessionIdError::Empty);
        }
        if raw.chars().count() > MAX_SESSION_ID_LENGTH {
            return Err(SessionIdError::TooLong);
        }
        if let Some(c) = raw.chars().find(|c| c.is_control()) {
            return Err(SessionIdError::InvalidCharacter(c));
        }

        Ok(SessionId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur in session operations
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SessionError {
    #[error("Participant not found: {0}")]
    ParticipantNotFound(ConnectionId),

    #[error("Participant error: {0}")]
    Participant(#[from] ParticipantError),

    #[error("Role error: {0}")]
    Role(#[from] RoleError),

    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),
}

/// Full view of a session, as sent to a joining client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub participants: Vec<Participant>,
    pub roles: Vec<String>,
    pub timer_duration: u32,
    pub time_remaining: u32,
    pub is_running: bool,
}

/// Session aggregate root
///
/// Owns its roster, its role list and its countdown. Roster order drives role
/// assignment.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    participants: Vec<Participant>,
    roles: RoleList,
    timer: Timer,
}

impl Session {
    /// Create an empty session
    pub fn new(id: SessionId, roles: RoleList, duration: u32) -> Result<Self, SessionError> {
        Ok(Session {
            id,
            participants: Vec::new(),
            roles,
            timer: Timer::new(duration)?,
        })
    }

    // ===== Getters =====

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, id: ConnectionId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id() == id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.participant(id).is_some()
    }

    /// Connections of every member, in roster order
    pub fn member_ids(&self) -> Vec<ConnectionId> {
        self.participants.iter().map(Participant::id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn roles(&self) -> &RoleList {
        &self.roles
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            participants: self.participants.clone(),
            roles: self.roles.as_slice().to_vec(),
            timer_duration: self.timer.duration(),
            time_remaining: self.timer.remaining(),
            is_running: self.timer.is_running(),
        }
    }

    // ===== Roster =====

    /// Append a participant and hand out any free role
    pub fn add_participant(&mut self, participant: Participant) {
        self.participants.push(participant);
        assign_initial(&mut self.participants, &self.roles);
    }

    /// Remove a participant, keeping the relative order of the rest
    ///
    /// A vacated role goes to the first role-less participant. When the last
    /// participant leaves, the countdown is stopped.
    pub fn remove_participant(&mut self, id: ConnectionId) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.id() == id)?;
        let removed = self.participants.remove(index);

        if self.participants.is_empty() {
            self.timer.stop();
        } else {
            assign_initial(&mut self.participants, &self.roles);
        }

        Some(removed)
    }

    /// Move `source` to the position currently held by `target`
    ///
    /// Splice semantics rather than a swap; roles are re-derived by position
    /// afterwards.
    pub fn reorder(
        &mut self,
        source: ConnectionId,
        target: ConnectionId,
    ) -> Result<(), SessionError> {
        let source_index = self
            .participants
            .iter()
            .position(|p| p.id() == source)
            .ok_or(SessionError::ParticipantNotFound(source))?;
        let target_index = self
            .participants
            .iter()
            .position(|p| p.id() == target)
            .ok_or(SessionError::ParticipantNotFound(target))?;

        let moved = self.participants.remove(source_index);
        self.participants.insert(target_index, moved);

        reassign_by_position(&mut self.participants, &self.roles);
        Ok(())
    }

    /// Rename a participant
    ///
    /// Returns the previous name, or `None` if the name did not change.
    pub fn rename(
        &mut self,
        id: ConnectionId,
        new_name: &str,
    ) -> Result<Option<String>, SessionError> {
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or(SessionError::ParticipantNotFound(id))?;

        Ok(participant.rename(new_name)?)
    }

    // ===== Roles =====

    /// Replace the role list and re-derive every role by position
    pub fn replace_roles<I, S>(&mut self, names: I) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.roles = self.roles.replace(names)?;
        reassign_by_position(&mut self.participants, &self.roles);
        Ok(())
    }

    pub fn rotate_roles(&mut self) {
        rotate(&mut self.participants);
    }

    // ===== Timer =====

    pub fn start_timer(&mut self, ticker: &mut dyn Ticker) -> bool {
        self.timer.start(&self.id, ticker)
    }

    pub fn pause_timer(&mut self) -> bool {
        self.timer.pause()
    }

    pub fn reset_timer(&mut self, policy: ResetPolicy) -> bool {
        self.timer.reset(policy)
    }

    pub fn set_timer_duration(&mut self, duration: u32) -> Result<(), SessionError> {
        Ok(self.timer.set_duration(duration)?)
    }

    /// Deliver one tick, rotating roles when the countdown expires
    pub fn tick(&mut self, epoch: u64) -> TickOutcome {
        let outcome = self.timer.tick(epoch);
        if outcome == TickOutcome::Expired {
            self.rotate_roles();
        }
        outcome
    }

    /// Release the countdown resource
    pub fn close(&mut self) {
        self.timer.stop();
    }
}
