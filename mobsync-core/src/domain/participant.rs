use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum display name length, in characters
pub const MAX_NAME_LENGTH: usize = 50;

/// Identifier of one live connection
///
/// Assigned by the transport when a client connects. It doubles as the
/// participant id on the wire, so a participant exists exactly as long as its
/// connection does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a fresh random connection id
    pub fn new() -> Self {
        ConnectionId(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        ConnectionId(uuid)
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur when working with participants
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParticipantError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Name must be between 1 and 50 characters")]
    InvalidNameLength,
}

/// One connected user within a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Connection this participant is bound to
    id: ConnectionId,
    /// Display name (not required to be unique)
    username: String,
    /// Role currently held, `None` once roles are exhausted
    role: Option<String>,
}

impl Participant {
    /// Create a participant without a role
    pub fn new(id: ConnectionId, username: &str) -> Result<Self, ParticipantError> {
        Ok(Participant {
            id,
            username: Self::validate_name(username)?,
            role: None,
        })
    }

    /// Validate and normalize a display name
    pub fn validate_name(name: &str) -> Result<String, ParticipantError> {
        let name = name.trim();

        if name.is_empty() {
            return Err(ParticipantError::EmptyName);
        }

        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(ParticipantError::InvalidNameLength);
        }

        Ok(name.to_string())
    }

    // Getters

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn has_role(&self) -> bool {
        self.role.is_some()
    }

    // State mutations

    /// Replace the display name, returning the previous one
    ///
    /// Returns `Ok(None)` when the normalized name equals the current one.
    pub fn rename(&mut self, new_name: &str) -> Result<Option<String>, ParticipantError> {
        let new_name = Self::validate_name(new_name)?;
        if new_name == self.username {
            return Ok(None);
        }
        Ok(Some(std::mem::replace(&mut self.username, new_name)))
    }

    pub fn assign_role(&mut self, role: Option<String>) {
        self.role = role;
    }
}
