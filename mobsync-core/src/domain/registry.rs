use crate::config::SessionSettings;
use crate::domain::{ConnectionId, Participant, Session, SessionError, SessionId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Result of removing a participant from a session
#[derive(Debug, Clone, PartialEq)]
pub enum Removal {
    /// Participant left, the session lives on
    Left(Participant),
    /// Participant was the last one; the session is gone
    Closed(Participant),
}

impl Removal {
    pub fn participant(&self) -> &Participant {
        match self {
            Removal::Left(p) | Removal::Closed(p) => p,
        }
    }
}

/// In-memory owner of every live session
///
/// A session is created by the first join and dropped the moment its roster
/// becomes empty.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    settings: SessionSettings,
}

impl SessionRegistry {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            sessions: HashMap::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &SessionId> {
        self.sessions.keys()
    }

    /// Join a known session, or create one
    ///
    /// When `requested` names a live session the caller is appended to it.
    /// Otherwise a session is created under `requested`, or under a freshly
    /// generated id when none was given. Returns the session and whether it
    /// was created.
    pub fn create_or_join(
        &mut self,
        requested: Option<SessionId>,
        connection_id: ConnectionId,
        display_name: &str,
    ) -> Result<(&mut Session, bool), SessionError> {
        let participant = Participant::new(connection_id, display_name)?;

        let id = requested.unwrap_or_else(|| self.unused_id());

        let (session, created) = match self.sessions.entry(id) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => {
                let session = Session::new(
                    entry.key().clone(),
                    self.settings.default_roles.clone(),
                    self.settings.default_duration,
                )?;
                tracing::info!(session_id = %entry.key(), "Session created");
                (entry.insert(session), true)
            }
        };

        session.add_participant(participant);

        Ok((session, created))
    }

    /// Remove a participant, dropping the session if it becomes empty
    ///
    /// Returns `None` when the session or the participant is unknown.
    pub fn remove(&mut self, id: &SessionId, connection_id: ConnectionId) -> Option<Removal> {
        let session = self.sessions.get_mut(id)?;
        let participant = session.remove_participant(connection_id)?;

        if session.is_empty() {
            if let Some(mut session) = self.sessions.remove(id) {
                session.close();
            }
            tracing::info!(session_id = %id, "Session closed");
            return Some(Removal::Closed(participant));
        }

        Some(Removal::Left(participant))
    }

    fn unused_id(&self) -> SessionId {
        loop {
            let id = SessionId::generate();
            if !self.sessions.contains_key(&id) {
                return id;
            }
        }
    }
}
