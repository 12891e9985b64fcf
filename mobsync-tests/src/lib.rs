use cucumber::World;
use mobsync_core::{
    ConnectionId, Dispatch, ManualTicker, RouterError, ServerEvent, Session, SessionCommand,
    SessionEventLoop, SessionId,
};
use std::collections::HashMap;

#[derive(Debug, World)]
pub struct MobWorld {
    /// Session event loop (the system under test)
    pub event_loop: SessionEventLoop,

    /// Ticker driven by hand from the steps
    pub ticker: ManualTicker,

    /// Track connection IDs by participant name
    pub participant_ids: HashMap<String, ConnectionId>,

    /// Dispatches produced by the last command
    pub last_dispatches: Vec<Dispatch>,

    /// Every dispatch since the scenario started
    pub history: Vec<Dispatch>,

    /// Error returned by the last command, if any
    pub last_error: Option<RouterError>,
}

impl Default for MobWorld {
    fn default() -> Self {
        let ticker = ManualTicker::new();
        Self {
            event_loop: SessionEventLoop::with_ticker(ticker.clone()),
            ticker,
            participant_ids: HashMap::new(),
            last_dispatches: Vec::new(),
            history: Vec::new(),
            last_error: None,
        }
    }
}

impl MobWorld {
    /// Execute a command and store the result
    pub fn execute(&mut self, command: SessionCommand) {
        match self.event_loop.handle_command(command) {
            Ok(dispatches) => {
                self.history.extend(dispatches.iter().cloned());
                self.last_dispatches = dispatches;
                self.last_error = None;
            }
            Err(e) => {
                self.last_dispatches.clear();
                self.last_error = Some(e);
            }
        }
    }

    /// Get participant ID by name, allocating one on first use
    pub fn participant_id(&mut self, name: &str) -> ConnectionId {
        *self
            .participant_ids
            .entry(name.to_string())
            .or_insert_with(ConnectionId::new)
    }

    pub fn known_participant(&self, name: &str) -> ConnectionId {
        *self
            .participant_ids
            .get(name)
            .unwrap_or_else(|| panic!("Participant '{}' not found", name))
    }

    pub fn join(&mut self, name: &str, session: &str) {
        let connection_id = self.participant_id(name);
        self.execute(SessionCommand::Join {
            connection_id,
            session_id: Some(session.to_string()),
            username: name.to_string(),
        });
    }

    pub fn session_id(session: &str) -> SessionId {
        SessionId::parse(session).unwrap_or_else(|e| panic!("Bad session id {}: {}", session, e))
    }

    pub fn session(&self, session: &str) -> &Session {
        self.event_loop
            .session(&Self::session_id(session))
            .unwrap_or_else(|| panic!("Session '{}' not found", session))
    }

    /// Deliver one tick to the session's live timer
    ///
    /// Returns `false` when no timer is running.
    pub fn tick(&mut self, session: &str) -> bool {
        let session_id = Self::session_id(session);
        let Some(epoch) = self.ticker.active_epoch(&session_id) else {
            return false;
        };
        self.execute(SessionCommand::Tick { session_id, epoch });
        true
    }

    pub fn role_of(&self, session: &str, name: &str) -> Option<String> {
        let id = self.known_participant(name);
        self.session(session)
            .participant(id)
            .unwrap_or_else(|| panic!("'{}' is not in session '{}'", name, session))
            .role()
            .map(str::to_string)
    }

    /// Events of the whole scenario, in emission order
    pub fn events(&self) -> impl Iterator<Item = &ServerEvent> {
        self.history.iter().map(|d| &d.event)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
