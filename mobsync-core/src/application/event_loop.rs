use crate::application::{Dispatch, ServerEvent, SessionCommand};
use crate::config::SessionSettings;
use crate::domain::{
    ConnectionId, Participant, Removal, Session, SessionError, SessionId,
    SessionRegistry, SessionSnapshot, TickOutcome, Ticker, MAX_DURATION_SECS,
};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Shortest countdown a client may configure, in seconds
pub const MIN_CLIENT_DURATION_SECS: u32 = 60;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RouterError {
    #[error("Connection {0} has not joined a session")]
    NotInSession(ConnectionId),

    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    #[error("Duration must be between 60 and 3600 seconds, got {0}")]
    InvalidDuration(u32),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl RouterError {
    /// The command could not be tied to a live session
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            RouterError::NotInSession(_) | RouterError::SessionNotFound(_)
        )
    }
}

/// Routes commands to sessions and decides who hears about the result
///
/// Owns the session registry, the connection to session affinity map and
/// the ticker that drives running countdowns. Every mutation goes through
/// [`SessionEventLoop::handle_command`], one command at a time.
pub struct SessionEventLoop {
    registry: SessionRegistry,
    affinity: HashMap<ConnectionId, SessionId>,
    ticker: Box<dyn Ticker>,
}

impl fmt::Debug for SessionEventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEventLoop")
            .field("registry", &self.registry)
            .field("affinity", &self.affinity)
            .finish_non_exhaustive()
    }
}

impl SessionEventLoop {
    pub fn new(settings: SessionSettings, ticker: Box<dyn Ticker>) -> Self {
        Self {
            registry: SessionRegistry::new(settings),
            affinity: HashMap::new(),
            ticker,
        }
    }

    /// Event loop with default session settings
    pub fn with_ticker<T: Ticker + 'static>(ticker: T) -> Self {
        Self::new(SessionSettings::default(), Box::new(ticker))
    }

    /// Process a single command and return the events to deliver
    ///
    /// Commands that change nothing yield an empty list.
    pub fn handle_command(
        &mut self,
        command: SessionCommand,
    ) -> Result<Vec<Dispatch>, RouterError> {
        match command {
            SessionCommand::Join {
                connection_id,
                session_id,
                username,
            } => self.handle_join(connection_id, session_id, username),

            SessionCommand::StartTimer { connection_id } => self.handle_start_timer(connection_id),

            SessionCommand::PauseTimer { connection_id } => self.handle_pause_timer(connection_id),

            SessionCommand::ResetTimer { connection_id } => self.handle_reset_timer(connection_id),

            SessionCommand::UpdateTimerDuration {
                connection_id,
                seconds,
            } => self.handle_update_duration(connection_id, seconds),

            SessionCommand::UpdateRoles {
                connection_id,
                roles,
            } => self.handle_update_roles(connection_id, roles),

            SessionCommand::ReorderParticipants {
                connection_id,
                source,
                target,
            } => self.handle_reorder(connection_id, source, target),

            SessionCommand::ChangeUsername {
                connection_id,
                username,
            } => self.handle_change_username(connection_id, username),

            SessionCommand::Disconnect { connection_id } => self.handle_disconnect(connection_id),

            SessionCommand::Tick { session_id, epoch } => Ok(self.handle_tick(session_id, epoch)),
        }
    }

    // ===== Queries =====

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn session(&self, id: &SessionId) -> Option<&Session> {
        self.registry.get(id)
    }

    /// Session the connection currently belongs to
    pub fn session_of(&self, connection_id: ConnectionId) -> Option<&Session> {
        self.affinity
            .get(&connection_id)
            .and_then(|id| self.registry.get(id))
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    pub fn connection_count(&self) -> usize {
        self.affinity.len()
    }

    pub fn snapshot(&self, id: &SessionId) -> Option<SessionSnapshot> {
        self.registry.get(id).map(Session::snapshot)
    }

    // ===== Membership =====

    fn handle_join(
        &mut self,
        connection_id: ConnectionId,
        requested: Option<String>,
        username: String,
    ) -> Result<Vec<Dispatch>, RouterError> {
        let requested = match requested.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match SessionId::parse(raw) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(%connection_id, error = %e, "Ignoring requested session id");
                    None
                }
            },
        };
        Participant::validate_name(&username).map_err(SessionError::from)?;

        let current = self.affinity.get(&connection_id).cloned();
        if let (Some(current), Some(requested)) = (&current, &requested) {
            if current == requested {
                let session = self
                    .registry
                    .get(current)
                    .ok_or_else(|| RouterError::SessionNotFound(current.clone()))?;
                debug!(session_id = %current, %connection_id, "Already joined");
                return Ok(vec![Dispatch::to(
                    connection_id,
                    ServerEvent::session_joined(connection_id, session.snapshot()),
                )]);
            }
        }

        let mut dispatches = Vec::new();
        if current.is_some() {
            dispatches.extend(self.handle_disconnect(connection_id)?);
        }

        let (session, created) =
            self.registry
                .create_or_join(requested, connection_id, &username)?;
        let session_id = session.id().clone();

        info!(
            session_id = %session_id,
            connection_id = %connection_id,
            created,
            participants = session.len(),
            "Participant joined"
        );

        dispatches.push(Dispatch::to(
            connection_id,
            ServerEvent::session_joined(connection_id, session.snapshot()),
        ));
        if session.len() > 1 {
            dispatches.push(Dispatch::broadcast_except(
                session,
                connection_id,
                ServerEvent::ParticipantJoined {
                    participants: session.participants().to_vec(),
                },
            ));
        }

        self.affinity.insert(connection_id, session_id);
        Ok(dispatches)
    }

    fn handle_disconnect(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Vec<Dispatch>, RouterError> {
        let session_id = self
            .affinity
            .remove(&connection_id)
            .ok_or(RouterError::NotInSession(connection_id))?;

        let removal = self
            .registry
            .remove(&session_id, connection_id)
            .ok_or_else(|| RouterError::SessionNotFound(session_id.clone()))?;

        info!(
            session_id = %session_id,
            connection_id = %connection_id,
            username = removal.participant().username(),
            "Participant left"
        );

        match removal {
            Removal::Closed(_) => Ok(Vec::new()),
            Removal::Left(_) => {
                let session = self
                    .registry
                    .get(&session_id)
                    .ok_or_else(|| RouterError::SessionNotFound(session_id.clone()))?;
                Ok(vec![Dispatch::broadcast(
                    session,
                    ServerEvent::ParticipantLeft {
                        participants: session.participants().to_vec(),
                    },
                )])
            }
        }
    }

    // ===== Timer =====

    fn handle_start_timer(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Vec<Dispatch>, RouterError> {
        let session = resolve(&self.affinity, &mut self.registry, connection_id)?;

        if !session.start_timer(self.ticker.as_mut()) {
            debug!(session_id = %session.id(), "Timer already running");
            return Ok(Vec::new());
        }

        info!(session_id = %session.id(), remaining = session.timer().remaining(), "Timer started");
        Ok(vec![Dispatch::broadcast(
            session,
            ServerEvent::TimerStarted { is_running: true },
        )])
    }

    fn handle_pause_timer(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Vec<Dispatch>, RouterError> {
        let session = resolve(&self.affinity, &mut self.registry, connection_id)?;

        if !session.pause_timer() {
            debug!(session_id = %session.id(), "Timer not running");
            return Ok(Vec::new());
        }

        info!(session_id = %session.id(), remaining = session.timer().remaining(), "Timer paused");
        Ok(vec![Dispatch::broadcast(
            session,
            ServerEvent::TimerPaused {
                is_running: false,
                time_remaining: session.timer().remaining(),
            },
        )])
    }

    fn handle_reset_timer(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Vec<Dispatch>, RouterError> {
        let policy = self.registry.settings().reset_policy;
        let session = resolve(&self.affinity, &mut self.registry, connection_id)?;

        let stopped = session.reset_timer(policy);

        info!(session_id = %session.id(), stopped, "Timer reset");
        Ok(vec![Dispatch::broadcast(
            session,
            ServerEvent::TimerReset {
                time_remaining: session.timer().remaining(),
                is_running: session.timer().is_running(),
            },
        )])
    }

    fn handle_update_duration(
        &mut self,
        connection_id: ConnectionId,
        seconds: u32,
    ) -> Result<Vec<Dispatch>, RouterError> {
        if !(MIN_CLIENT_DURATION_SECS..=MAX_DURATION_SECS).contains(&seconds) {
            return Err(RouterError::InvalidDuration(seconds));
        }
        let session = resolve(&self.affinity, &mut self.registry, connection_id)?;

        session.set_timer_duration(seconds)?;

        info!(session_id = %session.id(), duration = seconds, "Timer duration updated");
        Ok(vec![Dispatch::broadcast(
            session,
            ServerEvent::TimerDurationUpdated {
                timer_duration: session.timer().duration(),
                time_remaining: session.timer().remaining(),
            },
        )])
    }

    fn handle_tick(&mut self, session_id: SessionId, epoch: u64) -> Vec<Dispatch> {
        let Some(session) = self.registry.get_mut(&session_id) else {
            debug!(session_id = %session_id, epoch, "Tick for closed session");
            return Vec::new();
        };

        match session.tick(epoch) {
            TickOutcome::Ignored => {
                debug!(session_id = %session_id, epoch, "Stale tick ignored");
                Vec::new()
            }
            TickOutcome::Updated { remaining } => vec![Dispatch::broadcast(
                session,
                ServerEvent::TimerUpdate {
                    time_remaining: remaining,
                },
            )],
            // The final countdown update reaches zero before the expiry notice
            TickOutcome::Expired => {
                info!(session_id = %session_id, "Timer ended, roles rotated");
                vec![
                    Dispatch::broadcast(session, ServerEvent::TimerUpdate { time_remaining: 0 }),
                    Dispatch::broadcast(
                        session,
                        ServerEvent::TimerEnded {
                            participants: session.participants().to_vec(),
                            time_remaining: session.timer().remaining(),
                            is_running: false,
                        },
                    ),
                ]
            }
        }
    }

    // ===== Roster =====

    fn handle_update_roles(
        &mut self,
        connection_id: ConnectionId,
        roles: Vec<String>,
    ) -> Result<Vec<Dispatch>, RouterError> {
        let session = resolve(&self.affinity, &mut self.registry, connection_id)?;

        session.replace_roles(&roles)?;

        info!(session_id = %session.id(), roles = session.roles().len(), "Roles updated");
        Ok(vec![Dispatch::broadcast(
            session,
            ServerEvent::RolesUpdated {
                roles: session.roles().as_slice().to_vec(),
                participants: session.participants().to_vec(),
            },
        )])
    }

    fn handle_reorder(
        &mut self,
        connection_id: ConnectionId,
        source: ConnectionId,
        target: ConnectionId,
    ) -> Result<Vec<Dispatch>, RouterError> {
        let session = resolve(&self.affinity, &mut self.registry, connection_id)?;

        session.reorder(source, target)?;

        debug!(session_id = %session.id(), %source, %target, "Participants reordered");
        Ok(vec![Dispatch::broadcast(
            session,
            ServerEvent::ParticipantsReordered {
                participants: session.participants().to_vec(),
            },
        )])
    }

    fn handle_change_username(
        &mut self,
        connection_id: ConnectionId,
        username: String,
    ) -> Result<Vec<Dispatch>, RouterError> {
        let session = resolve(&self.affinity, &mut self.registry, connection_id)?;

        let Some(old_username) = session.rename(connection_id, &username)? else {
            return Ok(Vec::new());
        };
        let new_username = session
            .participant(connection_id)
            .map(|p| p.username().to_string())
            .ok_or(SessionError::ParticipantNotFound(connection_id))?;

        info!(
            session_id = %session.id(),
            %old_username,
            %new_username,
            "Username changed"
        );
        Ok(vec![Dispatch::broadcast(
            session,
            ServerEvent::UsernameChanged {
                participant_id: connection_id,
                old_username,
                new_username,
                participants: session.participants().to_vec(),
            },
        )])
    }
}

fn resolve<'a>(
    affinity: &HashMap<ConnectionId, SessionId>,
    registry: &'a mut SessionRegistry,
    connection_id: ConnectionId,
) -> Result<&'a mut Session, RouterError> {
    let session_id = affinity
        .get(&connection_id)
        .ok_or(RouterError::NotInSession(connection_id))?;

    registry
        .get_mut(session_id)
        .ok_or_else(|| RouterError::SessionNotFound(session_id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ManualTicker, ParticipantError, ResetPolicy, RoleError};

    fn setup() -> (SessionEventLoop, ManualTicker) {
        let ticker = ManualTicker::new();
        (SessionEventLoop::with_ticker(ticker.clone()), ticker)
    }

    fn join(
        event_loop: &mut SessionEventLoop,
        session_id: Option<&SessionId>,
        name: &str,
    ) -> (ConnectionId, SessionId) {
        let connection_id = ConnectionId::new();
        event_loop
            .handle_command(SessionCommand::Join {
                connection_id,
                session_id: session_id.map(|id| id.to_string()),
                username: name.to_string(),
            })
            .unwrap();
        let session_id = event_loop.session_of(connection_id).unwrap().id().clone();
        (connection_id, session_id)
    }

    fn tick(
        event_loop: &mut SessionEventLoop,
        ticker: &ManualTicker,
        id: &SessionId,
    ) -> Vec<Dispatch> {
        let epoch = ticker.active_epoch(id).unwrap();
        event_loop
            .handle_command(SessionCommand::Tick {
                session_id: id.clone(),
                epoch,
            })
            .unwrap()
    }

    #[test]
    fn test_join_creates_session_and_replies_only_to_joiner() {
        let (mut event_loop, _) = setup();
        let alice = ConnectionId::new();

        let dispatches = event_loop
            .handle_command(SessionCommand::Join {
                connection_id: alice,
                session_id: None,
                username: "Alice".to_string(),
            })
            .unwrap();

        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].recipients, vec![alice]);
        match &dispatches[0].event {
            ServerEvent::SessionJoined {
                participant_id,
                participants,
                timer_duration,
                is_running,
                ..
            } => {
                assert_eq!(*participant_id, alice);
                assert_eq!(participants.len(), 1);
                assert_eq!(participants[0].role(), Some("Driver"));
                assert_eq!(*timer_duration, 600);
                assert!(!is_running);
            }
            _ => panic!("Expected SessionJoined"),
        }
        assert_eq!(event_loop.session_count(), 1);
    }

    #[test]
    fn test_second_join_notifies_existing_members() {
        let (mut event_loop, _) = setup();
        let (alice, session_id) = join(&mut event_loop, None, "Alice");
        let bob = ConnectionId::new();

        let dispatches = event_loop
            .handle_command(SessionCommand::Join {
                connection_id: bob,
                session_id: Some(session_id.to_string()),
                username: "Bob".to_string(),
            })
            .unwrap();

        assert_eq!(dispatches.len(), 2);
        assert_eq!(dispatches[0].recipients, vec![bob]);
        assert_eq!(dispatches[1].recipients, vec![alice]);
        match &dispatches[1].event {
            ServerEvent::ParticipantJoined { participants } => {
                assert_eq!(participants[1].username(), "Bob");
                assert_eq!(participants[1].role(), Some("Navigator"));
            }
            _ => panic!("Expected ParticipantJoined"),
        }
    }

    #[test]
    fn test_empty_session_id_creates_new_session() {
        let (mut event_loop, _) = setup();
        let connection_id = ConnectionId::new();

        event_loop
            .handle_command(SessionCommand::Join {
                connection_id,
                session_id: Some("   ".to_string()),
                username: "Alice".to_string(),
            })
            .unwrap();

        assert!(event_loop.session_of(connection_id).is_some());
    }

    #[test]
    fn test_join_accepts_free_form_session_id() {
        let (mut event_loop, _) = setup();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();

        for (id, name) in [(alice, "Alice"), (bob, "Bob")] {
            event_loop
                .handle_command(SessionCommand::Join {
                    connection_id: id,
                    session_id: Some(" team room ünd café ".to_string()),
                    username: name.to_string(),
                })
                .unwrap();
        }

        let session = event_loop.session_of(alice).unwrap();
        assert_eq!(session.id().as_str(), "team room ünd café");
        assert_eq!(session.len(), 2);
        assert_eq!(event_loop.session_count(), 1);
    }

    #[test]
    fn test_join_with_unusable_session_id_gets_fresh_session() {
        let (mut event_loop, _) = setup();
        let connection_id = ConnectionId::new();
        let too_long = "x".repeat(65);

        let dispatches = event_loop
            .handle_command(SessionCommand::Join {
                connection_id,
                session_id: Some(too_long.clone()),
                username: "Alice".to_string(),
            })
            .unwrap();

        assert!(matches!(
            dispatches[0].event,
            ServerEvent::SessionJoined { .. }
        ));
        let session = event_loop.session_of(connection_id).unwrap();
        assert_ne!(session.id().as_str(), too_long);
        assert_eq!(event_loop.session_count(), 1);
    }

    #[test]
    fn test_rejoining_current_session_keeps_its_state() {
        let (mut event_loop, ticker) = setup();
        let room = SessionId::parse("room").unwrap();
        let (alice, _) = join(&mut event_loop, Some(&room), "Alice");
        event_loop
            .handle_command(SessionCommand::UpdateRoles {
                connection_id: alice,
                roles: vec![
                    "Driver".to_string(),
                    "Navigator".to_string(),
                    "Scribe".to_string(),
                ],
            })
            .unwrap();
        event_loop
            .handle_command(SessionCommand::UpdateTimerDuration {
                connection_id: alice,
                seconds: 1200,
            })
            .unwrap();
        event_loop
            .handle_command(SessionCommand::StartTimer {
                connection_id: alice,
            })
            .unwrap();

        let dispatches = event_loop
            .handle_command(SessionCommand::Join {
                connection_id: alice,
                session_id: Some("room".to_string()),
                username: "Alice".to_string(),
            })
            .unwrap();

        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].recipients, vec![alice]);
        match &dispatches[0].event {
            ServerEvent::SessionJoined {
                roles,
                timer_duration,
                is_running,
                participants,
                ..
            } => {
                assert_eq!(roles.len(), 3);
                assert_eq!(*timer_duration, 1200);
                assert!(*is_running);
                assert_eq!(participants.len(), 1);
            }
            other => panic!("Expected SessionJoined, got {:?}", other),
        }
        assert!(ticker.is_active(&room));
        assert_eq!(event_loop.session_count(), 1);
    }

    #[test]
    fn test_join_with_blank_name_keeps_previous_membership() {
        let (mut event_loop, _) = setup();
        let (alice, session_id) = join(&mut event_loop, None, "Alice");

        let result = event_loop.handle_command(SessionCommand::Join {
            connection_id: alice,
            session_id: None,
            username: "  ".to_string(),
        });

        assert_eq!(
            result,
            Err(RouterError::Session(SessionError::Participant(
                ParticipantError::EmptyName
            )))
        );
        assert_eq!(event_loop.session_of(alice).unwrap().id(), &session_id);
    }

    #[test]
    fn test_rejoin_leaves_previous_session() {
        let (mut event_loop, _) = setup();
        let (alice, first) = join(&mut event_loop, None, "Alice");
        let (bob, _) = join(&mut event_loop, Some(&first), "Bob");

        let dispatches = event_loop
            .handle_command(SessionCommand::Join {
                connection_id: alice,
                session_id: None,
                username: "Alice".to_string(),
            })
            .unwrap();

        assert!(matches!(
            dispatches[0].event,
            ServerEvent::ParticipantLeft { .. }
        ));
        assert_eq!(dispatches[0].recipients, vec![bob]);
        assert_eq!(event_loop.session(&first).unwrap().len(), 1);
        assert_ne!(event_loop.session_of(alice).unwrap().id(), &first);
        assert_eq!(event_loop.session_count(), 2);
    }

    #[test]
    fn test_commands_before_join_are_unresolved() {
        let (mut event_loop, _) = setup();
        let stranger = ConnectionId::new();

        let result = event_loop.handle_command(SessionCommand::StartTimer {
            connection_id: stranger,
        });

        assert_eq!(result, Err(RouterError::NotInSession(stranger)));
        assert!(result.unwrap_err().is_unresolved());
    }

    #[test]
    fn test_start_is_broadcast_once() {
        let (mut event_loop, ticker) = setup();
        let (alice, session_id) = join(&mut event_loop, None, "Alice");
        let (bob, _) = join(&mut event_loop, Some(&session_id), "Bob");

        let dispatches = event_loop
            .handle_command(SessionCommand::StartTimer {
                connection_id: bob,
            })
            .unwrap();

        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].recipients, vec![alice, bob]);
        assert_eq!(
            dispatches[0].event,
            ServerEvent::TimerStarted { is_running: true }
        );
        assert!(ticker.is_active(&session_id));

        let again = event_loop
            .handle_command(SessionCommand::StartTimer {
                connection_id: alice,
            })
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(ticker.scheduled_count(), 1);
    }

    #[test]
    fn test_pause_reports_remaining_time() {
        let (mut event_loop, ticker) = setup();
        let (alice, session_id) = join(&mut event_loop, None, "Alice");
        event_loop
            .handle_command(SessionCommand::StartTimer {
                connection_id: alice,
            })
            .unwrap();
        tick(&mut event_loop, &ticker, &session_id);
        tick(&mut event_loop, &ticker, &session_id);

        let dispatches = event_loop
            .handle_command(SessionCommand::PauseTimer {
                connection_id: alice,
            })
            .unwrap();

        assert_eq!(
            dispatches[0].event,
            ServerEvent::TimerPaused {
                is_running: false,
                time_remaining: 598,
            }
        );
        assert!(!ticker.is_active(&session_id));

        let idle = event_loop
            .handle_command(SessionCommand::PauseTimer {
                connection_id: alice,
            })
            .unwrap();
        assert!(idle.is_empty());
    }

    #[test]
    fn test_stale_tick_after_pause_is_ignored() {
        let (mut event_loop, ticker) = setup();
        let (alice, session_id) = join(&mut event_loop, None, "Alice");
        event_loop
            .handle_command(SessionCommand::StartTimer {
                connection_id: alice,
            })
            .unwrap();
        let epoch = ticker.active_epoch(&session_id).unwrap();
        event_loop
            .handle_command(SessionCommand::PauseTimer {
                connection_id: alice,
            })
            .unwrap();

        let dispatches = event_loop
            .handle_command(SessionCommand::Tick {
                session_id: session_id.clone(),
                epoch,
            })
            .unwrap();

        assert!(dispatches.is_empty());
        assert_eq!(
            event_loop.session(&session_id).unwrap().timer().remaining(),
            600
        );
    }

    #[test]
    fn test_reset_keeps_running_by_default() {
        let (mut event_loop, ticker) = setup();
        let (alice, session_id) = join(&mut event_loop, None, "Alice");
        event_loop
            .handle_command(SessionCommand::StartTimer {
                connection_id: alice,
            })
            .unwrap();
        tick(&mut event_loop, &ticker, &session_id);

        let dispatches = event_loop
            .handle_command(SessionCommand::ResetTimer {
                connection_id: alice,
            })
            .unwrap();

        assert_eq!(
            dispatches[0].event,
            ServerEvent::TimerReset {
                time_remaining: 600,
                is_running: true,
            }
        );
        assert!(ticker.is_active(&session_id));
    }

    #[test]
    fn test_reset_with_stop_policy() {
        let ticker = ManualTicker::new();
        let settings = SessionSettings::new().with_reset_policy(ResetPolicy::Stop);
        let mut event_loop = SessionEventLoop::new(settings, Box::new(ticker.clone()));
        let (alice, session_id) = join(&mut event_loop, None, "Alice");
        event_loop
            .handle_command(SessionCommand::StartTimer {
                connection_id: alice,
            })
            .unwrap();

        let dispatches = event_loop
            .handle_command(SessionCommand::ResetTimer {
                connection_id: alice,
            })
            .unwrap();

        assert_eq!(
            dispatches[0].event,
            ServerEvent::TimerReset {
                time_remaining: 600,
                is_running: false,
            }
        );
        assert!(!ticker.is_active(&session_id));
    }

    #[test]
    fn test_update_duration_bounds() {
        let (mut event_loop, _) = setup();
        let (alice, session_id) = join(&mut event_loop, None, "Alice");

        for seconds in [0, 59, 3601] {
            let result = event_loop.handle_command(SessionCommand::UpdateTimerDuration {
                connection_id: alice,
                seconds,
            });
            assert_eq!(result, Err(RouterError::InvalidDuration(seconds)));
        }

        let dispatches = event_loop
            .handle_command(SessionCommand::UpdateTimerDuration {
                connection_id: alice,
                seconds: 60,
            })
            .unwrap();

        assert_eq!(
            dispatches[0].event,
            ServerEvent::TimerDurationUpdated {
                timer_duration: 60,
                time_remaining: 60,
            }
        );
        assert_eq!(
            event_loop.snapshot(&session_id).unwrap().timer_duration,
            60
        );
    }

    #[test]
    fn test_expiry_rotates_roles() {
        let (mut event_loop, ticker) = setup();
        let (alice, session_id) = join(&mut event_loop, None, "Alice");
        join(&mut event_loop, Some(&session_id), "Bob");
        event_loop
            .handle_command(SessionCommand::UpdateTimerDuration {
                connection_id: alice,
                seconds: 60,
            })
            .unwrap();
        event_loop
            .handle_command(SessionCommand::StartTimer {
                connection_id: alice,
            })
            .unwrap();

        for _ in 0..59 {
            let dispatches = tick(&mut event_loop, &ticker, &session_id);
            assert!(matches!(
                dispatches[0].event,
                ServerEvent::TimerUpdate { .. }
            ));
        }
        let dispatches = tick(&mut event_loop, &ticker, &session_id);

        assert_eq!(dispatches.len(), 2);
        assert_eq!(
            dispatches[0].event,
            ServerEvent::TimerUpdate { time_remaining: 0 }
        );
        match &dispatches[1].event {
            ServerEvent::TimerEnded {
                participants,
                time_remaining,
                is_running,
            } => {
                assert_eq!(participants[0].role(), Some("Navigator"));
                assert_eq!(participants[1].role(), Some("Driver"));
                assert_eq!(*time_remaining, 60);
                assert!(!is_running);
            }
            _ => panic!("Expected TimerEnded"),
        }
        assert!(!ticker.is_active(&session_id));
    }

    #[test]
    fn test_update_roles() {
        let (mut event_loop, _) = setup();
        let (alice, session_id) = join(&mut event_loop, None, "Alice");
        join(&mut event_loop, Some(&session_id), "Bob");

        let dispatches = event_loop
            .handle_command(SessionCommand::UpdateRoles {
                connection_id: alice,
                roles: vec!["Driver".to_string(), "Tester".to_string()],
            })
            .unwrap();

        match &dispatches[0].event {
            ServerEvent::RolesUpdated {
                roles,
                participants,
            } => {
                assert_eq!(roles, &vec!["Driver".to_string(), "Tester".to_string()]);
                assert_eq!(participants[1].role(), Some("Tester"));
            }
            _ => panic!("Expected RolesUpdated"),
        }
    }

    #[test]
    fn test_update_roles_rejects_empty_list() {
        let (mut event_loop, _) = setup();
        let (alice, _) = join(&mut event_loop, None, "Alice");

        let result = event_loop.handle_command(SessionCommand::UpdateRoles {
            connection_id: alice,
            roles: Vec::new(),
        });

        assert_eq!(
            result,
            Err(RouterError::Session(SessionError::Role(RoleError::Empty)))
        );
    }

    #[test]
    fn test_reorder_unknown_participant() {
        let (mut event_loop, _) = setup();
        let (alice, _) = join(&mut event_loop, None, "Alice");
        let ghost = ConnectionId::new();

        let result = event_loop.handle_command(SessionCommand::ReorderParticipants {
            connection_id: alice,
            source: ghost,
            target: alice,
        });

        assert_eq!(
            result,
            Err(RouterError::Session(SessionError::ParticipantNotFound(ghost)))
        );
    }

    #[test]
    fn test_change_username() {
        let (mut event_loop, _) = setup();
        let (alice, _) = join(&mut event_loop, None, "Alice");

        let dispatches = event_loop
            .handle_command(SessionCommand::ChangeUsername {
                connection_id: alice,
                username: "  Alicia ".to_string(),
            })
            .unwrap();

        match &dispatches[0].event {
            ServerEvent::UsernameChanged {
                participant_id,
                old_username,
                new_username,
                ..
            } => {
                assert_eq!(*participant_id, alice);
                assert_eq!(old_username, "Alice");
                assert_eq!(new_username, "Alicia");
            }
            _ => panic!("Expected UsernameChanged"),
        }

        let unchanged = event_loop
            .handle_command(SessionCommand::ChangeUsername {
                connection_id: alice,
                username: "Alicia".to_string(),
            })
            .unwrap();
        assert!(unchanged.is_empty());
    }

    #[test]
    fn test_last_disconnect_closes_session() {
        let (mut event_loop, ticker) = setup();
        let (alice, session_id) = join(&mut event_loop, None, "Alice");
        event_loop
            .handle_command(SessionCommand::StartTimer {
                connection_id: alice,
            })
            .unwrap();

        let dispatches = event_loop
            .handle_command(SessionCommand::Disconnect {
                connection_id: alice,
            })
            .unwrap();

        assert!(dispatches.is_empty());
        assert_eq!(event_loop.session_count(), 0);
        assert_eq!(event_loop.connection_count(), 0);
        assert!(!ticker.is_active(&session_id));

        let late = event_loop
            .handle_command(SessionCommand::Tick {
                session_id,
                epoch: 1,
            })
            .unwrap();
        assert!(late.is_empty());
    }

    #[test]
    fn test_disconnect_hands_driver_role_on() {
        let (mut event_loop, _) = setup();
        let (alice, session_id) = join(&mut event_loop, None, "Alice");
        let (bob, _) = join(&mut event_loop, Some(&session_id), "Bob");
        let (carol, _) = join(&mut event_loop, Some(&session_id), "Carol");

        let dispatches = event_loop
            .handle_command(SessionCommand::Disconnect {
                connection_id: alice,
            })
            .unwrap();

        assert_eq!(dispatches[0].recipients, vec![bob, carol]);
        match &dispatches[0].event {
            ServerEvent::ParticipantLeft { participants } => {
                assert_eq!(participants.len(), 2);
                assert_eq!(participants[0].role(), Some("Navigator"));
                assert_eq!(participants[1].role(), Some("Driver"));
            }
            _ => panic!("Expected ParticipantLeft"),
        }
    }

    #[test]
    fn test_disconnect_unknown_connection() {
        let (mut event_loop, _) = setup();
        let ghost = ConnectionId::new();

        assert_eq!(
            event_loop.handle_command(SessionCommand::Disconnect {
                connection_id: ghost
            }),
            Err(RouterError::NotInSession(ghost))
        );
    }
}
