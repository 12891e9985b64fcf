use cucumber::{given, then, when};
use mobsync_core::{SessionCommand, SessionId};
use mobsync_tests::MobWorld;

pub fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

// ===== Given Steps =====

#[given(expr = "a session {string} with participants {string}")]
async fn session_with_participants(world: &mut MobWorld, session: String, names: String) {
    for name in split_names(&names) {
        world.join(&name, &session);
        assert!(world.last_error.is_none(), "join failed: {:?}", world.last_error);
    }
    world.clear_history();
}

#[given(expr = "{string} joins session {string}")]
#[when(expr = "{string} joins session {string}")]
async fn joins_session(world: &mut MobWorld, name: String, session: String) {
    world.join(&name, &session);
}

// ===== When Steps =====

#[when(expr = "{string} disconnects")]
async fn disconnects(world: &mut MobWorld, name: String) {
    let connection_id = world.known_participant(&name);
    world.execute(SessionCommand::Disconnect { connection_id });
}

// ===== Then Steps =====

#[then(expr = "session {string} exists with {int} participant(s)")]
async fn session_exists_with(world: &mut MobWorld, session: String, count: usize) {
    assert_eq!(world.session(&session).len(), count);
}

#[then(expr = "session {string} no longer exists")]
async fn session_gone(world: &mut MobWorld, session: String) {
    assert!(world
        .event_loop
        .session(&MobWorld::session_id(&session))
        .is_none());
}

#[then(expr = "a late tick for session {string} is silently ignored")]
async fn late_tick_ignored(world: &mut MobWorld, session: String) {
    world.execute(SessionCommand::Tick {
        session_id: SessionId::parse(&session).unwrap(),
        epoch: 1,
    });

    assert!(world.last_error.is_none());
    assert!(world.last_dispatches.is_empty());
}

#[then("no events were broadcast")]
async fn nothing_broadcast(world: &mut MobWorld) {
    assert!(world.last_error.is_none(), "unexpected error: {:?}", world.last_error);
    assert!(
        world.last_dispatches.is_empty(),
        "unexpected events: {:?}",
        world.last_dispatches
    );
}

#[then("the command was rejected")]
async fn command_rejected(world: &mut MobWorld) {
    assert!(world.last_error.is_some());
    assert!(world.last_dispatches.is_empty());
}
