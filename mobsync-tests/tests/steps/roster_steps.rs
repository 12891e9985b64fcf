use super::session_steps::split_names;
use cucumber::{given, then, when};
use mobsync_core::{ServerEvent, SessionCommand};
use mobsync_tests::MobWorld;

// ===== When Steps =====

#[when(expr = "{string} moves {string} onto {string}")]
async fn moves_onto(world: &mut MobWorld, actor: String, source: String, target: String) {
    let connection_id = world.known_participant(&actor);
    let source = world.known_participant(&source);
    let target = world.known_participant(&target);
    world.execute(SessionCommand::ReorderParticipants {
        connection_id,
        source,
        target,
    });
}

#[when(expr = "{string} sets the roles to {string}")]
async fn sets_roles(world: &mut MobWorld, name: String, roles: String) {
    let connection_id = world.known_participant(&name);
    world.execute(SessionCommand::UpdateRoles {
        connection_id,
        roles: split_names(&roles),
    });
}

#[when(expr = "{string} changes their name to {string}")]
async fn changes_name(world: &mut MobWorld, name: String, new_name: String) {
    let connection_id = world.known_participant(&name);
    world.execute(SessionCommand::ChangeUsername {
        connection_id,
        username: new_name,
    });
}

// ===== Then Steps =====

#[given(expr = "{string} holds the role {string} in {string}")]
#[then(expr = "{string} holds the role {string} in {string}")]
async fn holds_role(world: &mut MobWorld, name: String, role: String, session: String) {
    assert_eq!(world.role_of(&session, &name), Some(role));
}

#[given(expr = "{string} holds no role in {string}")]
#[then(expr = "{string} holds no role in {string}")]
async fn holds_no_role(world: &mut MobWorld, name: String, session: String) {
    assert_eq!(world.role_of(&session, &name), None);
}

#[then(expr = "the participant order of {string} is {string}")]
async fn participant_order(world: &mut MobWorld, session: String, names: String) {
    let order: Vec<String> = world
        .session(&session)
        .participants()
        .iter()
        .map(|p| p.username().to_string())
        .collect();

    assert_eq!(order, split_names(&names));
}

#[then(expr = "every participant of {string} was told about the new roles")]
async fn told_about_roles(world: &mut MobWorld, session: String) {
    let members = world.session(&session).member_ids();
    let dispatch = world
        .last_dispatches
        .first()
        .expect("No dispatch for role update");

    assert!(matches!(dispatch.event, ServerEvent::RolesUpdated { .. }));
    assert_eq!(dispatch.recipients, members);
}

#[then(expr = "everyone in {string} was told that {string} is now called {string}")]
async fn told_about_rename(world: &mut MobWorld, session: String, old: String, new: String) {
    let members = world.session(&session).member_ids();
    let dispatch = world
        .last_dispatches
        .first()
        .expect("No dispatch for rename");

    assert_eq!(dispatch.recipients, members);
    match &dispatch.event {
        ServerEvent::UsernameChanged {
            old_username,
            new_username,
            ..
        } => {
            assert_eq!(old_username, &old);
            assert_eq!(new_username, &new);
        }
        other => panic!("Expected UsernameChanged, got {:?}", other),
    }
}
