use cucumber::{given, then, when};
use mobsync_core::{ServerEvent, SessionCommand};
use mobsync_tests::MobWorld;

// ===== When Steps =====

#[given(expr = "{string} starts the timer")]
#[when(expr = "{string} starts the timer")]
async fn starts_timer(world: &mut MobWorld, name: String) {
    let connection_id = world.known_participant(&name);
    world.execute(SessionCommand::StartTimer { connection_id });
}

#[when(expr = "{string} pauses the timer")]
async fn pauses_timer(world: &mut MobWorld, name: String) {
    let connection_id = world.known_participant(&name);
    world.execute(SessionCommand::PauseTimer { connection_id });
}

#[when(expr = "{string} resets the timer")]
async fn resets_timer(world: &mut MobWorld, name: String) {
    let connection_id = world.known_participant(&name);
    world.execute(SessionCommand::ResetTimer { connection_id });
}

#[when(expr = "{string} sets the timer duration to {int} seconds")]
async fn sets_duration(world: &mut MobWorld, name: String, seconds: u32) {
    let connection_id = world.known_participant(&name);
    world.execute(SessionCommand::UpdateTimerDuration {
        connection_id,
        seconds,
    });
}

#[when(expr = "the timer of {string} ticks {int} times")]
async fn ticks(world: &mut MobWorld, session: String, times: usize) {
    for i in 0..times {
        assert!(world.tick(&session), "timer stopped after {} ticks", i);
    }
}

// ===== Then Steps =====

#[then(expr = "{int} timer updates were broadcast")]
async fn timer_updates(world: &mut MobWorld, count: usize) {
    let updates = world
        .events()
        .filter(|e| matches!(e, ServerEvent::TimerUpdate { .. }))
        .count();
    assert_eq!(updates, count);
}

#[then(expr = "the timer ended with {int} seconds remaining")]
async fn timer_ended(world: &mut MobWorld, seconds: u32) {
    let ended = world
        .events()
        .find_map(|e| match e {
            ServerEvent::TimerEnded {
                time_remaining,
                is_running,
                ..
            } => Some((*time_remaining, *is_running)),
            _ => None,
        })
        .expect("No timerEnded event");

    assert_eq!(ended, (seconds, false));
}

#[then(expr = "the timer of {string} shows {int} seconds remaining")]
async fn shows_remaining(world: &mut MobWorld, session: String, seconds: u32) {
    assert_eq!(world.session(&session).timer().remaining(), seconds);
}

#[then(expr = "the timer duration of {string} is {int} seconds")]
async fn duration_is(world: &mut MobWorld, session: String, seconds: u32) {
    assert_eq!(world.session(&session).timer().duration(), seconds);
}

#[then(expr = "the timer of {string} is running")]
async fn is_running(world: &mut MobWorld, session: String) {
    assert!(world.session(&session).timer().is_running());
    assert!(world.ticker.is_active(&MobWorld::session_id(&session)));
}

#[then(expr = "the timer of {string} is not running")]
async fn is_not_running(world: &mut MobWorld, session: String) {
    assert!(!world.session(&session).timer().is_running());
}

#[then(expr = "the timer of {string} cannot tick")]
async fn cannot_tick(world: &mut MobWorld, session: String) {
    assert!(!world.tick(&session));
}

#[then("no timer is running")]
async fn no_timer_running(world: &mut MobWorld) {
    assert_eq!(world.ticker.active_count(), 0);
}
