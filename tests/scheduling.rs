use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pacman_engine::board::Direction;
use pacman_engine::level::Level;
use pacman_engine::strategy::{Autopilot, Strategy, StrategyKind};
use pacman_engine::unit::{GhostType, Player};
use pretty_assertions::assert_eq;
use speculoos::prelude::*;

mod common;
use common::{add_player, level_with_ghosts, pos, wait_until, RecordingObserver, ScriptedAutopilot, DEADLINE, TICK};

#[test]
fn test_ghosts_move_only_while_running() {
    let (level, ghosts) = level_with_ghosts(
        &["#######", "#P.  G#", "#######"],
        GhostType::Inky,
        TICK,
    );
    add_player(&level);
    let home = ghosts[0].square();

    level.start().unwrap();
    assert_that(&wait_until(DEADLINE, || ghosts[0].square() != home)).is_true();

    level.stop();
    let frozen = ghosts[0].square();
    thread::sleep(TICK * 5);
    assert_eq!(ghosts[0].square(), frozen);

    // Restarting creates fresh timers
    level.start().unwrap();
    assert_that(&wait_until(DEADLINE, || ghosts[0].square() != frozen)).is_true();
    level.stop();
}

#[test]
fn test_ghost_catches_player() {
    let (level, ghosts) = level_with_ghosts(
        &["#######", "#P .G #", "#######"],
        GhostType::Blinky,
        TICK,
    );
    let player = add_player(&level);
    let observer = Arc::new(RecordingObserver::default());
    level.add_observer(observer.clone());

    level.start().unwrap();
    assert_that(&wait_until(DEADLINE, || observer.lost() > 0)).is_true();
    level.stop();

    assert_that(&player.is_alive()).is_false();
    assert_that(&ghosts[0].square()).is_some();
    // Ghosts walk over pellets
    assert_that(&level.remaining_pellets()).is_equal_to(1);
    assert_that(&observer.won()).is_equal_to(0);
}

#[test]
fn test_ghost_interval_is_read_on_start() {
    let (level, ghosts) = level_with_ghosts(
        &["#######", "#P.  G#", "#######"],
        GhostType::Inky,
        Duration::from_secs(60),
    );
    add_player(&level);
    let home = ghosts[0].square();

    ghosts[0].set_interval(TICK);
    level.start().unwrap();
    assert_that(&wait_until(DEADLINE, || ghosts[0].square() != home)).is_true();
    level.stop();
}

#[test]
fn test_autopilot_clears_corridor() {
    let (level, _) = level_with_ghosts(&["#P...#"], GhostType::Blinky, TICK);
    let player = add_player(&level);
    let observer = Arc::new(RecordingObserver::default());
    level.add_observer(observer.clone());
    level.set_strategy(Strategy::ai());
    assert_eq!(level.strategy_kind(), Some(StrategyKind::Ai));

    level.start().unwrap();
    assert_that(&wait_until(DEADLINE, || observer.won() > 0)).is_true();
    level.stop();

    assert_eq!(player.square(), Some(pos(4, 0)));
    assert_that(&player.score()).is_equal_to(30);
}

#[test]
fn test_autopilot_stops_with_level() {
    let (level, _) = level_with_ghosts(&["#P....  #"], GhostType::Blinky, TICK);
    let player = add_player(&level);
    let autopilot = ScriptedAutopilot::new(&[Direction::Right]);
    level.set_strategy(Strategy::Ai(autopilot.clone()));

    level.start().unwrap();
    assert_that(&wait_until(DEADLINE, || player.score() > 0)).is_true();
    level.stop();

    let parked = player.square();
    thread::sleep(TICK * 5);
    assert_eq!(player.square(), parked);
}

#[test]
fn test_strategy_is_fixed_while_running() {
    let (level, _) = level_with_ghosts(&["#P..#"], GhostType::Blinky, TICK);
    add_player(&level);
    level.set_strategy(Strategy::Human);

    level.start().unwrap();
    level.set_strategy(Strategy::ai());
    assert_eq!(level.strategy_kind(), Some(StrategyKind::Human));
    level.stop();

    level.set_strategy(Strategy::ai());
    assert_eq!(level.strategy_kind(), Some(StrategyKind::Ai));
}

/// Thinks for a long time, then has nothing to say.
#[derive(Default)]
struct Ponderer {
    thinking: AtomicBool,
}

impl Autopilot for Ponderer {
    fn next_move(&self, _level: &Level, _player: &Arc<Player>) -> Option<Direction> {
        self.thinking.store(true, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(300));
        None
    }
}

#[test]
fn test_slow_autopilot_does_not_hold_up_ghosts() {
    let (level, ghosts) = level_with_ghosts(
        &["#####", "#G  #", "# # #", "#  P#", "#####"],
        GhostType::Inky,
        TICK,
    );
    add_player(&level);
    let ponderer = Arc::new(Ponderer::default());
    level.set_strategy(Strategy::Ai(ponderer.clone()));
    level.start().unwrap();
    assert_that(&wait_until(DEADLINE, || ponderer.thinking.load(Ordering::SeqCst))).is_true();

    // Around the ring the ghost can always go on, so every tick shows up as a new square
    let mut last = ghosts[0].square();
    let mut moves = 0;
    let until = Instant::now() + Duration::from_millis(200);
    while Instant::now() < until {
        let now = ghosts[0].square();
        if now != last {
            moves += 1;
            last = now;
        }
        thread::sleep(Duration::from_millis(2));
    }

    level.stop();
    assert_that(&moves).is_greater_than_or_equal_to(3);
}
