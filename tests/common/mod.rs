#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::IVec2;
use pacman_engine::board::{Board, Direction, TraversalFlags};
use pacman_engine::collision::PlayerCollisions;
use pacman_engine::level::{Level, LevelObserver};
use pacman_engine::strategy::Autopilot;
use pacman_engine::unit::{Ghost, GhostType, Pellet, Player, Unit};
use parking_lot::Mutex;

/// Fast enough for tests to finish quickly, slow enough to stay ordered
pub const TICK: Duration = Duration::from_millis(20);

/// Generous bound for anything timer driven
pub const DEADLINE: Duration = Duration::from_secs(5);

/// A board parsed from text, with its units already placed.
///
/// `#` wall, ` ` floor, `.` floor with a pellet, `P` player start,
/// `G` floor with a ghost, `=` ghost-only door.
pub struct Parsed {
    pub board: Board,
    pub starts: Vec<IVec2>,
    pub ghost_squares: Vec<IVec2>,
    pub pellets: Vec<Arc<Pellet>>,
}

pub fn parse_board(rows: &[&str]) -> Parsed {
    let height = rows.len();
    let width = rows[0].len();
    let mut terrain = Vec::with_capacity(width * height);
    let mut starts = Vec::new();
    let mut ghost_squares = Vec::new();
    let mut pellet_squares = Vec::new();

    for (y, row) in rows.iter().enumerate() {
        assert_eq!(row.len(), width, "ragged row {y}");
        for (x, c) in row.chars().enumerate() {
            let pos = IVec2::new(x as i32, y as i32);
            terrain.push(match c {
                '#' => TraversalFlags::empty(),
                '=' => TraversalFlags::GHOST,
                _ => TraversalFlags::ALL,
            });
            match c {
                'P' => starts.push(pos),
                'G' => ghost_squares.push(pos),
                '.' => pellet_squares.push(pos),
                _ => {}
            }
        }
    }

    let board = Board::new(width, height, terrain).unwrap();
    let pellets = pellet_squares
        .into_iter()
        .map(|pos| {
            let pellet = Pellet::new();
            board.place(&Unit::from(&pellet), pos).unwrap();
            pellet
        })
        .collect();

    Parsed {
        board,
        starts,
        ghost_squares,
        pellets,
    }
}

/// Builds a stopped level; every `G` becomes a ghost of `ghost_type` moving every `interval`.
pub fn level_with_ghosts(rows: &[&str], ghost_type: GhostType, interval: Duration) -> (Arc<Level>, Vec<Arc<Ghost>>) {
    let parsed = parse_board(rows);
    let ghosts: Vec<_> = parsed
        .ghost_squares
        .iter()
        .map(|pos| {
            let ghost = Ghost::with_interval(ghost_type, interval, Duration::ZERO);
            parsed.board.place(&Unit::from(&ghost), *pos).unwrap();
            ghost
        })
        .collect();

    let level = Level::new(parsed.board, ghosts.clone(), parsed.starts, PlayerCollisions).unwrap();
    (level, ghosts)
}

/// Builds a stopped level whose ghosts, if any, never get to move during a test.
pub fn level(rows: &[&str]) -> Arc<Level> {
    level_with_ghosts(rows, GhostType::Blinky, Duration::from_secs(60)).0
}

/// Registers a fresh player moving every [`TICK`].
pub fn add_player(level: &Level) -> Arc<Player> {
    let player = Player::with_interval(TICK);
    level.register_player(&player).unwrap();
    player
}

/// Polls `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

pub fn pos(x: i32, y: i32) -> IVec2 {
    IVec2::new(x, y)
}

/// Counts won/lost notifications.
#[derive(Default)]
pub struct RecordingObserver {
    pub won: AtomicUsize,
    pub lost: AtomicUsize,
}

impl RecordingObserver {
    pub fn won(&self) -> usize {
        self.won.load(Ordering::SeqCst)
    }

    pub fn lost(&self) -> usize {
        self.lost.load(Ordering::SeqCst)
    }
}

impl LevelObserver for RecordingObserver {
    fn level_won(&self) {
        self.won.fetch_add(1, Ordering::SeqCst);
    }

    fn level_lost(&self) {
        self.lost.fetch_add(1, Ordering::SeqCst);
    }
}

/// Replays a fixed list of directions, then keeps repeating the last one.
#[derive(Default)]
pub struct ScriptedAutopilot {
    script: Mutex<VecDeque<Direction>>,
    last: Mutex<Option<Direction>>,
    pub calls: AtomicUsize,
}

impl ScriptedAutopilot {
    pub fn new(script: &[Direction]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.iter().copied().collect()),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Autopilot for ScriptedAutopilot {
    fn next_move(&self, _level: &Level, _player: &Arc<Player>) -> Option<Direction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock();
        if let Some(next) = self.script.lock().pop_front() {
            *last = Some(next);
        }
        *last
    }
}
