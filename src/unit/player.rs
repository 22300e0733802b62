//! The player character.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glam::IVec2;
use tracing::debug;

use crate::board::Direction;
use crate::constants::timing::PLAYER_INTERVAL;
use crate::unit::{Body, Interval, UnitId};

/// A player: a unit with a score and a life.
///
/// Score and life are only changed by collisions. Once dead, a player stays dead.
#[derive(Debug)]
pub struct Player {
    body: Body,
    score: AtomicU32,
    alive: AtomicBool,
    interval: Interval,
}

impl Player {
    /// Creates a living player with no points, moving every [`PLAYER_INTERVAL`].
    pub fn new() -> Arc<Self> {
        Self::with_interval(PLAYER_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            body: Body::new(Direction::Left),
            score: AtomicU32::new(0),
            alive: AtomicBool::new(true),
            interval: Interval::new(interval),
        })
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn id(&self) -> UnitId {
        self.body.id()
    }

    pub fn square(&self) -> Option<IVec2> {
        self.body.square()
    }

    pub fn direction(&self) -> Direction {
        self.body.direction()
    }

    pub fn score(&self) -> u32 {
        self.score.load(Ordering::Acquire)
    }

    pub fn add_points(&self, points: u32) {
        let total = self.score.fetch_add(points, Ordering::AcqRel) + points;
        debug!(player = %self.id(), points, total, "Points awarded");
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Kills the player. There is no way back.
    pub fn kill(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            debug!(player = %self.id(), "Player died");
        }
    }

    /// The delay between two timed moves of this player, read fresh on every tick.
    pub fn interval(&self) -> Duration {
        self.interval.get()
    }

    pub fn set_interval(&self, interval: Duration) {
        self.interval.set(interval);
    }
}
