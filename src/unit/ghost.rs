//! Ghosts: autonomous units that pick their own next move.
//!
//! Each [`GhostType`] selects one movement policy. Every policy falls back to
//! wandering when it has nothing better to do, so a ghost only stands still when it is
//! walled in on all sides.

use std::sync::Arc;
use std::time::Duration;

use glam::IVec2;
use rand::seq::IndexedRandom;
use rand::Rng;
use smallvec::SmallVec;
use strum_macros::{AsRefStr, Display, EnumIter};
use tracing::{trace, warn};

use crate::board::{Board, Direction};
use crate::constants::ai::{CLYDE_SHYNESS, PINKY_LOOKAHEAD};
use crate::constants::timing::{
    BLINKY_INTERVAL, CLYDE_INTERVAL, GHOST_INTERVAL_VARIATION, INKY_INTERVAL, PINKY_INTERVAL,
};
use crate::navigation::{self, Route};
use crate::unit::{Body, Interval, Unit, UnitId};

/// The four classic ghost types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum GhostType {
    /// Chases the nearest player along the shortest path.
    Blinky,
    /// Aims a few squares ahead of where the player is facing.
    Pinky,
    /// Wanders at random.
    Inky,
    /// Chases from afar, runs away up close.
    Clyde,
}

impl GhostType {
    /// Returns the base movement interval for this ghost type.
    pub fn base_interval(self) -> Duration {
        match self {
            GhostType::Blinky => BLINKY_INTERVAL,
            GhostType::Pinky => PINKY_INTERVAL,
            GhostType::Inky => INKY_INTERVAL,
            GhostType::Clyde => CLYDE_INTERVAL,
        }
    }
}

/// A ghost roaming the board on its own timer.
#[derive(Debug)]
pub struct Ghost {
    body: Body,
    ghost_type: GhostType,
    interval: Interval,
    variation: Duration,
}

impl Ghost {
    /// Creates a ghost with its type's base interval and the default random variation.
    pub fn new(ghost_type: GhostType) -> Arc<Self> {
        Self::with_interval(ghost_type, ghost_type.base_interval(), GHOST_INTERVAL_VARIATION)
    }

    /// Creates a ghost moving every `interval` plus up to `variation` extra.
    pub fn with_interval(ghost_type: GhostType, interval: Duration, variation: Duration) -> Arc<Self> {
        Arc::new(Self {
            body: Body::new(Direction::Up),
            ghost_type,
            interval: Interval::new(interval),
            variation,
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

    pub fn ghost_type(&self) -> GhostType {
        self.ghost_type
    }

    /// The delay before this ghost's next move: the base interval plus a random share of
    /// the variation. Drawn anew on every call, so consecutive ticks drift apart.
    pub fn interval(&self) -> Duration {
        let base = self.interval.get();
        let extra = rand::rng().random_range(0..=self.variation.as_micros() as u64);
        base + Duration::from_micros(extra)
    }

    pub fn set_interval(&self, interval: Duration) {
        self.interval.set(interval);
    }

    /// Picks the direction of this ghost's next move, or `None` to skip a turn.
    pub fn next_move(self: &Arc<Self>, board: &Board) -> Option<Direction> {
        let me = Unit::from(self);
        let pos = self.square()?;

        let chosen = match self.ghost_type {
            GhostType::Blinky => nearest_player(board, pos, &me).and_then(|route| route.first()),
            GhostType::Pinky => self.ambush(board, pos, &me),
            GhostType::Inky => None,
            GhostType::Clyde => self.keep_distance(board, pos, &me),
        };

        chosen.or_else(|| self.wander(board, pos, &me))
    }

    fn ambush(&self, board: &Board, pos: IVec2, me: &Unit) -> Option<Direction> {
        let route = nearest_player(board, pos, me)?;
        let facing = board
            .square(route.target)?
            .occupants()
            .iter()
            .find_map(|unit| unit.as_player().map(|player| player.direction()))?;

        let target = board.wrap(route.target + facing.as_ivec2() * PINKY_LOOKAHEAD);
        navigation::shortest_path(board, pos, target, me)
            .and_then(|ahead| ahead.first())
            .or_else(|| route.first())
    }

    fn keep_distance(&self, board: &Board, pos: IVec2, me: &Unit) -> Option<Direction> {
        let route = nearest_player(board, pos, me)?;
        let toward = route.first()?;
        if route.len() > CLYDE_SHYNESS {
            return Some(toward);
        }

        let away = toward.opposite();
        let square = board.square(pos)?;
        square.square_at(away).is_accessible_to(me).then_some(away)
    }

    /// Random choice among the open directions, never turning back unless cornered.
    fn wander(&self, board: &Board, pos: IVec2, me: &Unit) -> Option<Direction> {
        let square = board.square(pos)?;
        let back = self.body.direction().opposite();

        let options: SmallVec<[Direction; 3]> = Direction::DIRECTIONS
            .into_iter()
            .filter(|direction| *direction != back && square.square_at(*direction).is_accessible_to(me))
            .collect();

        if let Some(direction) = options.choose(&mut rand::rng()) {
            return Some(*direction);
        }

        if square.square_at(back).is_accessible_to(me) {
            trace!(ghost = %me, direction = %back, "Ghost forced to reverse direction");
            Some(back)
        } else {
            warn!(ghost = %me, x = pos.x, y = pos.y, "Ghost stuck with no available directions");
            None
        }
    }
}

fn nearest_player(board: &Board, pos: IVec2, me: &Unit) -> Option<Route> {
    navigation::nearest(board, pos, me, |unit| unit.as_player().is_some_and(|player| player.is_alive()))
}
