//! Who steers the player.
//!
//! Under [`Strategy::Human`] the player only moves on request (see [`crate::game::Game`]).
//! Under [`Strategy::Ai`] the level drives the player itself: an [`Autopilot`] suggests
//! directions and a [`Pilot`] decides when to listen to it.

use std::fmt;
use std::sync::Arc;

use glam::IVec2;
use strum_macros::{Display, EnumDiscriminants};
use tracing::trace;

use crate::board::{Board, Direction, Square};
use crate::constants::ai::DANGER_DISTANCE;
use crate::level::Level;
use crate::navigation;
use crate::unit::{Player, Unit};

/// A source of directions for a computer-controlled player.
pub trait Autopilot: Send + Sync {
    /// The direction the player should take now, or `None` when there is nothing to do.
    fn next_move(&self, level: &Level, player: &Arc<Player>) -> Option<Direction>;
}

/// How the player of a level is controlled.
#[derive(Clone, EnumDiscriminants)]
#[strum_discriminants(name(StrategyKind), derive(Display, Hash))]
pub enum Strategy {
    /// Moves come from the input layer through the game.
    Human,
    /// The level moves the player on its own timer.
    Ai(Arc<dyn Autopilot>),
}

impl Strategy {
    /// An AI strategy using the default [`PelletSeeker`] autopilot.
    pub fn ai() -> Self {
        Strategy::Ai(Arc::new(PelletSeeker::default()))
    }

    pub fn kind(&self) -> StrategyKind {
        self.into()
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Strategy::{}", self.kind())
    }
}

/// Heads for the closest pellet, unless a ghost is too close, in which case it runs.
#[derive(Debug, Clone, Copy)]
pub struct PelletSeeker {
    /// Path distance at which a ghost becomes a threat
    pub danger_distance: usize,
}

impl Default for PelletSeeker {
    fn default() -> Self {
        Self {
            danger_distance: DANGER_DISTANCE,
        }
    }
}

impl PelletSeeker {
    fn flee(&self, board: &Board, pos: IVec2, me: &Unit, threat: IVec2) -> Option<Direction> {
        let square = board.square(pos)?;
        Direction::DIRECTIONS
            .into_iter()
            .filter(|direction| square.square_at(*direction).is_accessible_to(me))
            .max_by_key(|direction| {
                let next = square.square_at(*direction).position();
                navigation::shortest_path(board, next, threat, me).map_or(usize::MAX, |route| route.len())
            })
    }
}

impl Autopilot for PelletSeeker {
    fn next_move(&self, level: &Level, player: &Arc<Player>) -> Option<Direction> {
        let board = level.board();
        let me = Unit::from(player);
        let pos = player.square()?;

        let threat = level
            .ghosts()
            .iter()
            .filter_map(|ghost| ghost.square())
            .filter_map(|ghost| navigation::shortest_path(board, pos, ghost, &me))
            .min_by_key(|route| route.len())
            .filter(|route| route.len() <= self.danger_distance);

        if let Some(threat) = threat {
            trace!(player = %me, distance = threat.len(), "Autopilot fleeing");
            return self.flee(board, pos, &me, threat.target);
        }

        navigation::nearest(board, pos, &me, Unit::is_pellet).and_then(|route| route.first())
    }
}

/// Returns `true` if a unit heading in `heading` could turn off at `square`.
///
/// A vertically moving unit is at an intersection when it may go left or right; a
/// horizontally moving one when it may go up or down.
pub fn is_intersection(square: &Square<'_>, heading: Direction, unit: &Unit) -> bool {
    heading
        .perpendicular()
        .iter()
        .any(|direction| square.square_at(*direction).is_accessible_to(unit))
}

/// Drives an AI-controlled player one tick at a time.
///
/// The first decision is followed blindly. Afterwards the player keeps going straight
/// and only consults the autopilot at decision points, so it never dithers between two
/// directions in the middle of a corridor. A decision point is an intersection, or a
/// square where the way ahead is blocked.
pub struct Pilot {
    autopilot: Arc<dyn Autopilot>,
    heading: Option<Direction>,
}

impl Pilot {
    pub fn new(autopilot: Arc<dyn Autopilot>) -> Self {
        Self {
            autopilot,
            heading: None,
        }
    }

    /// The last direction the pilot committed to.
    pub fn heading(&self) -> Option<Direction> {
        self.heading
    }

    /// The direction to move the player this tick, or `None` to stay put.
    pub fn decide(&mut self, level: &Level, player: &Arc<Player>) -> Option<Direction> {
        let Some(heading) = self.heading else {
            let first = self.autopilot.next_move(level, player)?;
            self.heading = Some(first);
            return Some(first);
        };

        let board = level.board();
        let me = Unit::from(player);
        let square = board.square(player.square()?)?;

        let blocked = !square.square_at(heading).is_accessible_to(&me);
        if !blocked && !is_intersection(&square, heading, &me) {
            return Some(heading);
        }

        let next = self.autopilot.next_move(level, player)?;
        self.heading = Some(next);
        if square.square_at(next).is_accessible_to(&me) {
            Some(next)
        } else {
            trace!(player = %me, direction = %next, "Autopilot suggestion blocked, waiting");
            None
        }
    }
}
