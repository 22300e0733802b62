//! Everything that can stand on a square.
//!
//! [`Unit`] is a closed set of shared handles. Every kind has a [`Body`] holding its
//! identity, the square it stands on and the direction it faces; the kind-specific state
//! (score, policy, point value) lives next to it.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glam::IVec2;
use parking_lot::Mutex;
use strum_macros::{Display, EnumDiscriminants};

use crate::board::{Direction, TraversalFlags};

pub mod ghost;
pub mod pellet;
pub mod player;

pub use self::ghost::{Ghost, GhostType};
pub use self::pellet::Pellet;
pub use self::player::Player;

/// Next available unit ID
static NEXT_ID: AtomicU32 = AtomicU32::new(0);

/// Process-unique identity of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u32);

impl UnitId {
    fn next() -> Self {
        UnitId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Placement {
    square: Option<IVec2>,
    direction: Direction,
}

/// Identity and placement shared by every kind of unit.
#[derive(Debug)]
pub struct Body {
    id: UnitId,
    placement: Mutex<Placement>,
}

impl Body {
    pub(crate) fn new(direction: Direction) -> Self {
        Self {
            id: UnitId::next(),
            placement: Mutex::new(Placement { square: None, direction }),
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    /// The position of the square this unit stands on, or `None` when it is off the board.
    pub fn square(&self) -> Option<IVec2> {
        self.placement.lock().square
    }

    /// The direction this unit faces.
    pub fn direction(&self) -> Direction {
        self.placement.lock().direction
    }

    pub fn set_direction(&self, direction: Direction) {
        self.placement.lock().direction = direction;
    }

    /// Only the board may move units, so occupancy lists and placements stay in sync.
    pub(crate) fn set_square(&self, square: Option<IVec2>) {
        self.placement.lock().square = square;
    }
}

/// A movement interval that can be read and changed from any thread.
#[derive(Debug)]
pub(crate) struct Interval(AtomicU64);

impl Interval {
    pub(crate) fn new(interval: Duration) -> Self {
        Self(AtomicU64::new(interval.as_micros() as u64))
    }

    pub(crate) fn get(&self) -> Duration {
        Duration::from_micros(self.0.load(Ordering::Relaxed))
    }

    pub(crate) fn set(&self, interval: Duration) {
        self.0.store(interval.as_micros() as u64, Ordering::Relaxed);
    }
}

/// Any unit that can occupy a square.
///
/// Cloning a `Unit` clones the handle, not the unit. Two handles are equal when they
/// refer to the same unit.
#[derive(Debug, Clone, EnumDiscriminants)]
#[strum_discriminants(name(UnitKind), derive(Display, Hash))]
pub enum Unit {
    Player(Arc<Player>),
    Ghost(Arc<Ghost>),
    Pellet(Arc<Pellet>),
}

impl Unit {
    pub fn body(&self) -> &Body {
        match self {
            Unit::Player(player) => player.body(),
            Unit::Ghost(ghost) => ghost.body(),
            Unit::Pellet(pellet) => pellet.body(),
        }
    }

    pub fn id(&self) -> UnitId {
        self.body().id()
    }

    pub fn kind(&self) -> UnitKind {
        self.into()
    }

    pub fn square(&self) -> Option<IVec2> {
        self.body().square()
    }

    pub fn direction(&self) -> Direction {
        self.body().direction()
    }

    pub fn set_direction(&self, direction: Direction) {
        self.body().set_direction(direction);
    }

    /// The square flags this unit needs to enter a square. Pellets never move.
    pub fn traversal_flags(&self) -> TraversalFlags {
        match self {
            Unit::Player(_) => TraversalFlags::PACMAN,
            Unit::Ghost(_) => TraversalFlags::GHOST,
            Unit::Pellet(_) => TraversalFlags::empty(),
        }
    }

    pub fn as_player(&self) -> Option<&Arc<Player>> {
        match self {
            Unit::Player(player) => Some(player),
            _ => None,
        }
    }

    pub fn is_pellet(&self) -> bool {
        matches!(self, Unit::Pellet(_))
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Unit {}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Ghost(ghost) => write!(f, "{}{}", ghost.ghost_type(), self.id()),
            _ => write!(f, "{}{}", self.kind(), self.id()),
        }
    }
}

impl From<&Arc<Player>> for Unit {
    fn from(player: &Arc<Player>) -> Self {
        Unit::Player(Arc::clone(player))
    }
}

impl From<&Arc<Ghost>> for Unit {
    fn from(ghost: &Arc<Ghost>) -> Self {
        Unit::Ghost(Arc::clone(ghost))
    }
}

impl From<&Arc<Pellet>> for Unit {
    fn from(pellet: &Arc<Pellet>) -> Self {
        Unit::Pellet(Arc::clone(pellet))
    }
}
