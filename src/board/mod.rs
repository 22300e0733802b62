//! The grid of squares units live on.
//!
//! Terrain (walls, ghost-only doors) is fixed when the board is built; occupancy is the
//! only mutable state. All occupancy lists sit behind a single lock so relocating a unit
//! (leaving one square and entering another) is observed as one step by every reader.

pub mod direction;

use bitflags::bitflags;
use glam::IVec2;
use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::trace;

use crate::error::{BoardError, GameResult};
use crate::unit::Unit;

pub use self::direction::Direction;

bitflags! {
    /// Which classes of units may enter a square. A wall carries no flags.
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TraversalFlags: u8 {
        const PACMAN = 1 << 0;
        const GHOST = 1 << 1;
        const ALL = Self::PACMAN.bits() | Self::GHOST.bits();
    }
}

/// Units standing on one square, in arrival order.
type Occupants = SmallVec<[Unit; 2]>;

/// A rectangular grid of squares.
pub struct Board {
    width: usize,
    height: usize,
    /// Row-major terrain, immutable after construction
    terrain: Vec<TraversalFlags>,
    /// Row-major occupancy lists, indexed like `terrain`
    occupants: RwLock<Vec<Occupants>>,
}

impl Board {
    /// Creates an empty board from row-major terrain.
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero or `terrain` does not hold exactly
    /// `width * height` squares.
    pub fn new(width: usize, height: usize, terrain: Vec<TraversalFlags>) -> GameResult<Board> {
        if width == 0 || height == 0 {
            return Err(BoardError::Empty { width, height }.into());
        }

        let expected = width * height;
        if terrain.len() != expected {
            return Err(BoardError::TerrainSize {
                expected,
                actual: terrain.len(),
            }
            .into());
        }

        Ok(Board {
            width,
            height,
            terrain,
            occupants: RwLock::new(vec![Occupants::new(); expected]),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `true` if the position lies on the board.
    pub fn contains(&self, pos: IVec2) -> bool {
        self.index(pos).is_some()
    }

    /// Returns the square at the given column and row, if it exists.
    pub fn square_at(&self, x: usize, y: usize) -> Option<Square<'_>> {
        if x < self.width && y < self.height {
            Some(Square {
                board: self,
                position: IVec2::new(x as i32, y as i32),
            })
        } else {
            None
        }
    }

    /// Returns the square at the given position, if it exists.
    pub fn square(&self, pos: IVec2) -> Option<Square<'_>> {
        self.index(pos).map(|_| Square { board: self, position: pos })
    }

    /// Iterates over every square, row by row.
    pub fn squares(&self) -> impl Iterator<Item = Square<'_>> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).filter_map(move |x| self.square_at(x, y)))
    }

    /// Wraps a position around the board edges, the way tunnels connect opposite sides.
    pub fn wrap(&self, pos: IVec2) -> IVec2 {
        IVec2::new(pos.x.rem_euclid(self.width as i32), pos.y.rem_euclid(self.height as i32))
    }

    /// Puts a unit on the square at `pos`.
    ///
    /// If the unit already occupies a square it leaves that square in the same step, so
    /// it is never listed on zero or two squares at once. The unit is appended to the end
    /// of the destination's occupant list.
    pub fn place(&self, unit: &Unit, pos: IVec2) -> GameResult<()> {
        let index = self.index(pos).ok_or(BoardError::OutOfBounds(pos))?;

        let mut occupants = self.occupants.write();
        if let Some(previous) = unit.square().and_then(|p| self.index(p)) {
            occupants[previous].retain(|other| other != unit);
        }
        occupants[index].push(unit.clone());
        unit.body().set_square(Some(pos));

        trace!(unit = %unit, x = pos.x, y = pos.y, "Unit placed");
        Ok(())
    }

    /// Takes a unit off the board. Returns `false` if it was not on the board.
    pub fn remove(&self, unit: &Unit) -> bool {
        let mut occupants = self.occupants.write();
        let Some(index) = unit.square().and_then(|p| self.index(p)) else {
            return false;
        };

        let before = occupants[index].len();
        occupants[index].retain(|other| other != unit);
        unit.body().set_square(None);

        trace!(unit = %unit, "Unit removed from board");
        occupants[index].len() != before
    }

    /// Counts the units on the whole board matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Unit) -> bool) -> usize {
        self.occupants.read().iter().flatten().filter(|unit| predicate(unit)).count()
    }

    fn occupants_of(&self, pos: IVec2) -> Vec<Unit> {
        match self.index(pos) {
            Some(index) => self.occupants.read()[index].to_vec(),
            None => Vec::new(),
        }
    }

    fn any_occupant(&self, pos: IVec2, predicate: impl Fn(&Unit) -> bool) -> bool {
        match self.index(pos) {
            Some(index) => self.occupants.read()[index].iter().any(predicate),
            None => false,
        }
    }

    fn flags(&self, pos: IVec2) -> TraversalFlags {
        self.index(pos).map(|index| self.terrain[index]).unwrap_or_default()
    }

    fn index(&self, pos: IVec2) -> Option<usize> {
        let (x, y) = (usize::try_from(pos.x).ok()?, usize::try_from(pos.y).ok()?);
        (x < self.width && y < self.height).then_some(y * self.width + x)
    }
}

/// A view of one cell of a [`Board`].
///
/// Squares are identified by their grid coordinate; the board owns the cell data.
#[derive(Clone, Copy)]
pub struct Square<'a> {
    board: &'a Board,
    position: IVec2,
}

impl<'a> Square<'a> {
    pub fn position(&self) -> IVec2 {
        self.position
    }

    /// The unit classes allowed on this square.
    pub fn flags(&self) -> TraversalFlags {
        self.board.flags(self.position)
    }

    /// Returns the neighbouring square in `direction`, wrapping around the board edges.
    pub fn square_at(&self, direction: Direction) -> Square<'a> {
        Square {
            board: self.board,
            position: self.board.wrap(self.position + direction.as_ivec2()),
        }
    }

    /// Returns `true` if `unit` may enter this square.
    pub fn is_accessible_to(&self, unit: &Unit) -> bool {
        self.flags().intersects(unit.traversal_flags())
    }

    /// A snapshot of the units on this square, in arrival order.
    pub fn occupants(&self) -> Vec<Unit> {
        self.board.occupants_of(self.position)
    }

    /// Returns `true` if any unit on this square matches `predicate`.
    pub fn has_occupant(&self, predicate: impl Fn(&Unit) -> bool) -> bool {
        self.board.any_occupant(self.position, predicate)
    }
}

impl PartialEq for Square<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.board, other.board) && self.position == other.position
    }
}

impl Eq for Square<'_> {}

impl std::fmt::Debug for Square<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Square")
            .field("position", &self.position)
            .field("flags", &self.flags())
            .finish()
    }
}
