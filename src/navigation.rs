//! Breadth-first search over the squares a unit may enter.
//!
//! Used by ghost policies and the autopilot. Paths follow the board's wrap-around
//! neighbours, so tunnels are shortcuts like any other corridor.

use glam::IVec2;
use pathfinding::prelude::bfs;
use smallvec::SmallVec;

use crate::board::{Board, Direction};
use crate::unit::Unit;

/// A path found by a search: where it ends and how to get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub target: IVec2,
    pub directions: Vec<Direction>,
}

impl Route {
    /// The first step of the route, or `None` when already standing on the target.
    pub fn first(&self) -> Option<Direction> {
        self.directions.first().copied()
    }

    /// The number of steps along the route.
    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }
}

/// The positions `traveller` can step to from `pos`.
pub fn neighbours(board: &Board, pos: IVec2, traveller: &Unit) -> SmallVec<[IVec2; 4]> {
    let Some(square) = board.square(pos) else {
        return SmallVec::new();
    };

    Direction::DIRECTIONS
        .iter()
        .map(|direction| square.square_at(*direction))
        .filter(|next| next.is_accessible_to(traveller))
        .map(|next| next.position())
        .collect()
}

/// The direction leading from `from` to the adjacent position `to`, if they touch.
pub fn direction_between(board: &Board, from: IVec2, to: IVec2) -> Option<Direction> {
    Direction::DIRECTIONS
        .into_iter()
        .find(|direction| board.wrap(from + direction.as_ivec2()) == to)
}

/// Shortest route for `traveller` from `from` to `to`.
pub fn shortest_path(board: &Board, from: IVec2, to: IVec2, traveller: &Unit) -> Option<Route> {
    let path = bfs(&from, |pos| neighbours(board, *pos, traveller), |pos| *pos == to)?;
    Some(route_along(board, &path))
}

/// Route to the closest square holding a unit (other than `traveller`) that matches `predicate`.
pub fn nearest(board: &Board, from: IVec2, traveller: &Unit, predicate: impl Fn(&Unit) -> bool) -> Option<Route> {
    let path = bfs(
        &from,
        |pos| neighbours(board, *pos, traveller),
        |pos| {
            board
                .square(*pos)
                .is_some_and(|square| square.has_occupant(|unit| unit != traveller && predicate(unit)))
        },
    )?;
    Some(route_along(board, &path))
}

fn route_along(board: &Board, path: &[IVec2]) -> Route {
    let directions = path
        .windows(2)
        .filter_map(|step| direction_between(board, step[0], step[1]))
        .collect();

    Route {
        target: path.last().copied().unwrap_or_default(),
        directions,
    }
}
