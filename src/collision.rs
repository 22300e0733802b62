//! What happens when a unit enters a square somebody already stands on.
//!
//! Collisions only change units and board occupancy. Deciding whether a level is over is
//! left to the level, which inspects the board after every move.

use tracing::trace;

use crate::board::Board;
use crate::unit::{Ghost, Pellet, Player, Unit};

/// A table of collision rules.
///
/// `collide` is called once for every unit that stood on a square before `mover`
/// entered it. Implementations must handle every pair of unit kinds.
pub trait CollisionMap: Send + Sync {
    fn collide(&self, board: &Board, mover: &Unit, collided: &Unit);
}

/// The classic rules: players eat pellets, ghosts kill players.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlayerCollisions;

impl PlayerCollisions {
    fn player_meets_ghost(&self, player: &Player, _ghost: &Ghost) {
        player.kill();
    }

    fn player_meets_pellet(&self, board: &Board, player: &Player, pellet: &Unit, value: &Pellet) {
        if board.remove(pellet) {
            player.add_points(value.value());
        }
    }
}

impl CollisionMap for PlayerCollisions {
    fn collide(&self, board: &Board, mover: &Unit, collided: &Unit) {
        if mover == collided {
            return;
        }

        trace!(mover = %mover, collided = %collided, "Collision");
        match (mover, collided) {
            (Unit::Player(player), Unit::Ghost(ghost)) | (Unit::Ghost(ghost), Unit::Player(player)) => {
                self.player_meets_ghost(player, ghost);
            }
            (Unit::Player(player), Unit::Pellet(pellet)) => {
                self.player_meets_pellet(board, player, collided, pellet);
            }
            (Unit::Pellet(pellet), Unit::Player(player)) => {
                self.player_meets_pellet(board, player, mover, pellet);
            }
            (Unit::Player(_), Unit::Player(_))
            | (Unit::Ghost(_), Unit::Ghost(_))
            | (Unit::Ghost(_), Unit::Pellet(_))
            | (Unit::Pellet(_), Unit::Ghost(_))
            | (Unit::Pellet(_), Unit::Pellet(_)) => {}
        }
    }
}
