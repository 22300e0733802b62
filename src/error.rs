//! Centralized error types for the engine.
//!
//! Most invalid requests (moving while stopped, starting twice, steering into a wall)
//! are silent no-ops. The errors below are reserved for a misconstructed level or a
//! misused API, conditions the caller has to fix rather than retry.

use std::io;

use glam::IVec2;

use crate::unit::UnitId;

/// Main error type for the engine.
///
/// This is the primary error type that should be used in public APIs.
#[derive(thiserror::Error, Debug)]
pub enum GameError {
    #[error("Board error: {0}")]
    Board(#[from] BoardError),

    #[error("Entity error: {0}")]
    Entity(#[from] EntityError),

    #[error("Level error: {0}")]
    Level(#[from] LevelError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Errors related to the board and its squares.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BoardError {
    #[error("Square out of bounds: ({}, {})", .0.x, .0.y)]
    OutOfBounds(IVec2),

    #[error("Terrain has {actual} squares, expected {expected}")]
    TerrainSize { expected: usize, actual: usize },

    #[error("Board must be at least 1x1, got {width}x{height}")]
    Empty { width: usize, height: usize },
}

/// Errors related to units.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EntityError {
    #[error("Unit {0} is not placed on the board")]
    NotPlaced(UnitId),
}

/// Errors related to level composition and the move protocol.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LevelError {
    #[error("Level has no start squares for players")]
    NoStartSquares,

    #[error("Start square ({}, {}) is not accessible to players", .0.x, .0.y)]
    InaccessibleStartSquare(IVec2),

    #[error("A unit was moved or registered while another move was being resolved on the same thread")]
    ReentrantMove,
}

/// Result type for engine operations.
pub type GameResult<T> = Result<T, GameError>;
