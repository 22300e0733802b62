//! Concurrent level engine for a Pac-Man style game.
//!
//! A [`level::Level`] owns a board, the non-player characters roaming it and the
//! rules applied when units meet. Every actor moves on its own timer; all moves are
//! serialized through the level, and observers learn when the level is won or lost.

pub mod board;
pub mod collision;
pub mod constants;
pub mod error;
pub mod formatter;
pub mod game;
pub mod input;
pub mod level;
pub mod logging;
pub mod navigation;
pub mod schedule;
pub mod strategy;
pub mod unit;
