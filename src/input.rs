//! Commands from the input layer and how a game carries them out.

use strum_macros::AsRefStr;
use tracing::debug;

use crate::board::Direction;
use crate::error::{GameError, GameResult};
use crate::game::Game;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum GameCommand {
    /// Keep moving the player in this direction (a held key).
    MovePlayer(Direction),
    /// Move the player a single square.
    StepPlayer(Direction),
    Start,
    Stop,
    TogglePause,
}

impl Game {
    /// Carries out one command on behalf of the level's first player.
    ///
    /// # Errors
    ///
    /// Movement commands fail when no player is registered. Otherwise errors come from
    /// the operation the command maps to.
    pub fn handle_command(&self, command: GameCommand) -> GameResult<()> {
        debug!(command = command.as_ref(), "Handling command");
        match command {
            GameCommand::MovePlayer(direction) => {
                let player = self.level().player().ok_or_else(no_player)?;
                self.continuous_movement(&player, direction)
            }
            GameCommand::StepPlayer(direction) => {
                let player = self.level().player().ok_or_else(no_player)?;
                self.move_player(&player, direction)
            }
            GameCommand::Start => self.start(),
            GameCommand::Stop => {
                self.stop();
                Ok(())
            }
            GameCommand::TogglePause => {
                if self.is_in_progress() {
                    self.stop();
                    Ok(())
                } else {
                    self.start()
                }
            }
        }
    }
}

fn no_player() -> GameError {
    GameError::InvalidState("no player registered".to_string())
}
