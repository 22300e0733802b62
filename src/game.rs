//! A game: one level plus the ways a human moves the player through it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error, info, trace};

use crate::board::Direction;
use crate::error::{BoardError, EntityError, GameResult};
use crate::level::{Level, LevelObserver};
use crate::schedule::Scheduler;
use crate::strategy::StrategyKind;
use crate::unit::{Player, Unit};

/// The continuous movement currently steering the player.
struct Heading {
    direction: Direction,
    /// Set to end the task; it checks the flag before every move
    finished: Arc<AtomicBool>,
}

impl Heading {
    fn finish(self) {
        self.finished.store(true, Ordering::Release);
        trace!(direction = %self.direction, "Continuous movement finished");
    }
}

/// The part of a game its level observer can end. Owns no worker thread, so the
/// observer never tears one down from inside a move.
///
/// Ending takes no start/stop lock, so an observer can end the game while `stop` waits
/// on the move it is called from.
#[derive(Default)]
struct Session {
    in_progress: AtomicBool,
    heading: Mutex<Option<Heading>>,
}

impl Session {
    fn end(&self, level: &Level) {
        if !self.in_progress.swap(false, Ordering::AcqRel) {
            debug!("Game already stopped");
            return;
        }

        if let Some(heading) = self.heading.lock().take() {
            heading.finish();
        }
        level.stop();
        info!("Game stopped");
    }
}

/// Ends the game as soon as its level is decided.
struct GameObserver {
    session: Arc<Session>,
    level: Weak<Level>,
}

impl GameObserver {
    fn end(&self) {
        // The level calling us is still owned by whoever is moving on it
        if let Some(level) = self.level.upgrade() {
            self.session.end(&level);
        }
    }
}

impl LevelObserver for GameObserver {
    fn level_won(&self) {
        self.end();
    }

    fn level_lost(&self) {
        self.end();
    }
}

/// Runs one level and moves its player on request.
pub struct Game {
    level: Arc<Level>,
    session: Arc<Session>,
    observer: Arc<dyn LevelObserver>,
    /// Serializes start and stop requests
    progress: Mutex<()>,
    /// Created on the first continuous movement and kept until the game is dropped
    motion: Mutex<Option<Scheduler>>,
}

impl Game {
    pub fn new(level: Arc<Level>) -> Arc<Game> {
        let session = Arc::new(Session::default());
        let observer = Arc::new(GameObserver {
            session: Arc::clone(&session),
            level: Arc::downgrade(&level),
        });
        Arc::new(Game {
            level,
            session,
            observer,
            progress: Mutex::new(()),
            motion: Mutex::new(None),
        })
    }

    /// Creates a game for `player` alone, registering it with the level.
    pub fn single_player(level: Arc<Level>, player: &Arc<Player>) -> GameResult<Arc<Game>> {
        level.register_player(player)?;
        Ok(Self::new(level))
    }

    pub fn level(&self) -> &Arc<Level> {
        &self.level
    }

    pub fn players(&self) -> Vec<Arc<Player>> {
        self.level.players()
    }

    pub fn is_in_progress(&self) -> bool {
        self.session.in_progress.load(Ordering::Acquire)
    }

    /// Starts or resumes the game.
    ///
    /// Does nothing if the game is already running, if no player is alive or if the
    /// board holds no pellets.
    pub fn start(&self) -> GameResult<()> {
        let _progress = self.progress.lock();
        if self.is_in_progress() {
            debug!("Game already running");
            return Ok(());
        }
        if !self.level.is_any_player_alive() || self.level.remaining_pellets() == 0 {
            debug!("Game not started, the level is already decided");
            return Ok(());
        }

        self.level.add_observer(Arc::clone(&self.observer));
        self.level.start()?;
        // Raised after the level runs. A level decided in between is halted by the next move.
        self.session.in_progress.store(true, Ordering::Release);

        info!(players = self.level.players().len(), "Game started");
        Ok(())
    }

    /// Stops the game and its level. Continuous movement ends with it.
    pub fn stop(&self) {
        let _progress = self.progress.lock();
        self.session.end(&self.level);
    }

    /// Moves `player` one square right away. Does nothing while the game is stopped.
    pub fn move_player(&self, player: &Arc<Player>, direction: Direction) -> GameResult<()> {
        if !self.is_in_progress() {
            trace!(player = %player.id(), "Move ignored, game not running");
            return Ok(());
        }
        self.level.move_unit(&Unit::from(player), direction)
    }

    /// Keeps moving `player` in `direction`, one square per player interval, until the
    /// direction is changed or the game stops.
    ///
    /// A request towards a blocked square is ignored and the current movement, if any,
    /// carries on. Ignored as well while the game is stopped, and while the level's
    /// player is under AI control.
    ///
    /// # Errors
    ///
    /// Returns an error if `player` is not on the board, or if the timer thread cannot
    /// be spawned on first use.
    pub fn continuous_movement(&self, player: &Arc<Player>, direction: Direction) -> GameResult<()> {
        if !self.is_in_progress() {
            trace!(player = %player.id(), "Continuous movement ignored, game not running");
            return Ok(());
        }
        if self.level.strategy_kind() == Some(StrategyKind::Ai) {
            debug!(player = %player.id(), "Continuous movement ignored, player under AI control");
            return Ok(());
        }

        let unit = Unit::from(player);
        let from = player.square().ok_or(EntityError::NotPlaced(player.id()))?;
        let square = self.level.board().square(from).ok_or(BoardError::OutOfBounds(from))?;
        if !square.square_at(direction).is_accessible_to(&unit) {
            trace!(player = %unit, %direction, "Continuous movement blocked");
            return Ok(());
        }

        // Checked again under the heading lock, so a stop racing this call ends the new
        // movement too
        let mut heading = self.session.heading.lock();
        if !self.is_in_progress() {
            trace!(player = %unit, "Continuous movement ignored, game stopped meanwhile");
            return Ok(());
        }
        if let Some(previous) = heading.take() {
            previous.finish();
        }

        let mut motion = self.motion.lock();
        let scheduler = match motion.take() {
            Some(scheduler) => scheduler,
            None => Scheduler::new("continuous-movement")?,
        };

        let finished = Arc::new(AtomicBool::new(false));
        let level = Arc::downgrade(&self.level);
        let player = Arc::clone(player);
        let done = Arc::clone(&finished);

        scheduler.schedule_repeating(player.interval(), move |_| {
            if done.load(Ordering::Acquire) {
                return None;
            }
            let level = level.upgrade()?;
            if let Err(e) = level.move_unit(&unit, direction) {
                error!(player = %unit, error = %e, "Continuous move failed");
            }
            Some(player.interval())
        });

        debug!(%direction, "Continuous movement started");
        *heading = Some(Heading { direction, finished });
        *motion = Some(scheduler);
        Ok(())
    }

    /// The direction of the continuous movement in effect, if any.
    pub fn continuous_direction(&self) -> Option<Direction> {
        self.session.heading.lock().as_ref().map(|heading| heading.direction)
    }
}
