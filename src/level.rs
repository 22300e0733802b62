//! A level: one board, the actors on it and the rules they play by.
//!
//! Two independent locks guard a level. The start/stop lock serializes state changes
//! (and owns the actor timers); the move lock serializes every change to board
//! occupancy. A stop request therefore never queues up behind a stream of moves, yet it
//! does not return before the move in flight, if any, has finished.
//!
//! Every actor runs on a worker of its own: one per ghost, plus one for the AI pilot.
//! A slow autopilot or a tick waiting for the move lock only delays its own actor.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use glam::IVec2;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::{debug, error, info, trace, warn};

use crate::board::{Board, Direction, TraversalFlags};
use crate::collision::CollisionMap;
use crate::error::{BoardError, EntityError, GameResult, LevelError};
use crate::formatter;
use crate::schedule::{Scheduler, TimerHandle};
use crate::strategy::{Autopilot, Pilot, Strategy, StrategyKind};
use crate::unit::{Ghost, Player, Unit};

/// Gets told when a level is won or lost.
///
/// Callbacks run synchronously while the move that ended the level still holds the move
/// lock. They may stop the level or the game, but must not move units: a move requested
/// from a callback fails with [`LevelError::ReentrantMove`].
pub trait LevelObserver: Send + Sync {
    /// All pellets are gone. Typically the level should be stopped.
    fn level_won(&self);

    /// No registered player is alive. Typically the level should be stopped.
    fn level_lost(&self);
}

#[derive(Default)]
struct Registry {
    players: Vec<Arc<Player>>,
    next_start: usize,
}

/// Everything created by `start` and torn down by `stop`.
///
/// Workers are spawned on the first start that needs them and kept for the lifetime of
/// the level; only the timers are per run.
#[derive(Default)]
struct Control {
    /// One per ghost, in ghost order
    npc_workers: Vec<Scheduler>,
    pilot_worker: Option<Scheduler>,
    npc_timers: Vec<TimerHandle>,
    pilot_timer: Option<TimerHandle>,
}

/// Clears the "move in progress" flag, even if a collision rule panics.
struct MoveScope<'a>(&'a Cell<bool>);

impl Drop for MoveScope<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// A running instance of one board with its players, ghosts and collision rules.
pub struct Level {
    me: Weak<Level>,
    board: Board,
    ghosts: Vec<Arc<Ghost>>,
    start_squares: Vec<IVec2>,
    collisions: Box<dyn CollisionMap>,
    in_progress: AtomicBool,
    /// The start/stop lock
    control: Mutex<Control>,
    /// The move lock; the flag marks a move being resolved by the owning thread
    move_lock: ReentrantMutex<Cell<bool>>,
    registry: Mutex<Registry>,
    observers: RwLock<Vec<Arc<dyn LevelObserver>>>,
    strategy: RwLock<Option<Strategy>>,
}

impl Level {
    /// Creates a stopped level.
    ///
    /// Ghosts are expected to stand on the board already. Players are placed on
    /// `start_squares` as they register, cycling through the list.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no start squares, or one of them is off the board or
    /// closed to players.
    pub fn new(
        board: Board,
        ghosts: Vec<Arc<Ghost>>,
        start_squares: Vec<IVec2>,
        collisions: impl CollisionMap + 'static,
    ) -> GameResult<Arc<Level>> {
        if start_squares.is_empty() {
            return Err(LevelError::NoStartSquares.into());
        }
        for pos in &start_squares {
            let square = board.square(*pos).ok_or(BoardError::OutOfBounds(*pos))?;
            if !square.flags().contains(TraversalFlags::PACMAN) {
                return Err(LevelError::InaccessibleStartSquare(*pos).into());
            }
        }
        for ghost in ghosts.iter().filter(|ghost| ghost.square().is_none()) {
            warn!(ghost = %Unit::from(ghost), "Ghost is not on the board and will never move");
        }

        debug!(
            width = board.width(),
            height = board.height(),
            ghosts = ghosts.len(),
            start_squares = start_squares.len(),
            "Level created"
        );
        Ok(Arc::new_cyclic(|me| Level {
            me: me.clone(),
            board,
            ghosts,
            start_squares,
            collisions: Box::new(collisions),
            in_progress: AtomicBool::new(false),
            control: Mutex::new(Control::default()),
            move_lock: ReentrantMutex::new(Cell::new(false)),
            registry: Mutex::new(Registry::default()),
            observers: RwLock::new(Vec::new()),
            strategy: RwLock::new(None),
        }))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The ghosts of this level, in construction order.
    pub fn ghosts(&self) -> &[Arc<Ghost>] {
        &self.ghosts
    }

    /// The registered players, in registration order.
    pub fn players(&self) -> Vec<Arc<Player>> {
        self.registry.lock().players.clone()
    }

    /// The first registered player.
    pub fn player(&self) -> Option<Arc<Player>> {
        self.registry.lock().players.first().cloned()
    }

    /// Registers a player and puts it on the next start square.
    ///
    /// Registering the same player again has no effect. Placing the player changes board
    /// occupancy, so this waits for a move in flight like any other move would.
    ///
    /// # Errors
    ///
    /// Returns an error if called from an observer callback of a move.
    pub fn register_player(&self, player: &Arc<Player>) -> GameResult<()> {
        let moving = self.move_lock.lock();
        if moving.get() {
            return Err(LevelError::ReentrantMove.into());
        }

        let mut registry = self.registry.lock();
        if registry.players.iter().any(|known| known.id() == player.id()) {
            trace!(player = %player.id(), "Player already registered");
            return Ok(());
        }

        let start = self.start_squares[registry.next_start];
        self.board.place(&Unit::from(player), start)?;
        registry.players.push(Arc::clone(player));
        registry.next_start = (registry.next_start + 1) % self.start_squares.len();

        debug!(player = %player.id(), x = start.x, y = start.y, "Player registered");
        Ok(())
    }

    /// Adds an observer. Adding the same observer twice has no effect.
    pub fn add_observer(&self, observer: Arc<dyn LevelObserver>) {
        let mut observers = self.observers.write();
        if !observers.iter().any(|known| same_observer(known, &observer)) {
            observers.push(observer);
        }
    }

    pub fn remove_observer(&self, observer: &Arc<dyn LevelObserver>) {
        self.observers.write().retain(|known| !same_observer(known, observer));
    }

    /// Chooses how the player is controlled from the next start on.
    ///
    /// Ignored while the level is running: the strategy of a running level is fixed.
    pub fn set_strategy(&self, strategy: Strategy) {
        let _control = self.control.lock();
        if self.is_in_progress() {
            warn!(strategy = %strategy.kind(), "Cannot change strategy while the level is running");
            return;
        }
        debug!(strategy = %strategy.kind(), "Strategy set");
        *self.strategy.write() = Some(strategy);
    }

    pub fn strategy(&self) -> Option<Strategy> {
        self.strategy.read().clone()
    }

    pub fn strategy_kind(&self) -> Option<StrategyKind> {
        self.strategy.read().as_ref().map(Strategy::kind)
    }

    /// Returns `true` while units may move.
    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Starts or resumes the level: ghosts get fresh timers, and so does the player when
    /// an AI strategy is set. Does nothing if the level is already running.
    ///
    /// # Errors
    ///
    /// Returns an error if an actor's worker thread cannot be spawned. The level stays
    /// stopped then.
    pub fn start(&self) -> GameResult<()> {
        let mut control = self.control.lock();
        if self.is_in_progress() {
            debug!("Level already running");
            return Ok(());
        }

        if control.npc_workers.is_empty() {
            control.npc_workers = self
                .ghosts
                .iter()
                .map(|ghost| Scheduler::new(&format!("ghost-{}", ghost.ghost_type())))
                .collect::<GameResult<Vec<_>>>()?;
        }
        let pilot = self.pilot_setup();
        if pilot.is_some() && control.pilot_worker.is_none() {
            control.pilot_worker = Some(Scheduler::new("autopilot")?);
        }

        self.in_progress.store(true, Ordering::Release);
        let control = &mut *control;
        control.npc_timers = self
            .ghosts
            .iter()
            .zip(&control.npc_workers)
            .map(|(ghost, worker)| self.schedule_npc(worker, ghost))
            .collect();
        control.pilot_timer = match (pilot, &control.pilot_worker) {
            (Some((autopilot, player)), Some(worker)) => Some(self.schedule_pilot(worker, autopilot, player)),
            _ => None,
        };

        info!(
            ghosts = self.ghosts.len(),
            autopilot = control.pilot_timer.is_some(),
            "Level started"
        );
        Ok(())
    }

    /// Stops the level: cancels every actor timer and refuses further moves.
    ///
    /// When this returns, no move is in progress and none will be made until the next
    /// start. Does nothing if the level is already stopped.
    pub fn stop(&self) {
        {
            let mut control = self.control.lock();
            if !self.in_progress.swap(false, Ordering::AcqRel) {
                debug!("Level already stopped");
                return;
            }

            for timer in control.npc_timers.drain(..) {
                timer.cancel();
            }
            if let Some(timer) = control.pilot_timer.take() {
                timer.cancel();
            }
        }

        // Wait out a move in flight. Re-entrant, so observers may stop the level mid-move.
        drop(self.move_lock.lock());
        info!("Level stopped");
    }

    /// Moves a unit one square in `direction`, resolving collisions and notifying observers.
    ///
    /// Does nothing while the level is stopped. The unit turns to face `direction` even
    /// if the destination is closed to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit is not on the board, or if called from an observer
    /// callback of another move.
    pub fn move_unit(&self, unit: &Unit, direction: Direction) -> GameResult<()> {
        self.resolve_move(unit, direction, None)
    }

    /// Like [`Level::move_unit`], but also does nothing once `timer` is cancelled. The
    /// check happens under the move lock, so a cancelled timer can never sneak a move in.
    pub(crate) fn move_timed(&self, unit: &Unit, direction: Direction, timer: &TimerHandle) -> GameResult<()> {
        self.resolve_move(unit, direction, Some(timer))
    }

    /// Returns `true` if at least one registered player is alive.
    pub fn is_any_player_alive(&self) -> bool {
        self.registry.lock().players.iter().any(|player| player.is_alive())
    }

    /// Counts the pellets left on the board.
    pub fn remaining_pellets(&self) -> usize {
        self.board.count(Unit::is_pellet)
    }

    fn resolve_move(&self, unit: &Unit, direction: Direction, timer: Option<&TimerHandle>) -> GameResult<()> {
        if !self.is_in_progress() {
            return Ok(());
        }

        let moving = self.move_lock.lock();
        if moving.get() {
            return Err(LevelError::ReentrantMove.into());
        }
        if !self.is_in_progress() || timer.is_some_and(TimerHandle::is_cancelled) {
            trace!(unit = %unit, "Move dropped, level stopped meanwhile");
            return Ok(());
        }

        moving.set(true);
        let _scope = MoveScope(&moving);

        self.relocate(unit, direction)?;
        formatter::increment_move();
        self.update_observers();
        Ok(())
    }

    fn relocate(&self, unit: &Unit, direction: Direction) -> GameResult<()> {
        unit.set_direction(direction);

        let from = unit.square().ok_or(EntityError::NotPlaced(unit.id()))?;
        let origin = self.board.square(from).ok_or(BoardError::OutOfBounds(from))?;
        let destination = origin.square_at(direction);

        if !destination.is_accessible_to(unit) {
            trace!(unit = %unit, %direction, "Move blocked");
            return Ok(());
        }

        // Snapshot before entering, so the mover never collides with itself
        let occupants = destination.occupants();
        self.board.place(unit, destination.position())?;
        trace!(unit = %unit, %direction, x = destination.position().x, y = destination.position().y, "Unit moved");

        for occupant in &occupants {
            self.collisions.collide(&self.board, unit, occupant);
        }
        Ok(())
    }

    fn update_observers(&self) {
        let lost = !self.is_any_player_alive();
        let won = self.remaining_pellets() == 0;
        if !lost && !won {
            return;
        }

        // Callbacks may add or remove observers
        let observers = self.observers.read().clone();
        if lost {
            info!("Level lost");
            for observer in &observers {
                observer.level_lost();
            }
        }
        if won {
            info!("Level won");
            for observer in &observers {
                observer.level_won();
            }
        }
    }

    /// The first tick comes after half an interval, so ghosts sharing an interval do not
    /// all move at once.
    fn schedule_npc(&self, scheduler: &Scheduler, ghost: &Arc<Ghost>) -> TimerHandle {
        let level = self.me.clone();
        let ghost = Arc::clone(ghost);
        let unit = Unit::from(&ghost);

        scheduler.schedule_repeating(ghost.interval() / 2, move |timer| {
            let level = level.upgrade()?;
            if let Some(direction) = ghost.next_move(level.board()) {
                if let Err(e) = level.move_timed(&unit, direction, timer) {
                    error!(ghost = %unit, error = %e, "Ghost move failed");
                }
            }
            Some(ghost.interval())
        })
    }

    /// The autopilot and the player it steers, if the AI strategy is set.
    fn pilot_setup(&self) -> Option<(Arc<dyn Autopilot>, Arc<Player>)> {
        let Some(Strategy::Ai(autopilot)) = self.strategy() else {
            return None;
        };
        let Some(player) = self.player() else {
            warn!("AI strategy set, but no player is registered");
            return None;
        };
        Some((autopilot, player))
    }

    fn schedule_pilot(&self, scheduler: &Scheduler, autopilot: Arc<dyn Autopilot>, player: Arc<Player>) -> TimerHandle {
        let level = self.me.clone();
        let unit = Unit::from(&player);
        let mut pilot = Pilot::new(autopilot);

        scheduler.schedule_repeating(player.interval(), move |timer| {
            let level = level.upgrade()?;
            if let Some(direction) = pilot.decide(&level, &player) {
                if let Err(e) = level.move_timed(&unit, direction, timer) {
                    error!(player = %unit, error = %e, "Autopilot move failed");
                }
            }
            Some(player.interval())
        })
    }
}

fn same_observer(a: &Arc<dyn LevelObserver>, b: &Arc<dyn LevelObserver>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
