//! This module contains all the tuning constants used by the engine.

/// Movement pacing for every timed actor.
pub mod timing {
    use std::time::Duration;

    /// The delay between two moves of the player, both for continuous movement and the autopilot.
    pub const PLAYER_INTERVAL: Duration = Duration::from_millis(250);

    /// Base delay between two moves of Blinky.
    pub const BLINKY_INTERVAL: Duration = Duration::from_millis(250);
    /// Base delay between two moves of Pinky.
    pub const PINKY_INTERVAL: Duration = Duration::from_millis(200);
    /// Base delay between two moves of Inky.
    pub const INKY_INTERVAL: Duration = Duration::from_millis(250);
    /// Base delay between two moves of Clyde.
    pub const CLYDE_INTERVAL: Duration = Duration::from_millis(250);

    /// Upper bound of the random delay added to a ghost's base interval on every tick.
    pub const GHOST_INTERVAL_VARIATION: Duration = Duration::from_millis(50);
}

/// Points awarded by collisions.
pub mod scoring {
    /// The points a regular pellet is worth.
    pub const PELLET_VALUE: u32 = 10;
}

/// Distances (in squares) steering ghost and autopilot decisions.
pub mod ai {
    /// Clyde chases while farther than this from the player and flees once closer.
    pub const CLYDE_SHYNESS: usize = 8;
    /// How many squares ahead of the player Pinky aims.
    pub const PINKY_LOOKAHEAD: i32 = 4;
    /// The autopilot flees once a ghost is this close (path distance).
    pub const DANGER_DISTANCE: usize = 4;
}
