use std::sync::Arc;

use crate::board::Direction;
use crate::constants::scoring::PELLET_VALUE;
use crate::unit::{Body, UnitId};

/// A pellet worth a fixed number of points to the player eating it.
#[derive(Debug)]
pub struct Pellet {
    body: Body,
    value: u32,
}

impl Pellet {
    /// Creates a regular pellet worth [`PELLET_VALUE`] points.
    pub fn new() -> Arc<Self> {
        Self::with_value(PELLET_VALUE)
    }

    pub fn with_value(value: u32) -> Arc<Self> {
        Arc::new(Self {
            body: Body::new(Direction::default()),
            value,
        })
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn id(&self) -> UnitId {
        self.body.id()
    }

    pub fn value(&self) -> u32 {
        self.value
    }
}
