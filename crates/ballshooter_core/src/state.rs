//! # Simulation State
//!
//! Flat arenas for N balls plus the last committed frame.
//!
//! ```text
//! positions:  [x0 y0 z0 | x1 y1 z1 | ... ]   live, mutated by the engine
//! velocities: [x0 y0 z0 | x1 y1 z1 | ... ]   live, mutated by the engine
//! committed:  [x0 y0 z0 | x1 y1 z1 | ... ]   full copy of positions at a tick boundary
//! ```
//!
//! A ball is an index into these arrays, never an owned object. Ball order is
//! fixed at creation and the arrays never change length.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::SimConfig;
use crate::error::SimResult;
use crate::math::Vec3;
use crate::memory::{check_size, SnapshotBuffer};

/// Half-width of the uniform range initial velocities are drawn from.
pub const INITIAL_SPEED_LIMIT: f32 = 0.005;

/// Distance kept between spawned balls and the X/Z walls.
pub const SPAWN_WALL_MARGIN: f32 = 1.0;

/// Live and committed state of every ball.
#[derive(Clone, Debug)]
pub struct SimulationState {
    config: SimConfig,
    positions: Vec<f32>,
    velocities: Vec<f32>,
    committed: Vec<f32>,
}

impl SimulationState {
    /// Creates a state with randomized initial placement.
    ///
    /// Uses `config.seed` when set, OS entropy otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`](crate::SimError::InvalidConfig) if
    /// the configuration does not validate.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(config, &mut rng)
    }

    /// Creates a state, drawing initial placement from `rng`.
    ///
    /// Positions are uniform in `[-room/2 + 1, room/2 - 1]` on X and Z and in
    /// `[0, room]` on Y. Velocities are uniform in `[-0.005, 0.005]` per axis.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`](crate::SimError::InvalidConfig) if
    /// the configuration does not validate.
    pub fn with_rng<R: Rng + ?Sized>(config: SimConfig, rng: &mut R) -> SimResult<Self> {
        let mut state = Self::zeroed(config)?;
        let half = config.room_size / 2.0;

        for i in 0..config.num_balls {
            let position = Vec3::new(
                uniform(rng, -half + SPAWN_WALL_MARGIN, half - SPAWN_WALL_MARGIN),
                uniform(rng, 0.0, config.room_size),
                uniform(rng, -half + SPAWN_WALL_MARGIN, half - SPAWN_WALL_MARGIN),
            );
            let velocity = Vec3::new(
                uniform(rng, -INITIAL_SPEED_LIMIT, INITIAL_SPEED_LIMIT),
                uniform(rng, -INITIAL_SPEED_LIMIT, INITIAL_SPEED_LIMIT),
                uniform(rng, -INITIAL_SPEED_LIMIT, INITIAL_SPEED_LIMIT),
            );
            position.store(&mut state.positions, i);
            velocity.store(&mut state.velocities, i);
        }

        Ok(state)
    }

    /// Creates a state with every ball at the origin and at rest.
    ///
    /// Place balls with [`set_ball`](Self::set_ball) afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`](crate::SimError::InvalidConfig) if
    /// the configuration does not validate.
    pub fn zeroed(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let len = config.component_count();
        Ok(Self {
            config,
            positions: vec![0.0; len],
            velocities: vec![0.0; len],
            committed: vec![0.0; len],
        })
    }

    /// The configuration this state was built from.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of balls.
    #[inline]
    #[must_use]
    pub const fn num_balls(&self) -> usize {
        self.config.num_balls
    }

    /// Overwrites the live position and velocity of ball `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.num_balls()`.
    pub fn set_ball(&mut self, index: usize, position: Vec3, velocity: Vec3) {
        position.store(&mut self.positions, index);
        velocity.store(&mut self.velocities, index);
    }

    /// Live position of ball `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.num_balls()`.
    #[inline]
    #[must_use]
    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::load(&self.positions, index)
    }

    /// Live velocity of ball `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.num_balls()`.
    #[inline]
    #[must_use]
    pub fn velocity(&self, index: usize) -> Vec3 {
        Vec3::load(&self.velocities, index)
    }

    /// Live positions as flat triples.
    #[inline]
    #[must_use]
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Live velocities as flat triples.
    #[inline]
    #[must_use]
    pub fn velocities(&self) -> &[f32] {
        &self.velocities
    }

    /// Both live arenas at once, for the engine.
    #[inline]
    pub(crate) fn arenas_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.positions, &mut self.velocities)
    }

    /// The last committed frame as flat triples.
    #[inline]
    #[must_use]
    pub fn committed(&self) -> &[f32] {
        &self.committed
    }

    /// Copies the live positions into the committed frame.
    ///
    /// Called once per tick, after the engine step and before publishing.
    pub fn commit(&mut self) {
        self.committed.copy_from_slice(&self.positions);
    }

    /// Fills `buffer` with the committed frame.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SizeMismatch`](crate::SimError::SizeMismatch) if
    /// `buffer` is not sized for this state's ball count.
    pub fn copy_committed_into(&self, buffer: &mut SnapshotBuffer) -> SimResult<()> {
        check_size(self.config.byte_size(), buffer)?;
        buffer.as_mut_slice().copy_from_slice(&self.committed);
        Ok(())
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, low: f32, high: f32) -> f32 {
    rng.gen::<f32>() * (high - low) + low
}
