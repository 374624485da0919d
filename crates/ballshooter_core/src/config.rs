//! # Simulation Configuration
//!
//! Fixed for the lifetime of a simulation. Loaded once at startup, either
//! built in code or parsed from a TOML file:
//!
//! ```toml
//! num_balls = 200
//! room_size = 6.0
//! radius = 0.1
//! dampening = 0.8
//! frame_rate = 90.0
//! seed = 42
//! ```
//!
//! Missing keys fall back to [`SimConfig::default`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::{BYTES_PER_COMPONENT, COMPONENTS_PER_BALL};

/// Default tick rate, matching a 90Hz headset refresh.
pub const DEFAULT_FRAME_RATE: f32 = 90.0;

/// Slowest accepted tick rate (one tick every 1000 seconds).
pub const MIN_FRAME_RATE: f32 = 0.001;

/// Default downward acceleration (length units per second squared).
pub const DEFAULT_GRAVITY: f32 = 9.8;

/// Construction parameters for a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of balls. Fixed for the simulation's lifetime.
    pub num_balls: usize,
    /// Edge length of the cube-shaped room.
    pub room_size: f32,
    /// Radius shared by every ball.
    pub radius: f32,
    /// Velocity scale applied on each bounce, in `[0, 1]`.
    pub dampening: f32,
    /// Ticks per second.
    pub frame_rate: f32,
    /// Downward acceleration applied once per ball per tick.
    pub gravity: f32,
    /// Seed for initial placement. `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_balls: 100,
            room_size: 6.0,
            radius: 0.1,
            dampening: 0.8,
            frame_rate: DEFAULT_FRAME_RATE,
            gravity: DEFAULT_GRAVITY,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Creates a configuration from the five required parameters.
    ///
    /// Gravity and seed take their defaults.
    #[must_use]
    pub fn new(num_balls: usize, room_size: f32, radius: f32, dampening: f32, frame_rate: f32) -> Self {
        Self {
            num_balls,
            room_size,
            radius,
            dampening,
            frame_rate,
            ..Self::default()
        }
    }

    /// Returns a copy with the given gravity.
    #[must_use]
    pub const fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Returns a copy with a fixed placement seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] naming the first bad parameter.
    pub fn validate(&self) -> SimResult<()> {
        if self.num_balls == 0 {
            return Err(invalid("num_balls must be greater than zero"));
        }
        if !is_positive(self.radius) {
            return Err(invalid(format!("radius must be positive, got {}", self.radius)));
        }
        if !is_positive(self.room_size - 2.0 * self.radius) {
            return Err(invalid(format!(
                "room_size must exceed 2 * radius ({}), got {}",
                2.0 * self.radius,
                self.room_size
            )));
        }
        if !(0.0..=1.0).contains(&self.dampening) {
            return Err(invalid(format!("dampening must lie in [0, 1], got {}", self.dampening)));
        }
        if !self.frame_rate.is_finite() || self.frame_rate < MIN_FRAME_RATE {
            return Err(invalid(format!(
                "frame_rate must be at least {MIN_FRAME_RATE}, got {}",
                self.frame_rate
            )));
        }
        if !self.gravity.is_finite() {
            return Err(invalid("gravity must be finite"));
        }
        if self.num_balls.checked_mul(COMPONENTS_PER_BALL * BYTES_PER_COMPONENT).is_none() {
            return Err(invalid("num_balls is too large"));
        }
        Ok(())
    }

    /// Number of `f32` components in one position or velocity array.
    #[inline]
    #[must_use]
    pub const fn component_count(&self) -> usize {
        self.num_balls * COMPONENTS_PER_BALL
    }

    /// Byte size of one snapshot buffer: `num_balls * 3 * 4`.
    #[inline]
    #[must_use]
    pub const fn byte_size(&self) -> usize {
        self.component_count() * BYTES_PER_COMPONENT
    }

    /// Target interval between tick starts.
    ///
    /// Call on a validated configuration.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate))
    }

    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] on a parse failure and
    /// [`SimError::InvalidConfig`] if a value is out of range.
    pub fn from_toml_str(text: &str) -> SimResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] if the file cannot be read or parsed and
    /// [`SimError::InvalidConfig`] if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn invalid(message: impl Into<String>) -> SimError {
    SimError::InvalidConfig(message.into())
}
