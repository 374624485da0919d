//! # BALLSHOOTER Core
//!
//! Rigid-sphere simulation for a cube-shaped room:
//! - N balls stored as flat position/velocity arenas
//! - Fixed-size snapshot buffers recycled through a pool
//! - Per-tick integration, wall bounce, pairwise collision and gravity
//!
//! ## Architecture Rules
//!
//! 1. **No per-frame allocation once the pool is warm** - snapshot buffers are recycled
//! 2. **Data-oriented layout** - positions and velocities are contiguous `(x, y, z)` triples
//! 3. **Single owner** - a snapshot buffer lives in the pool, with the consumer, or with the
//!    simulation, never two at once
//!
//! ## Example
//!
//! ```rust,ignore
//! use ballshooter_core::{engine, BufferPool, SimConfig, SimulationState};
//!
//! let config = SimConfig::default();
//! let mut state = SimulationState::new(config)?;
//! let mut pool = BufferPool::new(config.byte_size());
//!
//! engine::step(&mut state, 1.0 / 90.0);
//! state.commit();
//!
//! let mut frame = pool.acquire();
//! state.copy_committed_into(&mut frame)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod engine;
pub mod error;
pub mod math;
pub mod memory;
pub mod state;

pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use math::Vec3;
pub use memory::{BufferPool, SnapshotBuffer};
pub use state::SimulationState;

/// Number of `f32` components stored per ball (`x`, `y`, `z`).
pub const COMPONENTS_PER_BALL: usize = 3;

/// Size in bytes of one stored component.
pub const BYTES_PER_COMPONENT: usize = std::mem::size_of::<f32>();
