//! # Simulation Error Types
//!
//! All errors the core and its worker surface to the host. None of them are
//! transient: each one is a programmer or integration error and is returned
//! to the caller as-is.

use thiserror::Error;

/// Errors that can occur while building or driving a simulation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// Construction parameters are out of range. Construction aborts.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A buffer handed back to the pool does not have the pool's byte size.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// The pool's configured byte size.
        expected: usize,
        /// The byte size of the rejected buffer.
        actual: usize,
    },

    /// `start()` was called on a worker that is already ticking.
    #[error("simulation is already running")]
    AlreadyRunning,

    /// `stop()` was called on a worker that is not ticking.
    #[error("simulation is not running")]
    NotRunning,

    /// The tick thread could not be spawned, or panicked and took the
    /// simulation with it.
    #[error("tick thread unavailable: {0}")]
    WorkerUnavailable(String),

    /// The configuration file could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    Config(String),
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
