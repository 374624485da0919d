//! # Memory Management
//!
//! Recycled snapshot buffers for allocation-free publishing.
//!
//! ## Design Philosophy
//!
//! A buffer is allocated the first time the pool runs dry and is then
//! recycled for the rest of the process:
//! - No per-frame allocation once the pool is warm
//! - The pool never shrinks
//! - Ownership moves, it is never shared

mod pool;

pub use pool::{check_size, BufferPool, SnapshotBuffer};
