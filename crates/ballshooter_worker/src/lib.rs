//! # BALLSHOOTER Worker
//!
//! Runs a [`ballshooter_core`] simulation at a fixed rate on a background
//! thread and hands each committed frame to a consumer.
//!
//! ## Per-tick flow
//!
//! ```text
//! clock fires ─▶ engine::step ─▶ commit ─▶ pool.acquire ─▶ copy ─▶ sink.deliver
//!      ▲                                                               │
//!      └──────── sleep until deadline, absorbing returned buffers ◀────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use ballshooter_worker::{BallShooter, ChannelSink, SimConfig};
//!
//! let mut sim = BallShooter::create(SimConfig::load("ballshooter.toml")?)?;
//! let (tx, frames) = crossbeam_channel::bounded(2);
//! sim.set_callback(ChannelSink::new(tx));
//! sim.start()?;
//! // ...
//! sim.stop()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod publish;
pub mod tick;
pub mod worker;

pub use publish::{ChannelSink, PublishOutcome, Publisher, SnapshotSink};
pub use tick::{TickClock, TickStats, TickTiming};
pub use worker::{BallShooter, BufferReturn, TICK_THREAD_NAME};

pub use ballshooter_core::{SimConfig, SimError, SimResult, SnapshotBuffer};
