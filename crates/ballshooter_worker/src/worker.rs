//! # Background Worker
//!
//! Host-facing handle to a simulation ticking on its own thread.
//!
//! ## Lifecycle
//!
//! ```text
//!            create()
//!               │
//!               ▼
//!   ┌──────── Idle ◀───────────┐
//!   │           │              │
//!   │  start()  ▼              │ stop()
//!   │        Running ──────────┘
//!   │           │
//!   │           │ tick thread panicked
//!   │           ▼
//!   └──────▶ Failed
//! ```
//!
//! ## Threading
//!
//! The simulation state, the buffer pool and the clock move into the tick
//! thread on `start()` and come back on `stop()`. While running, the host
//! reaches the thread through one command channel carrying returned buffers
//! and the stop signal. The inter-tick sleep is a timed receive on that
//! channel, so it is also the only point where the loop can be stopped.
//! A tick always runs to completion.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use ballshooter_core::engine;
use ballshooter_core::memory::check_size;
use ballshooter_core::{BufferPool, SimConfig, SimError, SimResult, SimulationState, SnapshotBuffer};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::publish::{PublishOutcome, Publisher, SnapshotSink};
use crate::tick::{TickClock, TickStats};

/// Name given to the tick thread.
pub const TICK_THREAD_NAME: &str = "ballshooter-tick";

/// Messages from the host side to the tick thread.
#[derive(Debug)]
enum Command {
    /// A consumer is done with a frame.
    Release(SnapshotBuffer),
    /// Leave the tick loop after the current sleep.
    Stop,
}

/// Consumer-side handle for giving frames back to the pool.
///
/// Cheap to clone and usable from any thread. Returned buffers are queued
/// to the tick thread and re-enter the pool before its next tick.
#[derive(Clone, Debug)]
pub struct BufferReturn {
    byte_size: usize,
    tx: Sender<Command>,
}

impl BufferReturn {
    /// Gives `buffer` back to the pool. The caller loses it.
    ///
    /// If the worker has been dropped the buffer is freed instead.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SizeMismatch`] if `buffer` is not one of this
    /// simulation's frame size.
    pub fn put(&self, buffer: SnapshotBuffer) -> SimResult<()> {
        check_size(self.byte_size, &buffer)?;
        if self.tx.send(Command::Release(buffer)).is_err() {
            tracing::trace!("worker gone, freeing returned buffer");
        }
        Ok(())
    }

    /// Byte size every returned buffer must have.
    #[must_use]
    pub const fn byte_size(&self) -> usize {
        self.byte_size
    }
}

/// Counters published by the tick thread for the host to read.
#[derive(Debug, Default)]
struct Shared {
    ticks: AtomicU64,
    allocated: AtomicUsize,
    stats: Mutex<TickStats>,
}

impl Shared {
    fn record(&self, core: &WorkerCore) {
        self.ticks.store(core.clock.tick_count(), Ordering::Relaxed);
        self.allocated.store(core.pool.allocated(), Ordering::Relaxed);
        *self.stats.lock() = *core.clock.stats();
    }
}

/// Everything the tick thread owns while running.
struct WorkerCore {
    state: SimulationState,
    pool: BufferPool,
    clock: TickClock,
    commands: Receiver<Command>,
}

impl WorkerCore {
    /// Moves every queued returned buffer into the pool.
    ///
    /// Only called while idle, when no stop can be in flight.
    fn absorb_pending(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            if let Command::Release(buffer) = command {
                self.release(buffer);
            }
        }
    }

    fn release(&mut self, buffer: SnapshotBuffer) {
        if let Err(e) = self.pool.release(buffer) {
            tracing::warn!(error = %e, "dropped returned buffer");
        }
    }

    /// Step, commit, publish.
    fn tick(&mut self, dt: f32, publisher: &Publisher) {
        engine::step(&mut self.state, dt);
        self.state.commit();

        match publisher.publish(&self.state, &mut self.pool) {
            Ok(PublishOutcome::Delivered) => {}
            Ok(PublishOutcome::NoSink) => tracing::debug!("no sink registered, frame not published"),
            Ok(PublishOutcome::Refused) => tracing::debug!("sink refused frame, returned to pool"),
            Err(e) => tracing::error!(error = %e, "publish failed"),
        }
    }
}

/// The tick loop. Returns the core once told to stop.
fn run(mut core: WorkerCore, publisher: &Publisher, shared: &Shared) -> WorkerCore {
    core.clock.start(Instant::now());

    loop {
        let timing = core.clock.begin_tick(Instant::now());
        tracing::trace!(tick = core.clock.tick_count(), dt = timing.dt, "tick");

        core.tick(timing.dt, publisher);

        let finished = Instant::now();
        if core.clock.end_tick(&timing, finished) {
            tracing::warn!(
                tick = core.clock.tick_count(),
                overrun = ?finished.saturating_duration_since(timing.deadline),
                "tick overran its deadline"
            );
        }
        shared.record(&core);

        // Sleep until the deadline, taking buffers back as they arrive.
        loop {
            match core.commands.recv_timeout(timing.remaining(Instant::now())) {
                Ok(Command::Release(buffer)) => core.release(buffer),
                Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => return core,
                Err(RecvTimeoutError::Timeout) => break,
            }
        }
    }
}

enum Phase {
    Idle(Box<WorkerCore>),
    Running(JoinHandle<WorkerCore>),
    Failed,
}

/// A simulation that ticks on a background thread and publishes each
/// committed frame to one sink.
///
/// ## Usage
///
/// ```rust,ignore
/// let mut sim = BallShooter::create(SimConfig::default())?;
/// let (tx, frames) = crossbeam_channel::bounded(2);
/// sim.set_callback(ChannelSink::new(tx));
/// let returns = sim.buffer_return();
/// sim.start()?;
///
/// // Render thread
/// for frame in frames.iter() {
///     draw(frame.as_slice());
///     returns.put(frame)?;
/// }
/// ```
pub struct BallShooter {
    config: SimConfig,
    phase: Phase,
    publisher: Publisher,
    shared: Arc<Shared>,
    returns: BufferReturn,
}

impl BallShooter {
    /// Builds a simulation with randomized placement. Does not start it.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if `config` does not validate.
    pub fn create(config: SimConfig) -> SimResult<Self> {
        Ok(Self::from_state(SimulationState::new(config)?))
    }

    /// Wraps an existing state, for hosts that place balls themselves.
    #[must_use]
    pub fn from_state(state: SimulationState) -> Self {
        let config = *state.config();
        let (tx, commands) = unbounded();
        let core = WorkerCore {
            pool: BufferPool::new(config.byte_size()),
            clock: TickClock::new(config.tick_duration()),
            state,
            commands,
        };

        Self {
            config,
            phase: Phase::Idle(Box::new(core)),
            publisher: Publisher::new(),
            shared: Arc::new(Shared::default()),
            returns: BufferReturn {
                byte_size: config.byte_size(),
                tx,
            },
        }
    }

    /// The configuration this simulation was built with.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Registers the frame sink, replacing any previous one.
    ///
    /// Takes effect from the next tick, whether or not the worker is running.
    pub fn set_callback(&self, sink: impl SnapshotSink + 'static) {
        self.publisher.set_sink(sink);
    }

    /// Removes the frame sink. Ticks keep running but publish nothing.
    pub fn clear_callback(&self) {
        self.publisher.clear_sink();
    }

    /// A handle consumers use to give frames back.
    #[must_use]
    pub fn buffer_return(&self) -> BufferReturn {
        self.returns.clone()
    }

    /// Starts ticking on a background thread. The first tick fires at once.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::AlreadyRunning`] if already started and
    /// [`SimError::WorkerUnavailable`] if the thread cannot be spawned or a
    /// previous run panicked.
    pub fn start(&mut self) -> SimResult<()> {
        let mut core = match std::mem::replace(&mut self.phase, Phase::Failed) {
            Phase::Idle(core) => core,
            running @ Phase::Running(_) => {
                self.phase = running;
                return Err(SimError::AlreadyRunning);
            }
            Phase::Failed => {
                return Err(SimError::WorkerUnavailable("a previous run panicked".into()));
            }
        };

        core.absorb_pending();
        let publisher = self.publisher.clone();
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(TICK_THREAD_NAME.into())
            .spawn(move || run(*core, &publisher, &shared))
            .map_err(|e| SimError::WorkerUnavailable(e.to_string()))?;

        tracing::info!(
            num_balls = self.config.num_balls,
            frame_rate = self.config.frame_rate,
            "simulation started"
        );
        self.phase = Phase::Running(handle);
        Ok(())
    }

    /// Stops ticking and takes the simulation back from the tick thread.
    ///
    /// Blocks until the current tick, if any, has finished. Frames still held
    /// by the consumer can be returned afterwards; they go straight to the
    /// pool.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NotRunning`] if not started and
    /// [`SimError::WorkerUnavailable`] if the tick thread panicked.
    pub fn stop(&mut self) -> SimResult<()> {
        let handle = match std::mem::replace(&mut self.phase, Phase::Failed) {
            Phase::Running(handle) => handle,
            other => {
                self.phase = other;
                return Err(SimError::NotRunning);
            }
        };

        // The tick thread holds the receiver until it exits.
        let _ = self.returns.tx.send(Command::Stop);
        let mut core = handle
            .join()
            .map_err(|_| SimError::WorkerUnavailable("tick thread panicked".into()))?;

        core.absorb_pending();
        self.shared.record(&core);
        tracing::info!(ticks = core.clock.tick_count(), "simulation stopped");
        self.phase = Phase::Idle(Box::new(core));
        Ok(())
    }

    /// Gives a delivered frame back to the pool.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SizeMismatch`] if `buffer` is not this
    /// simulation's frame size.
    pub fn return_buffer(&mut self, buffer: SnapshotBuffer) -> SimResult<()> {
        match &mut self.phase {
            Phase::Idle(core) => {
                core.absorb_pending();
                core.pool.release(buffer)
            }
            Phase::Running(_) | Phase::Failed => self.returns.put(buffer),
        }
    }

    /// Returns true between `start()` and `stop()`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running(_))
    }

    /// Ticks executed across all runs.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    /// Tick timing statistics across all runs.
    #[must_use]
    pub fn stats(&self) -> TickStats {
        *self.shared.stats.lock()
    }

    /// Frame buffers the pool has allocated so far.
    #[must_use]
    pub fn buffers_allocated(&self) -> usize {
        self.shared.allocated.load(Ordering::Relaxed)
    }

    /// The simulation state, available while idle.
    #[must_use]
    pub fn state(&self) -> Option<&SimulationState> {
        match &self.phase {
            Phase::Idle(core) => Some(&core.state),
            Phase::Running(_) | Phase::Failed => None,
        }
    }

    /// Free buffers in the pool, available while idle.
    #[must_use]
    pub fn free_buffers(&self) -> Option<usize> {
        match &self.phase {
            Phase::Idle(core) => Some(core.pool.free_count()),
            Phase::Running(_) | Phase::Failed => None,
        }
    }
}

impl Drop for BallShooter {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.stop() {
                tracing::error!(error = %e, "failed to stop simulation on drop");
            }
        }
    }
}
