//! # Publish Protocol
//!
//! Hands each committed frame to a single registered sink by moving the
//! buffer. After `deliver` returns `Ok`, the sink owns the frame and the
//! core never touches it again. The sink gives it back through
//! [`BufferReturn`](crate::BufferReturn) when it is done.
//!
//! ```text
//! pool ──acquire──▶ tick thread ──fill──▶ sink ──(consumer)──▶ BufferReturn ──▶ pool
//! ```
//!
//! A sink that never returns its frames makes the pool allocate one new
//! buffer per tick.

use std::sync::Arc;

use ballshooter_core::{BufferPool, SimResult, SimulationState, SnapshotBuffer};
use crossbeam_channel::Sender;
use parking_lot::Mutex;

/// Receiver of committed frames.
///
/// Called on the tick thread, once per tick, while the publisher's lock is
/// held: a sink must not call [`Publisher::set_sink`] from inside `deliver`.
pub trait SnapshotSink: Send {
    /// Takes ownership of `frame`.
    ///
    /// # Errors
    ///
    /// Hands the frame back if the sink cannot accept it. The frame then goes
    /// straight back to the pool.
    fn deliver(&mut self, frame: SnapshotBuffer) -> Result<(), SnapshotBuffer>;
}

impl<F> SnapshotSink for F
where
    F: FnMut(SnapshotBuffer) + Send,
{
    fn deliver(&mut self, frame: SnapshotBuffer) -> Result<(), SnapshotBuffer> {
        self(frame);
        Ok(())
    }
}

/// Sink that forwards frames over a channel to the consumer's thread.
///
/// Never blocks the tick thread: if a bounded channel is full or the
/// receiver is gone, the frame is refused.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: Sender<SnapshotBuffer>,
}

impl ChannelSink {
    /// Wraps the sending half of a channel.
    #[must_use]
    pub fn new(tx: Sender<SnapshotBuffer>) -> Self {
        Self { tx }
    }
}

impl SnapshotSink for ChannelSink {
    fn deliver(&mut self, frame: SnapshotBuffer) -> Result<(), SnapshotBuffer> {
        self.tx.try_send(frame).map_err(crossbeam_channel::TrySendError::into_inner)
    }
}

/// What happened to a tick's frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The sink took ownership.
    Delivered,
    /// No sink is registered; no buffer was acquired.
    NoSink,
    /// The sink refused the frame; it went back to the pool.
    Refused,
}

/// The single-sink registration slot, shared between the host handle and
/// the tick thread.
#[derive(Clone, Default)]
pub struct Publisher {
    sink: Arc<Mutex<Option<Box<dyn SnapshotSink>>>>,
}

impl Publisher {
    /// Creates a publisher with no sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sink`, replacing any previous one.
    pub fn set_sink(&self, sink: impl SnapshotSink + 'static) {
        *self.sink.lock() = Some(Box::new(sink));
    }

    /// Removes the registered sink, if any.
    pub fn clear_sink(&self) {
        *self.sink.lock() = None;
    }

    /// Returns true if a sink is registered.
    #[must_use]
    pub fn has_sink(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Copies the committed frame into a pooled buffer and delivers it.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SizeMismatch`](ballshooter_core::SimError::SizeMismatch)
    /// if `pool` was not sized for `state`. The acquired buffer is released.
    pub fn publish(&self, state: &SimulationState, pool: &mut BufferPool) -> SimResult<PublishOutcome> {
        let mut slot = self.sink.lock();
        let Some(sink) = slot.as_mut() else {
            return Ok(PublishOutcome::NoSink);
        };

        let mut frame = pool.acquire();
        if let Err(e) = state.copy_committed_into(&mut frame) {
            if let Err(release) = pool.release(frame) {
                tracing::warn!(error = %release, "dropped unpublished buffer");
            }
            return Err(e);
        }

        match sink.deliver(frame) {
            Ok(()) => Ok(PublishOutcome::Delivered),
            Err(frame) => {
                pool.release(frame)?;
                Ok(PublishOutcome::Refused)
            }
        }
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("has_sink", &self.has_sink())
            .finish()
    }
}
