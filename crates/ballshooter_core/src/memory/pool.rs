//! # Buffer Pool
//!
//! Fixed-size snapshot buffers that are handed out, moved to a consumer,
//! and moved back.

use crate::error::{SimError, SimResult};
use crate::math::Vec3;
use crate::{BYTES_PER_COMPONENT, COMPONENTS_PER_BALL};

/// One published frame: `num_balls` contiguous `(x, y, z)` `f32` triples.
///
/// No header, no versioning. Ownership of a `SnapshotBuffer` is the right to
/// read and write it; there are no shared views.
#[derive(Debug, PartialEq)]
pub struct SnapshotBuffer {
    data: Box<[f32]>,
}

impl SnapshotBuffer {
    /// Allocates a zeroed buffer of `byte_size` bytes, rounded down to whole components.
    #[must_use]
    pub fn zeroed(byte_size: usize) -> Self {
        Self {
            data: vec![0.0; byte_size / BYTES_PER_COMPONENT].into_boxed_slice(),
        }
    }

    /// Wraps host-provided components.
    ///
    /// Lets a host hand back a buffer it rebuilt on its side of the
    /// transport. Its size is checked when it is released to a pool.
    #[must_use]
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self {
            data: data.into_boxed_slice(),
        }
    }

    /// Size of the buffer in bytes.
    #[inline]
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.data.len() * BYTES_PER_COMPONENT
    }

    /// Number of balls stored in the buffer.
    #[inline]
    #[must_use]
    pub fn ball_count(&self) -> usize {
        self.data.len() / COMPONENTS_PER_BALL
    }

    /// Position of ball `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.ball_count()`.
    #[inline]
    #[must_use]
    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::load(&self.data, index)
    }

    /// Components as `f32`.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable components as `f32`.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Raw bytes in native endianness, ready for a byte-oriented transport.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

/// A free list of equally sized [`SnapshotBuffer`]s.
///
/// `acquire` pops a free buffer or allocates a fresh one; `release` takes a
/// buffer back by value. The order in which free buffers come back out is
/// unspecified.
///
/// # Thread Safety
///
/// The pool is owned by the tick thread. Buffers coming back from other
/// threads are queued to it, never released here directly.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool = BufferPool::new(100 * 3 * 4);
///
/// let frame = pool.acquire(); // allocates: pool was empty
/// pool.release(frame)?;
/// let frame = pool.acquire(); // reuses the released buffer
/// ```
#[derive(Debug)]
pub struct BufferPool {
    /// Byte size of every buffer this pool hands out.
    byte_size: usize,
    /// Buffers ready for reuse.
    free_list: Vec<SnapshotBuffer>,
    /// Buffers ever allocated by this pool.
    allocated: usize,
}

impl BufferPool {
    /// Creates an empty pool for buffers of `byte_size` bytes.
    ///
    /// Nothing is allocated until the first [`acquire`](Self::acquire).
    #[must_use]
    pub fn new(byte_size: usize) -> Self {
        Self {
            byte_size,
            free_list: Vec::new(),
            allocated: 0,
        }
    }

    /// Byte size of the buffers in this pool.
    #[inline]
    #[must_use]
    pub const fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// Number of buffers this pool has ever allocated.
    #[inline]
    #[must_use]
    pub const fn allocated(&self) -> usize {
        self.allocated
    }

    /// Number of buffers waiting for reuse.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Takes a buffer out of the pool, allocating one if the free list is empty.
    ///
    /// The contents of a reused buffer are whatever its last owner left.
    pub fn acquire(&mut self) -> SnapshotBuffer {
        if let Some(buffer) = self.free_list.pop() {
            return buffer;
        }

        self.allocated += 1;
        tracing::debug!(
            allocated = self.allocated,
            byte_size = self.byte_size,
            "buffer pool grew"
        );
        SnapshotBuffer::zeroed(self.byte_size)
    }

    /// Checks that `buffer` could be released into this pool.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SizeMismatch`] if the byte lengths differ.
    pub fn check(&self, buffer: &SnapshotBuffer) -> SimResult<()> {
        check_size(self.byte_size, buffer)
    }

    /// Returns a buffer to the free list.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SizeMismatch`] if the buffer's byte length differs
    /// from the pool's. The rejected buffer is dropped.
    pub fn release(&mut self, buffer: SnapshotBuffer) -> SimResult<()> {
        self.check(&buffer)?;
        self.free_list.push(buffer);
        Ok(())
    }
}

/// Size check shared by the pool and by handles that queue buffers to it.
///
/// # Errors
///
/// Returns [`SimError::SizeMismatch`] if `buffer` is not `expected` bytes long.
pub fn check_size(expected: usize, buffer: &SnapshotBuffer) -> SimResult<()> {
    let actual = buffer.byte_len();
    if actual == expected {
        Ok(())
    } else {
        Err(SimError::SizeMismatch { expected, actual })
    }
}
