//! Sample FIFO for block-size adaptation
//!
//! The STFT streaming processor converts between the host's small block
//! size and its internal analysis size through two of these rings. Both
//! ends live on the audio callback, so head/tail are plain integers; the
//! lock-free SPSC rings (`rtrb`) are reserved for cross-thread queues.
//!
//! Capacity is rounded up to a power of two for mask indexing. Positions
//! grow monotonically and wrap through the mask, so `len` is always
//! `write.wrapping_sub(read)`.

use nf_core::Sample;

/// Fixed-capacity FIFO of samples with non-consuming peek
#[derive(Debug, Clone)]
pub struct SampleRing {
    buffer: Vec<Sample>,
    mask: usize,
    /// Total samples written
    write_pos: usize,
    /// Total samples consumed
    read_pos: usize,
}

impl SampleRing {
    /// Create a ring holding at least `min_capacity` samples
    pub fn with_capacity(min_capacity: usize) -> Self {
        let capacity = min_capacity.next_power_of_two().max(2);
        Self {
            buffer: vec![0.0; capacity],
            mask: capacity - 1,
            write_pos: 0,
            read_pos: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Samples available to read
    #[inline]
    pub fn len(&self) -> usize {
        self.write_pos.wrapping_sub(self.read_pos)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Space available to write
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Append samples; returns the number actually written
    pub fn push(&mut self, samples: &[Sample]) -> usize {
        let to_write = samples.len().min(self.free());
        for (offset, &sample) in samples[..to_write].iter().enumerate() {
            self.buffer[(self.write_pos + offset) & self.mask] = sample;
        }
        self.write_pos = self.write_pos.wrapping_add(to_write);
        to_write
    }

    /// Copy the oldest samples into `out` without consuming them;
    /// returns the number copied
    pub fn peek(&self, out: &mut [Sample]) -> usize {
        let to_read = out.len().min(self.len());
        for (offset, slot) in out[..to_read].iter_mut().enumerate() {
            *slot = self.buffer[(self.read_pos + offset) & self.mask];
        }
        to_read
    }

    /// Advance the read position by `count` without copying;
    /// returns the number actually skipped
    pub fn skip(&mut self, count: usize) -> usize {
        let to_skip = count.min(self.len());
        self.read_pos = self.read_pos.wrapping_add(to_skip);
        to_skip
    }

    /// Copy and consume the oldest samples; returns the number read
    pub fn pop(&mut self, out: &mut [Sample]) -> usize {
        let read = self.peek(out);
        self.skip(read);
        read
    }

    /// Discard everything
    pub fn clear(&mut self) {
        self.read_pos = self.write_pos;
    }
}
