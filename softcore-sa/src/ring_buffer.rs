//! Bounded single-producer single-consumer ring buffer for decoded samples.
//!
//! Storage is heap-allocated once, when a stream session opens, so that an
//! allocation failure surfaces as [`AllocError`] instead of aborting.
//!
//! # Usage contract
//!
//! - The buffer is not synchronised. Producer ([`write()`](RingBuffer::write))
//!   and consumer ([`read()`](RingBuffer::read)) must run in the same context;
//!   the `&mut self` receivers enforce this.
//! - One slot is permanently reserved to tell full from empty (Lamport queue),
//!   so `capacity + 1` slots back a buffer of usable `capacity`.

use alloc::vec::Vec;
use core::fmt;

/// Storage for the ring buffer could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AllocError;

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ring buffer allocation failed")
    }
}

/// One element returned by [`RingBuffer::read()`] together with the
/// post-read fill level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSample<T> {
    /// The oldest unread element.
    pub value: T,
    /// At most half of the usable capacity is occupied after the read.
    pub half_empty: bool,
    /// More than half of the usable capacity is occupied after the read.
    pub half_full: bool,
}

/// A fixed-capacity circular buffer.
pub struct RingBuffer<T> {
    slots: Vec<T>,
    /// Oldest unread element.
    start: usize,
    /// Next write position.
    end: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Allocate a buffer able to hold `capacity` elements.
    ///
    /// Fails if `capacity + 1` slots cannot be allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self, AllocError> {
        let size = capacity.checked_add(1).ok_or(AllocError)?;
        let mut slots = Vec::new();
        slots.try_reserve_exact(size).map_err(|_| AllocError)?;
        slots.resize(size, T::default());

        Ok(RingBuffer {
            slots,
            start: 0,
            end: 0,
        })
    }

    /// Store `item` at the write position.
    ///
    /// Returns `Err(item)` without touching the buffer if it is full.
    pub fn write(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.slots[self.end] = item;
        self.end = (self.end + 1) % self.size();
        Ok(())
    }

    /// Remove the oldest element.
    ///
    /// Returns `None` if the buffer is empty. The half-empty/half-full flags
    /// describe the occupancy after the element has been removed.
    pub fn read(&mut self) -> Option<ReadSample<T>> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots[self.start];
        self.start = (self.start + 1) % self.size();

        let half_empty = self.len() <= self.capacity() / 2;
        Some(ReadSample {
            value,
            half_empty,
            half_full: !half_empty,
        })
    }
}

impl<T> RingBuffer<T> {
    fn size(&self) -> usize {
        self.slots.len()
    }

    /// Usable capacity (`size - 1`).
    pub fn capacity(&self) -> usize {
        self.size() - 1
    }

    /// Number of elements currently stored.
    pub fn len(&self) -> usize {
        if self.end >= self.start {
            self.end - self.start
        } else {
            self.size() - (self.start - self.end)
        }
    }

    /// Number of writes that can succeed before the buffer is full.
    pub fn unused_capacity(&self) -> usize {
        self.capacity() - self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn is_full(&self) -> bool {
        (self.end + 1) % self.size() == self.start
    }
}
