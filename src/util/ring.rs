//! A lock-free single-producer/single-consumer ring buffer of fixed,
//! power-of-two capacity.
//!
//! This is the cross-context transport used everywhere a hard-real-time
//! producer (the audio interrupt or the clock-input context) needs to hand
//! values to a cooperative consumer (the control thread) without ever
//! blocking or allocating. Capacity is fixed at construction and the
//! buffer never resizes.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Single-producer/single-consumer ring buffer holding up to `capacity - 1`
/// usable slots are not wasted here: we track `write_idx`/`read_idx` as
/// unbounded-in-principle counters (masked with `capacity - 1` on access),
/// so the buffer is empty iff the indices are equal and full iff they
/// differ by exactly `capacity`. Capacity must be a power of two.
pub struct SpscRing<T> {
    buf: Box<[UnsafeCell<T>]>,
    mask: usize,
    write_idx: AtomicUsize,
    read_idx: AtomicUsize,
    /// Count of pushes dropped because the ring was full. Read by the
    /// control thread for telemetry; never reset on the hot path.
    dropped: AtomicUsize,
}

// SAFETY: `SpscRing` is only sound when used by exactly one producer thread
// calling `push` and exactly one consumer thread calling `pop`. The cells
// touched by `push` (at `write_idx`) and by `pop` (at `read_idx`) never
// overlap because `push` refuses to advance past a full buffer and `pop`
// refuses to advance past an empty one, and the atomic index updates carry
// the acquire/release pairing needed to publish the written value.
unsafe impl<T: Send> Sync for SpscRing<T> {}
unsafe impl<T: Send> Send for SpscRing<T> {}

impl<T: Default + Copy> SpscRing<T> {
    /// Creates a new ring with room for `capacity` entries. `capacity` must
    /// be a power of two; panics otherwise (this is a one-time startup
    /// check, not something that runs on any real-time path).
    pub fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "ring capacity must be a power of two");
        let buf = (0..capacity)
            .map(|_| UnsafeCell::new(T::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            buf,
            mask: capacity - 1,
            write_idx: AtomicUsize::new(0),
            read_idx: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Capacity of the ring, in entries.
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Number of entries currently queued.
    pub fn len(&self) -> usize {
        self.write_idx.load(Ordering::Acquire) - self.read_idx.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full_at(&self, write: usize, read: usize) -> bool {
        write - read == self.capacity()
    }

    /// Pushes a value from the producer side. Drops (and counts) the value
    /// if the ring is full rather than overwriting or blocking.
    ///
    /// Must only be called from the single producer context.
    pub fn push(&self, value: T) -> bool {
        let write = self.write_idx.load(Ordering::Relaxed);
        let read = self.read_idx.load(Ordering::Acquire);

        if self.is_full_at(write, read) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let slot = write & self.mask;
        // SAFETY: only the producer ever writes to this index; the consumer
        // cannot have claimed it yet because we just checked `is_full_at`.
        unsafe {
            *self.buf[slot].get() = value;
        }

        self.write_idx.store(write + 1, Ordering::Release);
        true
    }

    /// Pops the oldest value from the consumer side, or `None` if empty.
    ///
    /// Must only be called from the single consumer context.
    pub fn pop(&self) -> Option<T> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);

        if read == write {
            return None;
        }

        let slot = read & self.mask;
        // SAFETY: the producer has published this slot (we observed
        // `write_idx` past it via Acquire) and will not touch it again
        // until we advance `read_idx`.
        let value = unsafe { *self.buf[slot].get() };

        self.read_idx.store(read + 1, Ordering::Release);
        Some(value)
    }

    /// Number of values dropped over this ring's lifetime because the
    /// buffer was full when `push` was called.
    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}
