//! Lock-free single-producer single-consumer (SPSC) ring buffer.
//!
//! Carries synth channel commands from background code to the DMA
//! completion handler without masking interrupts.
//!
//! The read and write counters run freely and wrap at `usize::MAX`; a slot
//! index is the counter masked by `N - 1`. Their difference is the fill
//! level, so all `N` slots are usable. Only `load` and `store` are used.
//!
//! # Safety Contract
//!
//! - Only ONE context may call [`push()`](SpscQueue::push) (the producer:
//!   the single [`AudioPlayer`](crate::playback::AudioPlayer)).
//! - Only ONE context may call [`pop()`](SpscQueue::pop) (the consumer:
//!   the completion handler).

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};

/// A lock-free SPSC queue of `N` slots. `N` must be a power of two.
pub struct SpscQueue<T, const N: usize> {
    slots: [UnsafeCell<MaybeUninit<T>>; N],
    /// Total pushes so far (only modified by the producer).
    written: AtomicUsize,
    /// Total pops so far (only modified by the consumer).
    read: AtomicUsize,
}

// SAFETY: T: Send is required because values cross from background code to
// the interrupt handler. Each counter has a single writer, and the
// release/acquire pairs publish slot contents before the counter moves.
unsafe impl<T: Send, const N: usize> Sync for SpscQueue<T, N> {}
unsafe impl<T: Send, const N: usize> Send for SpscQueue<T, N> {}

impl<T, const N: usize> SpscQueue<T, N> {
    const MASK: usize = N - 1;

    /// An empty queue. Usable in `static` initializers.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "SPSC queue length must be a power of two");
        SpscQueue {
            slots: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
            written: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    fn slot(&self, counter: usize) -> *mut MaybeUninit<T> {
        self.slots[counter & Self::MASK].get()
    }

    /// Append `val` (producer side). Hands it back when every slot is taken.
    pub fn push(&self, val: T) -> Result<(), T> {
        let written = self.written.load(Ordering::Relaxed);
        if written.wrapping_sub(self.read.load(Ordering::Acquire)) == N {
            return Err(val);
        }
        // SAFETY: sole producer, and the consumer is at least one lap behind
        // this slot.
        unsafe { (*self.slot(written)).write(val) };
        self.written.store(written.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Remove the oldest value (consumer side).
    pub fn pop(&self) -> Option<T> {
        let read = self.read.load(Ordering::Relaxed);
        if read == self.written.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: sole consumer, and the slot was published by the
        // producer's release store.
        let val = unsafe { (*self.slot(read)).assume_init_read() };
        self.read.store(read.wrapping_add(1), Ordering::Release);
        Some(val)
    }

    /// Values waiting for the consumer.
    pub fn len(&self) -> usize {
        let written = self.written.load(Ordering::Acquire);
        written.wrapping_sub(self.read.load(Ordering::Acquire))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    /// Values that fit before `push` starts refusing.
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Drop for SpscQueue<T, N> {
    fn drop(&mut self) {
        let written = *self.written.get_mut();
        let mut read = *self.read.get_mut();
        while read != written {
            // SAFETY: every slot between the counters holds a live value, and
            // `&mut self` rules out the other side.
            unsafe { (*self.slot(read)).assume_init_drop() };
            read = read.wrapping_add(1);
        }
    }
}
