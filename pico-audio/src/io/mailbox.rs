//! Latest-wins single-value hand-off.
//!
//! The producer overwrites, it never waits and never fails. The consumer sees
//! only the newest value posted since its last [`take`](Mailbox::take).
//!
//! Two slots alternate. Each post writes the slot the consumer is not
//! pointed at, then publishes it by bumping a sequence number. Only `load`
//! and `store` are used, so this works on cores without atomic
//! read-modify-write (Cortex-M0+).
//!
//! # Safety Contract
//!
//! - Only ONE context may call [`post()`](Mailbox::post).
//! - Only ONE context may call [`take()`](Mailbox::take), and it must run to
//!   completion without being preempted by the poster (an interrupt handler
//!   on the same core as the poster).

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

pub struct Mailbox<T: Copy> {
    slots: [UnsafeCell<Option<T>>; 2],
    /// Sequence number of the newest post. Written by the producer only.
    published: AtomicU32,
    /// Sequence number the consumer last took. Written by the consumer only.
    taken: AtomicU32,
}

// SAFETY: the producer only writes the slot that `published` does not name,
// and the consumer only reads the slot it does name. The consumer cannot be
// interrupted by the producer, so a read never overlaps a write.
unsafe impl<T: Copy + Send> Sync for Mailbox<T> {}

impl<T: Copy> Mailbox<T> {
    /// An empty mailbox. Usable in `static` initializers.
    pub const fn new() -> Self {
        Mailbox {
            slots: [UnsafeCell::new(None), UnsafeCell::new(None)],
            published: AtomicU32::new(0),
            taken: AtomicU32::new(0),
        }
    }

    /// Replace whatever is waiting with `value` (producer side).
    pub fn post(&self, value: T) {
        let next = self.published.load(Ordering::Relaxed).wrapping_add(1);
        // SAFETY: sole producer, and `next & 1` is not the published slot.
        unsafe {
            *self.slots[(next & 1) as usize].get() = Some(value);
        }
        self.published.store(next, Ordering::Release);
    }

    /// The newest value posted since the last call (consumer side).
    pub fn take(&self) -> Option<T> {
        let published = self.published.load(Ordering::Acquire);
        if published == self.taken.load(Ordering::Relaxed) {
            return None;
        }
        self.taken.store(published, Ordering::Relaxed);
        // SAFETY: sole consumer; the producer's next write goes to the other slot.
        unsafe { *self.slots[(published & 1) as usize].get() }
    }

    /// `true` if a post is waiting for the consumer.
    pub fn is_pending(&self) -> bool {
        self.published.load(Ordering::Acquire) != self.taken.load(Ordering::Relaxed)
    }
}

impl<T: Copy> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
