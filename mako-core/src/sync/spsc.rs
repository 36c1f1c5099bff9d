//! Bounded single-producer/single-consumer ring buffer
//!
//! Classic two-index ring: the producer owns `tail`, the consumer owns
//! `head`, and each index publishes with release and is observed with
//! acquire, so a popped value happens-after its push. Head and tail live on
//! separate cache lines so the two threads never contend on a line.
//!
//! The single-producer/single-consumer contract is enforced by the type
//! system: [`ring`] returns one non-cloneable producer handle and one
//! non-cloneable consumer handle, following the split-channel construction
//! used elsewhere in the codebase.
//!
//! Capacity must be a power of two; the ring holds at most `N - 1`
//! elements (one slot is sacrificed to distinguish full from empty).

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Inner<T, const N: usize> {
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// The producer and consumer handles hand slots back and forth through the
// head/tail protocol; each slot is accessed by exactly one side at a time.
unsafe impl<T: Send, const N: usize> Sync for Inner<T, N> {}
unsafe impl<T: Send, const N: usize> Send for Inner<T, N> {}

impl<T, const N: usize> Inner<T, N> {
    fn new() -> Self {
        const { assert!(N.is_power_of_two(), "capacity must be a power of 2") };
        Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            slots: (0..N)
                .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
                .collect(),
        }
    }
}

impl<T, const N: usize> Drop for Inner<T, N> {
    fn drop(&mut self) {
        // Both handles are gone; drain whatever is still queued.
        let mut head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        while head != tail {
            unsafe { (*self.slots[head].get()).assume_init_drop() };
            head = (head + 1) & (N - 1);
        }
    }
}

/// Producer half of an SPSC ring. Not cloneable: exactly one producer.
pub struct SpscProducer<T, const N: usize> {
    inner: Arc<Inner<T, N>>,
}

/// Consumer half of an SPSC ring. Not cloneable: exactly one consumer.
pub struct SpscConsumer<T, const N: usize> {
    inner: Arc<Inner<T, N>>,
}

/// Create a bounded SPSC ring of capacity `N` (power of two, holds `N - 1`).
pub fn ring<T, const N: usize>() -> (SpscProducer<T, N>, SpscConsumer<T, N>) {
    let inner = Arc::new(Inner::new());
    (
        SpscProducer {
            inner: Arc::clone(&inner),
        },
        SpscConsumer { inner },
    )
}

impl<T, const N: usize> SpscProducer<T, N> {
    /// Push a value. Returns the value back if the ring is full.
    #[inline]
    pub fn push(&self, value: T) -> Result<(), T> {
        let inner = &*self.inner;
        let tail = inner.tail.load(Ordering::Relaxed);
        let next = (tail + 1) & (N - 1);

        if next == inner.head.load(Ordering::Acquire) {
            return Err(value); // full
        }

        unsafe { (*inner.slots[tail].get()).write(value) };
        inner.tail.store(next, Ordering::Release);
        Ok(())
    }

    /// Ring capacity in elements (usable capacity is `N - 1`).
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> SpscConsumer<T, N> {
    /// Pop the oldest value, if any.
    #[inline]
    pub fn pop(&self) -> Option<T> {
        let inner = &*self.inner;
        let head = inner.head.load(Ordering::Relaxed);

        if head == inner.tail.load(Ordering::Acquire) {
            return None; // empty
        }

        let value = unsafe { (*inner.slots[head].get()).assume_init_read() };
        inner.head.store((head + 1) & (N - 1), Ordering::Release);
        Some(value)
    }

    /// Approximate number of queued elements.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.inner.head.load(Ordering::Acquire);
        let tail = self.inner.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head) & (N - 1)
    }

    /// Approximate emptiness check.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
