//! Bounded multi-producer/single-consumer ring buffer
//!
//! Vyukov bounded queue: every slot carries a sequence word that encodes
//! its publication state. Slot `i` starts at sequence `i`; a producer that
//! claims position `pos` writes the payload and publishes `pos + 1`; the
//! consumer reads at `pos + 1` and releases the slot at `pos + N` so it is
//! reusable one full lap later. Claiming is a CAS on the shared `tail`
//! (relaxed is sufficient - publication synchronizes through the slot
//! sequence, not the index), so producers are lock-free; the consumer is
//! wait-free when no producer is mid-publish.
//!
//! Unlike the SPSC ring this queue holds a full `N` elements.

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Slot<T> {
    sequence: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

struct Inner<T, const N: usize> {
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
    slots: Box<[Slot<T>]>,
}

// Slot ownership is mediated by the per-slot sequence protocol.
unsafe impl<T: Send, const N: usize> Sync for Inner<T, N> {}
unsafe impl<T: Send, const N: usize> Send for Inner<T, N> {}

impl<T, const N: usize> Inner<T, N> {
    fn new() -> Self {
        const { assert!(N.is_power_of_two(), "capacity must be a power of 2") };
        Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            slots: (0..N)
                .map(|i| Slot {
                    sequence: AtomicUsize::new(i),
                    value: UnsafeCell::new(MaybeUninit::uninit()),
                })
                .collect(),
        }
    }
}

impl<T, const N: usize> Drop for Inner<T, N> {
    fn drop(&mut self) {
        let mut head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        while head != tail {
            let slot = &mut self.slots[head & (N - 1)];
            // Only slots that completed publication hold a live value.
            if *slot.sequence.get_mut() == head.wrapping_add(1) {
                unsafe { (*slot.value.get()).assume_init_drop() };
            }
            head = head.wrapping_add(1);
        }
    }
}

/// Producer handle for an MPSC ring. Cloneable: any number of producers.
pub struct MpscProducer<T, const N: usize> {
    inner: Arc<Inner<T, N>>,
}

impl<T, const N: usize> Clone for MpscProducer<T, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Consumer handle for an MPSC ring. Not cloneable: exactly one consumer.
pub struct MpscConsumer<T, const N: usize> {
    inner: Arc<Inner<T, N>>,
}

/// Create a bounded MPSC ring of capacity `N` (power of two).
pub fn ring<T, const N: usize>() -> (MpscProducer<T, N>, MpscConsumer<T, N>) {
    let inner = Arc::new(Inner::new());
    (
        MpscProducer {
            inner: Arc::clone(&inner),
        },
        MpscConsumer { inner },
    )
}

impl<T, const N: usize> MpscProducer<T, N> {
    /// Push a value. Returns the value back if the ring is full.
    pub fn push(&self, value: T) -> Result<(), T> {
        let inner = &*self.inner;
        let mut tail = inner.tail.load(Ordering::Relaxed);

        loop {
            let slot = &inner.slots[tail & (N - 1)];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq as isize - tail as isize;

            if diff == 0 {
                // Slot available for this lap; try to claim it.
                match inner.tail.compare_exchange_weak(
                    tail,
                    tail.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        unsafe { (*slot.value.get()).write(value) };
                        slot.sequence.store(tail.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => tail = current,
                }
            } else if diff < 0 {
                return Err(value); // full
            } else {
                // Another producer claimed this slot; reload and retry.
                tail = inner.tail.load(Ordering::Relaxed);
            }
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> MpscConsumer<T, N> {
    /// Pop the oldest published value, if any.
    pub fn pop(&self) -> Option<T> {
        let inner = &*self.inner;
        let mut head = inner.head.load(Ordering::Relaxed);

        loop {
            let slot = &inner.slots[head & (N - 1)];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq as isize - (head.wrapping_add(1)) as isize;

            if diff == 0 {
                match inner.head.compare_exchange_weak(
                    head,
                    head.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let value = unsafe { (*slot.value.get()).assume_init_read() };
                        // Free the slot for use one lap from now.
                        slot.sequence.store(head.wrapping_add(N), Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => head = current,
                }
            } else if diff < 0 {
                return None; // empty, or a producer is mid-publish
            } else {
                head = inner.head.load(Ordering::Relaxed);
            }
        }
    }

    /// Approximate number of queued elements.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.inner.head.load(Ordering::Acquire);
        let tail = self.inner.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
