//! Lock-free open-addressed hash map
//!
//! Insert-only linear-probing table used for symbol -> book-index lookup on
//! the market-data path. Each entry's hash tag is the publication word:
//! 0 = EMPTY, 1 = TOMBSTONE (reserved for a future delete), anything >= 2
//! is a live FNV-1a hash. A probe chain terminates only at EMPTY, which is
//! sound precisely because nothing is ever deleted.
//!
//! Writes follow the registration-phase contract: the table is populated by
//! the control plane before the pipeline starts, and is effectively
//! read-only afterwards. An `insert` racing a `find` on the same key can
//! expose a claimed-but-unwritten entry (the tag is CAS-claimed before the
//! key/value stores land); callers keep registration single-threaded and
//! quiescent before readers start. Key, tag, and value each sit on their
//! own cache line so probing stays cheap under concurrent readers.
//!
//! Load factor should stay below ~0.75; the handler registers at most a
//! few hundred symbols against its table.

use crate::core::Symbol;
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};

const EMPTY: u64 = 0;
#[allow(dead_code)]
const TOMBSTONE: u64 = 1;

const FNV_OFFSET: u64 = 14_695_981_039_346_656_037;
const FNV_PRIME: u64 = 1_099_511_628_211;

/// FNV-1a over a byte slice.
#[inline]
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Key contract for [`LockFreeMap`]: hashable to a u64 and comparable.
///
/// Hashes of 0 and 1 are remapped by the map to keep the EMPTY/TOMBSTONE
/// tags unambiguous, so implementations may return any value.
pub trait MapKey: Copy {
    fn hash_key(&self) -> u64;
    fn key_eq(&self, other: &Self) -> bool;
}

impl MapKey for u64 {
    #[inline]
    fn hash_key(&self) -> u64 {
        fnv1a(&self.to_ne_bytes())
    }

    #[inline]
    fn key_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl MapKey for Symbol {
    #[inline]
    fn hash_key(&self) -> u64 {
        fnv1a(self.as_c_bytes())
    }

    #[inline]
    fn key_eq(&self, other: &Self) -> bool {
        self == other
    }
}

struct Entry<K, V> {
    tag: CachePadded<AtomicU64>,
    key: CachePadded<UnsafeCell<MaybeUninit<K>>>,
    value: CachePadded<UnsafeCell<MaybeUninit<V>>>,
}

/// Fixed-capacity lock-free hash map with linear probing.
///
/// Supports `insert` (insert-or-update) and `find` only; see the module
/// docs for the write contract.
pub struct LockFreeMap<K: MapKey, V> {
    entries: Box<[Entry<K, V>]>,
    mask: usize,
}

unsafe impl<K: MapKey + Send + Sync, V: Send + Sync> Sync for LockFreeMap<K, V> {}
unsafe impl<K: MapKey + Send, V: Send> Send for LockFreeMap<K, V> {}

impl<K: MapKey, V> LockFreeMap<K, V> {
    /// Create a map with the given power-of-two capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "capacity must be a power of 2"
        );
        Self {
            entries: (0..capacity)
                .map(|_| Entry {
                    tag: CachePadded::new(AtomicU64::new(EMPTY)),
                    key: CachePadded::new(UnsafeCell::new(MaybeUninit::uninit())),
                    value: CachePadded::new(UnsafeCell::new(MaybeUninit::uninit())),
                })
                .collect(),
            mask: capacity - 1,
        }
    }

    /// Remap a raw hash away from the reserved EMPTY/TOMBSTONE tags.
    #[inline]
    fn tag_for(key: &K) -> u64 {
        let h = key.hash_key();
        if h <= TOMBSTONE { 2 } else { h }
    }

    /// Insert or update. Returns false when the table is full.
    pub fn insert(&self, key: K, value: V) -> bool {
        let tag = Self::tag_for(&key);
        let mut idx = tag as usize & self.mask;

        for _ in 0..self.entries.len() {
            let entry = &self.entries[idx];

            match entry.tag.compare_exchange(
                EMPTY,
                tag,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    // Claimed a fresh slot; the tag transition EMPTY -> tag
                    // is permanent.
                    unsafe {
                        (*entry.key.get()).write(key);
                        (*entry.value.get()).write(value);
                    }
                    return true;
                }
                Err(current) => {
                    if current == tag {
                        let existing = unsafe { (*entry.key.get()).assume_init_ref() };
                        if existing.key_eq(&key) {
                            // Update in place. Not atomic across word
                            // boundaries; see the module write contract.
                            unsafe {
                                let slot = &mut *entry.value.get();
                                slot.assume_init_drop();
                                slot.write(value);
                            }
                            return true;
                        }
                    }
                }
            }

            idx = (idx + 1) & self.mask;
        }

        false // table full
    }

    /// Look up a key. Returns a reference into the table, or None if the
    /// probe chain hits an EMPTY slot.
    pub fn find(&self, key: &K) -> Option<&V> {
        let tag = Self::tag_for(key);
        let mut idx = tag as usize & self.mask;

        for _ in 0..self.entries.len() {
            let entry = &self.entries[idx];
            let current = entry.tag.load(Ordering::Acquire);

            if current == EMPTY {
                return None;
            }

            if current == tag {
                let existing = unsafe { (*entry.key.get()).assume_init_ref() };
                if existing.key_eq(key) {
                    return Some(unsafe { (*entry.value.get()).assume_init_ref() });
                }
            }

            idx = (idx + 1) & self.mask;
        }

        None
    }

    /// Table capacity in slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }
}

impl<K: MapKey, V> Drop for LockFreeMap<K, V> {
    fn drop(&mut self) {
        for entry in self.entries.iter_mut() {
            if *entry.tag.get_mut() > TOMBSTONE {
                unsafe {
                    (*entry.key.get()).assume_init_drop();
                    (*entry.value.get()).assume_init_drop();
                }
            }
        }
    }
}
