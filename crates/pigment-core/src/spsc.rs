//! Lock-free single-producer / single-consumer ring buffer.
//!
//! [`SpscRing`] moves plain `Copy` records from exactly one producer thread to
//! exactly one consumer thread. Capacity is a compile-time power of two; one
//! slot is always kept free so that the two cursors alone can tell "full"
//! from "empty", which leaves `N - 1` usable slots.
//!
//! The ring is built unsplit (exclusive access, useful for fixtures) and then
//! [`split`](SpscRing::split) into a [`Producer`] and a [`Consumer`]. Neither
//! half is `Clone`, so the single-producer / single-consumer contract is
//! enforced by ownership rather than by convention.
//!
//! # Memory ordering
//!
//! ```text
//! producer                         consumer
//! ────────                         ────────
//! h = head (Relaxed, own cursor)   t = tail (Relaxed, own cursor)
//! t = tail (Acquire)               h = head (Acquire)
//! slot[h] = item                   item = slot[t]
//! head = h + 1 (Release) ───────►  tail = t + 1 (Release) ──► (producer)
//! ```
//!
//! The slot write happens-before the `Release` store of `head`, which the
//! consumer observes with an `Acquire` load before reading the slot. The
//! symmetric pairing on `tail` tells the producer a slot has been read and
//! may be reused.
//!
//! # Example
//!
//! ```rust
//! use pigment_core::SpscRing;
//!
//! let ring: SpscRing<f32, 4> = SpscRing::new();
//! let (mut tx, mut rx) = ring.split();
//!
//! assert!(tx.push(1.0));
//! assert!(tx.push(2.0));
//! assert!(tx.push(3.0));
//! assert!(!tx.push(4.0)); // 4 slots, 3 usable
//!
//! assert_eq!(rx.pop(), Some(1.0));
//! assert!(tx.push(4.0));
//! ```

// The slot storage is an `UnsafeCell` array whose exclusive access is
// guaranteed by the cursor protocol instead of the borrow checker.
#![allow(unsafe_code)]

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::fmt;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};
use crossbeam_utils::CachePadded;

/// Storage and cursors shared by both halves of the ring.
///
/// `head` and `tail` increase monotonically (wrapping) and are masked only
/// when indexing a slot.
struct RingStorage<T, const N: usize> {
    /// Next position the producer will write. Written only by the producer.
    head: CachePadded<AtomicUsize>,
    /// Next position the consumer will read. Written only by the consumer.
    tail: CachePadded<AtomicUsize>,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// SAFETY: a slot is only ever accessed by the side that currently owns it
// under the cursor protocol, and `T: Send` values are moved across threads by
// plain copies.
unsafe impl<T: Send, const N: usize> Send for RingStorage<T, N> {}
// SAFETY: see above; shared references only touch the atomics, slot access is
// serialized by the head/tail handshake.
unsafe impl<T: Send, const N: usize> Sync for RingStorage<T, N> {}

impl<T: Copy + Send, const N: usize> RingStorage<T, N> {
    const MASK: usize = N - 1;

    /// Evaluated at monomorphization; rejects non power-of-two capacities.
    const VALID_CAPACITY: () = assert!(
        N >= 2 && N.is_power_of_two(),
        "SpscRing capacity must be a power of two >= 2"
    );

    fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_CAPACITY;

        let slots: Vec<UnsafeCell<MaybeUninit<T>>> = (0..N)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();

        Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            slots: slots.into_boxed_slice(),
        }
    }

    /// Producer side of the protocol.
    ///
    /// # Safety
    ///
    /// Only one thread may act as producer at any time.
    #[inline]
    unsafe fn push(&self, item: T) -> bool {
        let h = self.head.load(Ordering::Relaxed);
        let t = self.tail.load(Ordering::Acquire);
        if h.wrapping_sub(t) >= Self::MASK {
            return false;
        }

        // SAFETY: slot `h` is outside the readable window [t, h), so the
        // consumer cannot be reading it, and we are the only producer.
        unsafe {
            self.slots[h & Self::MASK]
                .get()
                .write(MaybeUninit::new(item));
        }
        self.head.store(h.wrapping_add(1), Ordering::Release);
        true
    }

    /// Consumer side of the protocol.
    ///
    /// # Safety
    ///
    /// Only one thread may act as consumer at any time.
    #[inline]
    unsafe fn pop(&self) -> Option<T> {
        let t = self.tail.load(Ordering::Relaxed);
        let h = self.head.load(Ordering::Acquire);
        if t == h {
            return None;
        }

        // SAFETY: slot `t` lies in [t, h); its write happened-before the
        // Release store of `head` observed above, and the producer will not
        // touch it again until `tail` moves past it.
        let item = unsafe { self.slots[t & Self::MASK].get().read().assume_init() };
        self.tail.store(t.wrapping_add(1), Ordering::Release);
        Some(item)
    }

    #[inline]
    fn len(&self) -> usize {
        let h = self.head.load(Ordering::Acquire);
        let t = self.tail.load(Ordering::Acquire);
        // The two loads are not a snapshot; clamp transient readings.
        h.wrapping_sub(t).min(Self::MASK)
    }
}

/// Fixed-capacity lock-free ring buffer for one producer and one consumer.
///
/// `T` must be plain data (`Copy`): items are moved through the ring by a
/// bitwise copy with no ownership transfer or destructor side effects. `N`
/// is the slot count and must be a power of two; `N - 1` items fit.
///
/// All storage is allocated in [`new`](Self::new); pushes and pops never
/// allocate, block, or panic.
pub struct SpscRing<T, const N: usize> {
    storage: RingStorage<T, N>,
}

impl<T: Copy + Send, const N: usize> Default for SpscRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Send, const N: usize> SpscRing<T, N> {
    /// Create an empty ring, allocating all `N` slots.
    pub fn new() -> Self {
        Self {
            storage: RingStorage::new(),
        }
    }

    /// Number of slots (`N`). One slot is reserved, so `N - 1` items fit.
    pub const fn capacity() -> usize {
        N
    }

    /// Append an item. Returns `false` (and drops nothing) when full.
    pub fn push(&mut self, item: T) -> bool {
        // SAFETY: `&mut self` makes this the only producer and consumer.
        unsafe { self.storage.push(item) }
    }

    /// Remove the oldest item.
    pub fn pop(&mut self) -> Option<T> {
        // SAFETY: `&mut self` makes this the only producer and consumer.
        unsafe { self.storage.pop() }
    }

    /// Append an item, discarding the oldest unread item if the ring is full.
    ///
    /// Returns the discarded item, if any. Only available before the ring is
    /// split: overwriting requires moving the consumer's cursor, which needs
    /// exclusive access.
    pub fn force_push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() { self.pop() } else { None };
        let pushed = self.push(item);
        debug_assert!(pushed, "push after eviction cannot fail");
        evicted
    }

    /// Number of unread items.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` if there are no unread items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the next [`push`](Self::push) would fail.
    pub fn is_full(&self) -> bool {
        self.len() == N - 1
    }

    /// Number of items that can still be pushed.
    pub fn free_space(&self) -> usize {
        N - 1 - self.len()
    }

    /// Split into the producer and consumer halves.
    ///
    /// Items already in the ring stay queued for the consumer.
    pub fn split(self) -> (Producer<T, N>, Consumer<T, N>) {
        let storage = Arc::new(self.storage);
        (
            Producer {
                storage: Arc::clone(&storage),
            },
            Consumer { storage },
        )
    }
}

impl<T, const N: usize> fmt::Debug for SpscRing<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpscRing")
            .field("capacity", &N)
            .field("head", &self.storage.head.load(Ordering::Relaxed))
            .field("tail", &self.storage.tail.load(Ordering::Relaxed))
            .finish()
    }
}

/// Writing half of a split [`SpscRing`]. Owned by the producer thread.
pub struct Producer<T, const N: usize> {
    storage: Arc<RingStorage<T, N>>,
}

impl<T: Copy + Send, const N: usize> Producer<T, N> {
    /// Append an item. Returns `false` when the ring is full (backpressure);
    /// the item is not stored and nothing else changes.
    #[inline]
    pub fn push(&mut self, item: T) -> bool {
        // SAFETY: `Producer` is unique (not `Clone`) and `push` takes
        // `&mut self`, so there is exactly one producer.
        unsafe { self.storage.push(item) }
    }

    /// Approximate number of unread items. Diagnostics only.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` if the ring currently looks empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate number of items that can still be pushed.
    #[inline]
    pub fn free_space(&self) -> usize {
        N - 1 - self.len()
    }

    /// Number of slots (`N`).
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> fmt::Debug for Producer<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").field("capacity", &N).finish()
    }
}

/// Reading half of a split [`SpscRing`]. Owned by the consumer thread.
pub struct Consumer<T, const N: usize> {
    storage: Arc<RingStorage<T, N>>,
}

impl<T: Copy + Send, const N: usize> Consumer<T, N> {
    /// Remove the oldest item, or `None` if the ring is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        // SAFETY: `Consumer` is unique (not `Clone`) and `pop` takes
        // `&mut self`, so there is exactly one consumer.
        unsafe { self.storage.pop() }
    }

    /// Approximate number of unread items. Diagnostics only.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` if there is nothing to pop right now.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots (`N`).
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> fmt::Debug for Consumer<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("capacity", &N).finish()
    }
}
