//! Lock-free circular trace log for real-time diagnostics.
//!
//! The audio thread cannot print, lock, or allocate, so it records small
//! fixed-size [`TraceRecord`]s into a [`TraceLog`] instead. A debug overlay or
//! a test reads them back later.
//!
//! # Design
//!
//! - Writers claim a sequence number with one `fetch_add`, then fill slot
//!   `sequence & mask`. Several threads may write at once.
//! - When the log is full the oldest record is overwritten and the dropped
//!   counter is incremented.
//! - Every slot is guarded by a stamp (`sequence + 1`, `0` before the first
//!   write, [`u64::MAX`] while being written), forming a seqlock built purely
//!   from atomics. A reader that races a writer gets `None` rather than a
//!   torn record.
//! - A writer takes a slot with a single compare-exchange on its stamp. If
//!   another writer holds the slot, or has already stored a newer sequence
//!   there, the record is discarded instead of interleaving with it. This
//!   only happens when writers lap the whole ring.
//!
//! Reads are best-effort: under concurrent writes the set of records visible
//! to a sequence of [`read_event`](TraceLog::read_event) calls is not a
//! consistent snapshot.
//!
//! # Example
//!
//! ```rust
//! use pigment_core::{TraceKind, TraceLog};
//!
//! let log = TraceLog::with_capacity(4);
//! log.log_event(TraceKind::AudioBlock, 0, 512.0, 2.0, 0.0);
//! log.log_event(TraceKind::PaintGesture, 512, 440.0, 0.8, 0.0);
//!
//! assert_eq!(log.event_count(), 2);
//! let first = log.read_event(0).unwrap();
//! assert_eq!(first.kind, TraceKind::AudioBlock);
//! ```

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering, fence};
use crossbeam_utils::CachePadded;

/// Kinds of event recorded by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TraceKind {
    /// A paint event was consumed on the audio thread.
    /// Params: base frequency (Hz), amplitude, pan.
    PaintGesture = 0,
    /// A stroke ended and held voices were released.
    /// Params: voices released, 0, 0.
    StrokeEnd = 1,
    /// An active voice was re-triggered because none was free.
    /// Params: voice index, new base frequency (Hz), 0.
    VoiceSteal = 2,
    /// One audio block was rendered.
    /// Params: events drained, active voices, block peak.
    AudioBlock = 3,
    /// The producer found the event queue full and dropped a gesture.
    /// Params: queue length, 0, 0.
    Backpressure = 4,
    /// The engine was (re)prepared.
    /// Params: sample rate, voice count, max partials.
    Prepare = 5,
}

impl TraceKind {
    fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::PaintGesture,
            1 => Self::StrokeEnd,
            2 => Self::VoiceSteal,
            3 => Self::AudioBlock,
            4 => Self::Backpressure,
            5 => Self::Prepare,
            _ => return None,
        })
    }
}

/// One decoded trace entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceRecord {
    /// What happened.
    pub kind: TraceKind,
    /// Engine sample clock when it happened.
    pub frame: u64,
    /// Global write order (0 = first record ever logged).
    pub sequence: u64,
    /// Kind-specific values, see [`TraceKind`].
    pub params: [f32; 3],
}

/// Stamp value meaning "slot is being written".
const STAMP_BUSY: u64 = u64::MAX;

#[derive(Default)]
struct TraceSlot {
    stamp: AtomicU64,
    kind: AtomicU8,
    frame: AtomicU64,
    params: [AtomicU32; 3],
}

/// Fixed-capacity, overwrite-oldest event log.
///
/// All memory is allocated in [`with_capacity`](Self::with_capacity);
/// [`log_event`](Self::log_event) is wait-free: one `fetch_add` and one
/// compare-exchange, no retry loops.
pub struct TraceLog {
    slots: Box<[TraceSlot]>,
    mask: u64,
    /// Total records ever claimed; the next record's sequence number.
    written: CachePadded<AtomicU64>,
    dropped: CachePadded<AtomicU32>,
}

impl core::fmt::Debug for TraceLog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TraceLog")
            .field("capacity", &self.capacity())
            .field("written", &self.total_logged())
            .field("dropped", &self.dropped_event_count())
            .finish()
    }
}

impl TraceLog {
    /// Default capacity used by the engine.
    pub const DEFAULT_CAPACITY: usize = 4096;

    /// Create a log holding `capacity` records, rounded up to a power of two
    /// (minimum 2).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        let slots: Vec<TraceSlot> = (0..capacity).map(|_| TraceSlot::default()).collect();
        #[cfg(feature = "tracing")]
        tracing::debug!(capacity, "trace log allocated");
        Self {
            slots: slots.into_boxed_slice(),
            mask: capacity as u64 - 1,
            written: CachePadded::new(AtomicU64::new(0)),
            dropped: CachePadded::new(AtomicU32::new(0)),
        }
    }

    /// Number of records retained before overwriting starts.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Record an event. Never blocks or allocates.
    pub fn log_event(&self, kind: TraceKind, frame: u64, p1: f32, p2: f32, p3: f32) {
        let sequence = self.written.fetch_add(1, Ordering::Relaxed);
        if sequence > self.mask {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }

        self.write_slot(sequence, kind, frame, [p1, p2, p3]);
    }

    /// Fill the slot for `sequence` unless another writer owns it or has
    /// already stored a newer record there.
    fn write_slot(&self, sequence: u64, kind: TraceKind, frame: u64, params: [f32; 3]) -> bool {
        let slot = &self.slots[(sequence & self.mask) as usize];

        let current = slot.stamp.load(Ordering::Relaxed);
        if current == STAMP_BUSY || current > sequence {
            return false;
        }
        if slot
            .stamp
            .compare_exchange(current, STAMP_BUSY, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }
        fence(Ordering::Release);

        slot.kind.store(kind as u8, Ordering::Relaxed);
        slot.frame.store(frame, Ordering::Relaxed);
        for (dst, value) in slot.params.iter().zip(params) {
            dst.store(value.to_bits(), Ordering::Relaxed);
        }

        slot.stamp.store(sequence + 1, Ordering::Release);
        true
    }

    /// Read the `index`-th oldest retained record.
    ///
    /// Returns `None` if `index >= event_count()` or if the slot is being
    /// overwritten concurrently.
    pub fn read_event(&self, index: usize) -> Option<TraceRecord> {
        let written = self.written.load(Ordering::Acquire);
        let retained = written.min(self.mask + 1);
        let index = index as u64;
        if index >= retained {
            return None;
        }
        self.read_sequence(written - retained + index)
    }

    fn read_sequence(&self, sequence: u64) -> Option<TraceRecord> {
        let slot = &self.slots[(sequence & self.mask) as usize];

        let before = slot.stamp.load(Ordering::Acquire);
        if before != sequence + 1 {
            return None;
        }

        let kind = slot.kind.load(Ordering::Relaxed);
        let frame = slot.frame.load(Ordering::Relaxed);
        let params = [
            f32::from_bits(slot.params[0].load(Ordering::Relaxed)),
            f32::from_bits(slot.params[1].load(Ordering::Relaxed)),
            f32::from_bits(slot.params[2].load(Ordering::Relaxed)),
        ];

        fence(Ordering::Acquire);
        if slot.stamp.load(Ordering::Relaxed) != before {
            return None;
        }

        Some(TraceRecord {
            kind: TraceKind::from_u8(kind)?,
            frame,
            sequence,
            params,
        })
    }

    /// Number of records currently retained (at most the capacity).
    pub fn event_count(&self) -> usize {
        self.written.load(Ordering::Acquire).min(self.mask + 1) as usize
    }

    /// Total records ever logged, including overwritten ones.
    pub fn total_logged(&self) -> u64 {
        self.written.load(Ordering::Acquire)
    }

    /// Records overwritten before being read since the last reset.
    pub fn dropped_event_count(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Reset the dropped counter to zero.
    pub fn reset_dropped_event_count(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }

    /// Copy out every readable retained record, oldest first.
    ///
    /// Allocates; call from a non-real-time thread.
    pub fn snapshot(&self) -> Vec<TraceRecord> {
        let count = self.event_count();
        (0..count).filter_map(|i| self.read_event(i)).collect()
    }

    /// Most recent record of the given kind, if one is still retained.
    pub fn last_of(&self, kind: TraceKind) -> Option<TraceRecord> {
        let count = self.event_count();
        (0..count)
            .rev()
            .filter_map(|i| self.read_event(i))
            .find(|r| r.kind == kind)
    }
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}
