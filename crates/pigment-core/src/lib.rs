//! Pigment Core - real-time primitives for the paint-to-audio engine
//!
//! This crate holds the building blocks shared by the UI thread and the audio
//! thread. Nothing on the audio-thread side of these types locks or allocates.
//!
//! # Core Components
//!
//! ## Cross-Thread Queues
//!
//! - [`SpscRing`] - Fixed-capacity lock-free ring, split into a
//!   [`Producer`] / [`Consumer`] pair for the two threads
//!
//! ```rust
//! use pigment_core::SpscRing;
//!
//! let ring: SpscRing<u32, 8> = SpscRing::new();
//! let (mut tx, mut rx) = ring.split();
//!
//! assert!(tx.push(7));
//! assert_eq!(rx.pop(), Some(7));
//! assert_eq!(rx.pop(), None);
//! ```
//!
//! ## Diagnostics
//!
//! - [`TraceLog`] - Lock-free circular event log usable from the audio thread
//! - [`TraceKind`] / [`TraceRecord`] - Trace event vocabulary
//!
//! ## Determinism
//!
//! - [`Determinism`] - Shared enable flag and seed for reproducible rendering
//! - [`Xorshift32`] - Small PRNG seeded from the context
//!
//! ## Parameters
//!
//! - [`AtomicFloat`] - `f32` stored as bits in an `AtomicU32`
//! - [`SmoothedGain`] - One-pole smoother for block-read gain values
//! - [`flush_denormal`] - Snap subnormal-range values to zero
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc` for the ring storage).
//! Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! pigment-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod atomic;
pub mod determinism;
pub mod math;
pub mod param;
pub mod spsc;
pub mod trace;

// Re-export main types at crate root
pub use atomic::AtomicFloat;
pub use determinism::{DEFAULT_SEED, Determinism, Xorshift32};
pub use math::{CENTS_PER_OCTAVE, cents_to_ratio, flush_denormal, ratio_to_cents};
pub use param::SmoothedGain;
pub use spsc::{Consumer, Producer, SpscRing};
pub use trace::{TraceKind, TraceLog, TraceRecord};
