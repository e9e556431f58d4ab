//! Atomic `f32` for lock-free parameter passing between threads.
//!
//! The value is stored as its IEEE-754 bit pattern in an [`AtomicU32`].
//! Loads and stores are single instructions on every target with 32-bit
//! atomics, so the audio thread can read a parameter written by the UI
//! thread without locking.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

/// An `f32` that can be shared between threads.
///
/// Intended for simple scalar parameters (gain, mix) where the reader only
/// needs *some* recent value. Callers choose the ordering; [`Ordering::Relaxed`]
/// is enough when no other memory is published alongside the value.
///
/// # Example
///
/// ```rust
/// use core::sync::atomic::Ordering;
/// use pigment_core::AtomicFloat;
///
/// let gain = AtomicFloat::new(0.7);
/// gain.store(0.25, Ordering::Relaxed);
/// assert_eq!(gain.load(Ordering::Relaxed), 0.25);
/// ```
#[derive(Default)]
pub struct AtomicFloat {
    bits: AtomicU32,
}

impl AtomicFloat {
    /// Create a new atomic float.
    pub const fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    /// Load the current value.
    #[inline]
    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.bits.load(order))
    }

    /// Store a new value.
    #[inline]
    pub fn store(&self, value: f32, order: Ordering) {
        self.bits.store(value.to_bits(), order);
    }
}

impl From<f32> for AtomicFloat {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for AtomicFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.load(Ordering::Relaxed), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_special_values() {
        let a = AtomicFloat::new(0.0);
        for v in [1.5, -0.0, f32::MIN_POSITIVE, f32::MAX, -3.25] {
            a.store(v, Ordering::Relaxed);
            assert_eq!(a.load(Ordering::Relaxed).to_bits(), v.to_bits());
        }
    }

    #[test]
    fn test_default_is_zero() {
        let a = AtomicFloat::default();
        assert_eq!(a.load(Ordering::Relaxed), 0.0);
    }
}
