//! Small numeric helpers shared by the synthesis code.

use libm::{exp2, log2};

/// Cents in one octave.
pub const CENTS_PER_OCTAVE: f64 = 1200.0;

/// Flush subnormal-range values to zero.
///
/// Sums of decaying signals can drift into the subnormal range, where some
/// CPUs slow down by orders of magnitude. Anything below `1e-20` is far
/// beneath audibility and becomes an exact zero.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Convert a cents offset to a frequency ratio (1200 cents = 2.0).
#[inline]
pub fn cents_to_ratio(cents: f64) -> f64 {
    exp2(cents / CENTS_PER_OCTAVE)
}

/// Convert a frequency ratio to cents.
///
/// The ratio must be positive; callers guard against zero and negative
/// frequencies before converting.
#[inline]
pub fn ratio_to_cents(ratio: f64) -> f64 {
    CENTS_PER_OCTAVE * log2(ratio)
}
