//! Harmonic quantizer: pulls raw frequencies toward the C major scale.
//!
//! All functions are pure. They work in cents relative to C4 (A4 = 440 Hz)
//! and use a Gaussian kernel over the distance to the nearest scale degree:
//!
//! ```text
//! weight = exp(-0.5 * (d / sigma)^2)
//! ```
//!
//! `d` is the distance in cents to the nearest degree in any octave and
//! `sigma` is derived from pen pressure with [`pressure_to_sigma_cents`].
//! A small sigma gives a narrow capture window: pitches close to a degree
//! are pulled onto it, distant ones are left almost untouched.
//!
//! The snapped frequency is the input moved toward the degree by `weight`,
//! interpolated in cents (log-frequency) space.
//!
//! ```rust
//! use pigment_synth::quantizer::{
//!     C4_HZ, compute_snap_weight_cmaj, compute_snapped_frequency_cmaj, pressure_to_sigma_cents,
//! };
//!
//! let sigma = pressure_to_sigma_cents(0.8, 200.0, 8.0);
//! assert!(compute_snap_weight_cmaj(C4_HZ, sigma) > 0.999);
//!
//! let (hz, weight) = compute_snapped_frequency_cmaj(1040.0, sigma);
//! assert!(hz > 1040.0 && hz < 1046.6);
//! assert!(weight > 0.0 && weight < 1.0);
//! ```

use libm::{exp, floor, pow};
use pigment_core::{CENTS_PER_OCTAVE, cents_to_ratio, ratio_to_cents};

/// Middle C with A4 = 440 Hz.
pub const C4_HZ: f64 = 261.625_565_300_598_6;

/// C major scale degrees, in cents above C.
pub const CMAJ_DEGREES_CENTS: [f64; 7] = [0.0, 200.0, 400.0, 500.0, 700.0, 900.0, 1100.0];

/// Sigma at zero pressure.
pub const BASE_SIGMA_CENTS: f64 = 200.0;

/// Sigma at full pressure.
pub const MIN_SIGMA_CENTS: f64 = 8.0;

/// Smallest sigma used internally.
pub const SIGMA_FLOOR_CENTS: f64 = 1e-3;

/// Map pen pressure to a snap sigma in cents.
///
/// Geometric interpolation from `base_sigma` at pressure 0 to `min_sigma` at
/// pressure 1. Pressure is clamped to `[0, 1]`; non-finite pressure counts as
/// zero. With `base_sigma > min_sigma` the result strictly decreases with
/// pressure.
pub fn pressure_to_sigma_cents(pressure: f64, base_sigma: f64, min_sigma: f64) -> f64 {
    let p = if pressure.is_finite() {
        pressure.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let base = sanitize_sigma(base_sigma);
    let min = sanitize_sigma(min_sigma);
    base * pow(min / base, p)
}

/// Snap weight in `[0, 1]` of `hz` against the nearest C major degree.
///
/// Exactly `1.0` on a scale degree. Zero, negative, or non-finite input
/// frequencies return `0.0`.
pub fn compute_snap_weight_cmaj(hz: f64, sigma_cents: f64) -> f64 {
    match cents_from_c4(hz) {
        Some(cents) => gaussian(cents - nearest_degree_cents(cents), sigma_cents),
        None => 0.0,
    }
}

/// Move `hz` toward the nearest C major degree, returning
/// `(snapped_hz, weight)`.
///
/// At weight 1 the result is the degree itself; at weight 0 it is the input.
/// The result always lies between the two and is finite for every finite
/// positive input. Invalid input frequencies return `(0.0, 0.0)`.
pub fn compute_snapped_frequency_cmaj(hz: f64, sigma_cents: f64) -> (f64, f64) {
    let Some(cents) = cents_from_c4(hz) else {
        return (0.0, 0.0);
    };
    let target = nearest_degree_cents(cents);
    let weight = gaussian(cents - target, sigma_cents);
    let blended = cents + weight * (target - cents);
    let snapped = C4_HZ * cents_to_ratio(blended);
    if snapped.is_finite() {
        (snapped, weight)
    } else {
        (hz, 0.0)
    }
}

/// Frequency of the C major degree nearest to `hz`, or `0.0` for invalid
/// input.
pub fn nearest_scale_degree_hz(hz: f64) -> f64 {
    let Some(cents) = cents_from_c4(hz) else {
        return 0.0;
    };
    let degree = C4_HZ * cents_to_ratio(nearest_degree_cents(cents));
    if degree.is_finite() { degree } else { hz }
}

fn cents_from_c4(hz: f64) -> Option<f64> {
    if hz.is_finite() && hz > 0.0 {
        Some(ratio_to_cents(hz / C4_HZ))
    } else {
        None
    }
}

// The next octave's tonic is a candidate too, so B..C is covered. Near the
// top of the f64 range a degree above the input may not be representable in
// Hz; then the nearest degree at or below the input is used.
fn nearest_degree_cents(cents: f64) -> f64 {
    let octave = floor(cents / CENTS_PER_OCTAVE) * CENTS_PER_OCTAVE;
    let within = cents - octave;

    let mut best = CENTS_PER_OCTAVE;
    let mut best_dist = (within - CENTS_PER_OCTAVE).abs();
    for &degree in &CMAJ_DEGREES_CENTS {
        let dist = (within - degree).abs();
        if dist < best_dist {
            best = degree;
            best_dist = dist;
        }
    }

    if best > within && !(C4_HZ * cents_to_ratio(octave + best)).is_finite() {
        best = CMAJ_DEGREES_CENTS
            .iter()
            .copied()
            .filter(|&degree| degree <= within)
            .fold(0.0, f64::max);
    }
    octave + best
}

fn gaussian(distance_cents: f64, sigma_cents: f64) -> f64 {
    let z = distance_cents / sanitize_sigma(sigma_cents);
    exp(-0.5 * z * z).clamp(0.0, 1.0)
}

#[inline]
fn sanitize_sigma(sigma: f64) -> f64 {
    if sigma.is_nan() {
        SIGMA_FLOOR_CENTS
    } else {
        sigma.max(SIGMA_FLOOR_CENTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sigma(p: f64) -> f64 {
        pressure_to_sigma_cents(p, BASE_SIGMA_CENTS, MIN_SIGMA_CENTS)
    }

    #[test]
    fn test_sigma_endpoints_and_monotonic() {
        assert!((sigma(0.0) - 200.0).abs() < 1e-9);
        assert!((sigma(1.0) - 8.0).abs() < 1e-9);

        let mut prev = f64::INFINITY;
        for i in 0..=100 {
            let s = sigma(f64::from(i) / 100.0);
            assert!(s < prev, "sigma must strictly decrease");
            prev = s;
        }
    }

    #[test]
    fn test_sigma_clamps_pressure() {
        assert_eq!(sigma(-3.0), sigma(0.0));
        assert_eq!(sigma(7.0), sigma(1.0));
        assert_eq!(sigma(f64::NAN), sigma(0.0));
    }

    #[test]
    fn test_weight_peaks_on_scale_degrees() {
        let s = sigma(0.8);
        for degree in CMAJ_DEGREES_CENTS {
            for octave in [-2.0, 0.0, 1.0, 3.0] {
                let hz = C4_HZ * cents_to_ratio(degree + octave * 1200.0);
                let w = compute_snap_weight_cmaj(hz, s);
                assert!(w > 0.999_999, "degree {degree} octave {octave}: {w}");
            }
        }
    }

    #[test]
    fn test_off_scale_weight_is_lower() {
        let s = sigma(0.8);
        let on = compute_snap_weight_cmaj(C4_HZ, s);
        let ds4 = compute_snap_weight_cmaj(311.0, s);
        assert!(ds4 < on);
    }

    #[test]
    fn test_nearest_degree_wraps_to_next_tonic() {
        // 1180 cents above C4 is closer to C5 than to B4.
        let hz = C4_HZ * cents_to_ratio(1180.0);
        let nearest = nearest_scale_degree_hz(hz);
        assert!((nearest - 2.0 * C4_HZ).abs() < 1e-6, "got {nearest}");

        // Below C4 uses the octave below.
        let b3 = C4_HZ * cents_to_ratio(-100.0);
        assert!((nearest_scale_degree_hz(b3 * 1.001) - b3).abs() < 1e-6);
    }

    #[test]
    fn test_snap_blends_between_input_and_degree() {
        let s = sigma(0.8);
        let (hz, w) = compute_snapped_frequency_cmaj(1040.0, s);
        let degree = nearest_scale_degree_hz(1040.0);
        assert!(w > 0.0 && w < 1.0);
        assert!(hz > 1040.0 && hz < degree, "hz {hz} degree {degree}");
    }

    #[test]
    fn test_snap_on_degree_is_identity() {
        let (hz, w) = compute_snapped_frequency_cmaj(C4_HZ, 10.0);
        assert!((hz - C4_HZ).abs() < 1e-9);
        assert!((w - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_frequencies() {
        for hz in [0.0, -10.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(compute_snapped_frequency_cmaj(hz, 50.0), (0.0, 0.0));
            assert_eq!(compute_snap_weight_cmaj(hz, 50.0), 0.0);
            assert_eq!(nearest_scale_degree_hz(hz), 0.0);
        }
    }

    #[test]
    fn test_huge_frequencies_stay_finite() {
        for k in 0..2000 {
            let hz = f64::MAX * (1.0 - f64::from(k) * 1e-4);
            for s in [BASE_SIGMA_CENTS, MIN_SIGMA_CENTS] {
                let (snapped, w) = compute_snapped_frequency_cmaj(hz, s);
                assert!(snapped.is_finite() && snapped > 0.0, "hz {hz}: {snapped}");
                assert!((0.0..=1.0).contains(&w));
            }
            assert!(nearest_scale_degree_hz(hz).is_finite(), "hz {hz}");
        }
    }

    #[test]
    fn test_tiny_and_nan_sigma_stay_finite() {
        for s in [0.0, -5.0, 1e-300, f64::NAN] {
            let (hz, w) = compute_snapped_frequency_cmaj(300.0, s);
            assert!(hz.is_finite() && hz > 0.0);
            assert!((0.0..=1.0).contains(&w));
        }
    }
}
