//! Phase-accumulating sine oscillator used for additive partials.

use core::f32::consts::TAU;
use libm::{floorf, sinf};

/// Wrap into `[0, 1)`.
#[inline]
fn wrap_unit(a: f32) -> f32 {
    let r = a - floorf(a);
    if r >= 1.0 { 0.0 } else { r }
}

/// Phase-continuous sine generator.
///
/// Changing the frequency never resets the phase, so a voice can be
/// re-pitched mid-stroke without a click.
///
/// # Example
///
/// ```rust
/// use pigment_synth::SineOscillator;
///
/// let mut osc = SineOscillator::new(48000.0);
/// osc.set_frequency(440.0);
///
/// assert_eq!(osc.advance(), 0.0);
/// assert!(osc.advance() > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct SineOscillator {
    /// Current phase position [0.0, 1.0)
    phase: f32,
    /// Phase increment per sample
    phase_inc: f32,
    sample_rate: f32,
    frequency: f32,
}

impl Default for SineOscillator {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl SineOscillator {
    /// Create a silent (0 Hz) oscillator at phase 0.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: 0.0,
            sample_rate,
            frequency: 0.0,
        }
    }

    /// Set frequency in Hz. Negative or non-finite values give 0 Hz.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.frequency = if freq_hz.is_finite() {
            freq_hz.max(0.0)
        } else {
            0.0
        };
        self.update_increment();
    }

    /// Current frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set sample rate and recalculate the phase increment.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_increment();
    }

    /// Set phase directly; wrapped into `[0, 1)`.
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = if phase.is_finite() {
            wrap_unit(phase)
        } else {
            0.0
        };
    }

    /// Current phase.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Reset phase to 0.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Generate the next sample.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let output = sinf(self.phase * TAU);
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        output
    }

    fn update_increment(&mut self) {
        self.phase_inc = if self.sample_rate > 0.0 {
            wrap_unit(self.frequency / self.sample_rate)
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_zero_frequency_is_silent() {
        let mut osc = SineOscillator::new(48000.0);
        for _ in 0..64 {
            assert_eq!(osc.advance(), 0.0);
        }
    }

    #[test]
    fn test_period() {
        let mut osc = SineOscillator::new(48000.0);
        osc.set_frequency(1000.0);

        // 48 samples per cycle: quarter period is the peak
        let samples: Vec<f32> = (0..48).map(|_| osc.advance()).collect();
        assert!((samples[12] - 1.0).abs() < 1e-4);
        assert!((samples[36] + 1.0).abs() < 1e-4);
        assert!(osc.phase() < 1e-3 || osc.phase() > 1.0 - 1e-3);
    }

    #[test]
    fn test_frequency_change_keeps_phase() {
        let mut osc = SineOscillator::new(48000.0);
        osc.set_frequency(440.0);
        for _ in 0..100 {
            osc.advance();
        }
        let before = osc.phase();
        osc.set_frequency(880.0);
        assert_eq!(osc.phase(), before);
    }

    #[test]
    fn test_invalid_values() {
        let mut osc = SineOscillator::new(48000.0);
        osc.set_frequency(f32::NAN);
        assert_eq!(osc.frequency(), 0.0);
        osc.set_frequency(-5.0);
        assert_eq!(osc.frequency(), 0.0);

        osc.set_phase(1.25);
        assert!((osc.phase() - 0.25).abs() < 1e-6);
        osc.set_phase(-0.25);
        assert!((osc.phase() - 0.75).abs() < 1e-6);
        osc.set_phase(f32::INFINITY);
        assert_eq!(osc.phase(), 0.0);
    }
}
