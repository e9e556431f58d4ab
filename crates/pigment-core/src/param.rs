//! Per-sample smoothing for parameters read once per block.
//!
//! Values such as master gain cross threads as a single atomic that the audio
//! thread reads at the start of each block. Applying that value as a step
//! causes "zipper" clicks, so [`SmoothedGain`] glides toward it with a
//! one-pole lowpass instead.
//!
//! ```rust
//! use pigment_core::SmoothedGain;
//!
//! let mut gain = SmoothedGain::new(1.0, 48000.0, 5.0);
//! gain.set_target(0.0);
//!
//! let mut last = 1.0;
//! for _ in 0..480 {
//!     last = gain.advance();
//! }
//! assert!(last < 0.2);
//! ```

use libm::expf;

/// Exponentially smoothed gain value.
#[derive(Debug, Clone)]
pub struct SmoothedGain {
    current: f32,
    target: f32,
    /// 1.0 means the target is reached in a single sample.
    coeff: f32,
    sample_rate: f32,
    time_ms: f32,
}

impl Default for SmoothedGain {
    fn default() -> Self {
        Self::new(1.0, 48000.0, 0.0)
    }
}

impl SmoothedGain {
    /// Create a smoother resting at `initial`.
    ///
    /// `time_ms` is the one-pole time constant; `0.0` disables smoothing.
    pub fn new(initial: f32, sample_rate: f32, time_ms: f32) -> Self {
        let mut gain = Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate,
            time_ms,
        };
        gain.recalculate_coeff();
        gain
    }

    /// Set the value to glide toward.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump to `value` with no glide.
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Change the sample rate, keeping the time constant.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        if (self.current - self.target).abs() < 1e-7 {
            self.current = self.target;
        }
        self.current
    }

    /// Current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Value being approached.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Whether the glide has finished.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    // coeff = 1 - exp(-1 / (tau * fs)); tau in seconds.
    fn recalculate_coeff(&mut self) {
        self.coeff = if self.time_ms <= 0.0 || self.sample_rate <= 0.0 {
            1.0
        } else {
            let samples = self.time_ms * 0.001 * self.sample_rate;
            1.0 - expf(-1.0 / samples)
        };
    }
}
