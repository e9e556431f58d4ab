//! Mapping from canvas gestures to paint events.
//!
//! Runs on the UI thread. Vertical position chooses pitch, horizontal
//! position chooses pan, and pressure drives amplitude, brightness (partial
//! count) and how strongly the pitch snaps to the scale.

use libm::powf;

use crate::event::{GestureSample, PaintEvent};
use crate::quantizer::{
    BASE_SIGMA_CENTS, MIN_SIGMA_CENTS, compute_snapped_frequency_cmaj, pressure_to_sigma_cents,
};

/// Lowest frequency reachable from the canvas.
pub const DEFAULT_MIN_HZ: f32 = 80.0;
/// Highest frequency reachable from the canvas.
pub const DEFAULT_MAX_HZ: f32 = 2000.0;
/// Amplitude floor so light strokes stay audible.
pub const DEFAULT_MIN_AMPLITUDE: f32 = 0.1;
/// Partials at zero pressure.
pub const DEFAULT_BASE_PARTIALS: u16 = 8;
/// Extra partials added at full pressure.
pub const DEFAULT_PRESSURE_PARTIALS: u16 = 8;

/// How canvas height maps onto the frequency range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrequencyCurve {
    /// `min + y * (max - min)`.
    #[default]
    Linear,
    /// `min * (max / min)^y`, equal distance per octave.
    Exponential,
}

/// Harmonic quantizer parameters used by [`GestureMapping`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuantizerSettings {
    /// Whether pitches are pulled toward the scale at all.
    pub enabled: bool,
    /// Snap sigma at zero pressure, in cents.
    pub base_sigma_cents: f64,
    /// Snap sigma at full pressure, in cents.
    pub min_sigma_cents: f64,
}

impl Default for QuantizerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_sigma_cents: BASE_SIGMA_CENTS,
            min_sigma_cents: MIN_SIGMA_CENTS,
        }
    }
}

/// Converts [`GestureSample`]s into [`PaintEvent`]s.
///
/// # Example
///
/// ```rust
/// use pigment_synth::{GestureMapping, GestureSample};
///
/// let mapping = GestureMapping::default();
/// let event = mapping.to_event(GestureSample::new(1.0, 0.0, 0.5));
///
/// assert_eq!(event.pan, 1.0);
/// assert_eq!(event.partials, 12);
/// assert!((event.amplitude - 0.5).abs() < 1e-6);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureMapping {
    /// Frequency at `y = 0`.
    pub min_hz: f32,
    /// Frequency at `y = 1`.
    pub max_hz: f32,
    /// Shape of the `y` to frequency mapping.
    pub curve: FrequencyCurve,
    /// Amplitude used for the lightest touch.
    pub min_amplitude: f32,
    /// Partials at zero pressure.
    pub base_partials: u16,
    /// Partials added at full pressure.
    pub pressure_partials: u16,
    /// Scale snapping.
    pub quantizer: QuantizerSettings,
}

impl Default for GestureMapping {
    fn default() -> Self {
        Self {
            min_hz: DEFAULT_MIN_HZ,
            max_hz: DEFAULT_MAX_HZ,
            curve: FrequencyCurve::Linear,
            min_amplitude: DEFAULT_MIN_AMPLITUDE,
            base_partials: DEFAULT_BASE_PARTIALS,
            pressure_partials: DEFAULT_PRESSURE_PARTIALS,
            quantizer: QuantizerSettings::default(),
        }
    }
}

impl GestureMapping {
    /// Raw (unquantized) frequency for a normalized height.
    pub fn raw_frequency(&self, y: f32) -> f32 {
        let y = if y.is_finite() { y.clamp(0.0, 1.0) } else { 0.0 };
        match self.curve {
            FrequencyCurve::Linear => self.min_hz + y * (self.max_hz - self.min_hz),
            FrequencyCurve::Exponential if self.min_hz > 0.0 => {
                self.min_hz * powf(self.max_hz / self.min_hz, y)
            }
            FrequencyCurve::Exponential => self.min_hz + y * (self.max_hz - self.min_hz),
        }
    }

    /// Map a gesture to an event, applying harmonic quantization.
    pub fn to_event(&self, sample: GestureSample) -> PaintEvent {
        let g = sample.sanitized();

        let raw_hz = self.raw_frequency(g.y);
        let base_hz = if self.quantizer.enabled {
            let sigma = pressure_to_sigma_cents(
                f64::from(g.pressure),
                self.quantizer.base_sigma_cents,
                self.quantizer.min_sigma_cents,
            );
            compute_snapped_frequency_cmaj(f64::from(raw_hz), sigma).0 as f32
        } else {
            raw_hz
        };

        let floor = if self.min_amplitude.is_finite() {
            self.min_amplitude.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let amplitude = g.pressure.clamp(floor, 1.0);
        let pan = (g.x - 0.5) * 2.0;
        let partials = self
            .base_partials
            .saturating_add((g.pressure * f32::from(self.pressure_partials)) as u16);

        PaintEvent::new(base_hz, amplitude, pan, partials).with_phase(g.phase)
    }
}
