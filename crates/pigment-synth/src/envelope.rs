//! ADSR amplitude envelope for paint voices.
//!
//! Exponential segments: the attack approaches an overshoot target so it
//! reaches full level in roughly the configured time, decay and release
//! approach their targets with one-pole curves and snap to exact values once
//! close enough. A released envelope therefore ends at an exact zero rather
//! than lingering in the subnormal range.

use libm::expf;

/// Level below which the release snaps to zero and the envelope goes idle.
const SILENCE_LEVEL: f32 = 1e-4;

/// Attack overshoot target; the segment ends when the level crosses 1.0.
const ATTACK_TARGET: f32 = 1.2;

/// ADSR envelope states
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Envelope is inactive; output is zero.
    #[default]
    Idle,
    /// Output ramps up toward peak level.
    Attack,
    /// Output falls from peak toward the sustain level.
    Decay,
    /// Output holds at the sustain level while the stroke continues.
    Sustain,
    /// Output decays to zero after the stroke ends.
    Release,
}

/// Envelope timing, shared by every voice in a pool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeSettings {
    /// Attack time in milliseconds.
    pub attack_ms: f32,
    /// Decay time in milliseconds.
    pub decay_ms: f32,
    /// Sustain level, 0.0 to 1.0.
    pub sustain: f32,
    /// Release time in milliseconds.
    pub release_ms: f32,
}

impl Default for EnvelopeSettings {
    /// Short attack and decay so brush dabs speak immediately.
    fn default() -> Self {
        Self {
            attack_ms: 2.0,
            decay_ms: 10.0,
            sustain: 0.8,
            release_ms: 50.0,
        }
    }
}

/// ADSR envelope generator.
///
/// # Example
///
/// ```rust
/// use pigment_synth::{AdsrEnvelope, EnvelopeSettings, EnvelopeState};
///
/// let mut env = AdsrEnvelope::with_settings(48000.0, EnvelopeSettings::default());
/// env.gate_on();
/// for _ in 0..4800 {
///     env.advance();
/// }
/// assert_eq!(env.state(), EnvelopeState::Sustain);
///
/// env.gate_off();
/// for _ in 0..48000 {
///     env.advance();
/// }
/// assert_eq!(env.state(), EnvelopeState::Idle);
/// assert_eq!(env.level(), 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    state: EnvelopeState,
    level: f32,
    sample_rate: f32,
    settings: EnvelopeSettings,

    attack_coeff: f32,
    decay_coeff: f32,
    release_coeff: f32,
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl AdsrEnvelope {
    /// Create an envelope with [`EnvelopeSettings::default`].
    pub fn new(sample_rate: f32) -> Self {
        Self::with_settings(sample_rate, EnvelopeSettings::default())
    }

    /// Create an envelope with explicit timing.
    pub fn with_settings(sample_rate: f32, settings: EnvelopeSettings) -> Self {
        let mut env = Self {
            state: EnvelopeState::Idle,
            level: 0.0,
            sample_rate,
            settings: EnvelopeSettings::default(),
            attack_coeff: 0.0,
            decay_coeff: 0.0,
            release_coeff: 0.0,
        };
        env.set_settings(settings);
        env
    }

    /// Replace all timing values. Times are floored at 0.1 ms and sustain is
    /// clamped to `[0, 1]`; non-finite values fall back to the defaults.
    pub fn set_settings(&mut self, settings: EnvelopeSettings) {
        let defaults = EnvelopeSettings::default();
        self.settings = EnvelopeSettings {
            attack_ms: time_or(settings.attack_ms, defaults.attack_ms),
            decay_ms: time_or(settings.decay_ms, defaults.decay_ms),
            sustain: if settings.sustain.is_finite() {
                settings.sustain.clamp(0.0, 1.0)
            } else {
                defaults.sustain
            },
            release_ms: time_or(settings.release_ms, defaults.release_ms),
        };
        self.recalculate_coefficients();
    }

    /// Current timing values.
    pub fn settings(&self) -> EnvelopeSettings {
        self.settings
    }

    /// Set sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coefficients();
    }

    /// Start (or restart) the attack. The current level is kept so a
    /// re-trigger glides up from where it was instead of clicking to zero.
    pub fn gate_on(&mut self) {
        self.state = EnvelopeState::Attack;
    }

    /// Enter release.
    pub fn gate_off(&mut self) {
        if self.state != EnvelopeState::Idle {
            self.state = EnvelopeState::Release;
        }
    }

    /// Force envelope to idle state.
    pub fn reset(&mut self) {
        self.state = EnvelopeState::Idle;
        self.level = 0.0;
    }

    /// Get current state.
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Get current level without advancing.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Check if envelope is active (not idle).
    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    /// Advance envelope by one sample and return current level.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        match self.state {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                self.level = ATTACK_TARGET + (self.level - ATTACK_TARGET) * self.attack_coeff;

                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.state = EnvelopeState::Decay;
                }
            }

            EnvelopeState::Decay => {
                let sustain = self.settings.sustain;
                self.level = sustain + (self.level - sustain) * self.decay_coeff;

                if (self.level - sustain).abs() < SILENCE_LEVEL {
                    self.level = sustain;
                    self.state = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                self.level = self.settings.sustain;
            }

            EnvelopeState::Release => {
                self.level *= self.release_coeff;

                if self.level < SILENCE_LEVEL {
                    self.level = 0.0;
                    self.state = EnvelopeState::Idle;
                }
            }
        }

        self.level
    }

    fn recalculate_coefficients(&mut self) {
        self.attack_coeff = self.coeff_for(self.settings.attack_ms);
        self.decay_coeff = self.coeff_for(self.settings.decay_ms);
        self.release_coeff = self.coeff_for(self.settings.release_ms);
    }

    // exp(-1 / samples): ~63% of the way to the target per time constant
    fn coeff_for(&self, ms: f32) -> f32 {
        let samples = ms * self.sample_rate / 1000.0;
        expf(-1.0 / samples.max(1.0))
    }
}

#[inline]
fn time_or(ms: f32, fallback: f32) -> f32 {
    if ms.is_finite() { ms.max(0.1) } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_idle_state() {
        let mut env = AdsrEnvelope::new(48000.0);
        assert_eq!(env.state(), EnvelopeState::Idle);
        assert_eq!(env.level(), 0.0);

        for _ in 0..100 {
            assert_eq!(env.advance(), 0.0);
        }
    }

    #[test]
    fn test_attack_reaches_peak_quickly() {
        let mut env = AdsrEnvelope::new(48000.0);
        env.gate_on();
        assert_eq!(env.state(), EnvelopeState::Attack);

        // default attack is 2ms = 96 samples; allow a few time constants
        let mut peak = 0.0f32;
        for _ in 0..480 {
            peak = peak.max(env.advance());
        }
        assert_eq!(peak, 1.0);
        assert_ne!(env.state(), EnvelopeState::Attack);
    }

    #[test]
    fn test_decay_to_sustain() {
        let mut env = AdsrEnvelope::with_settings(
            48000.0,
            EnvelopeSettings {
                sustain: 0.5,
                ..EnvelopeSettings::default()
            },
        );
        env.gate_on();
        for _ in 0..5000 {
            env.advance();
        }
        assert_eq!(env.state(), EnvelopeState::Sustain);
        assert_eq!(env.level(), 0.5);
    }

    #[test]
    fn test_release_ends_at_exact_zero() {
        let mut env = AdsrEnvelope::new(48000.0);
        env.gate_on();
        for _ in 0..1000 {
            env.advance();
        }
        env.gate_off();
        assert_eq!(env.state(), EnvelopeState::Release);

        let mut prev = env.level();
        for _ in 0..48000 {
            let level = env.advance();
            assert!(level <= prev, "release must not rise");
            prev = level;
        }
        assert_eq!(env.state(), EnvelopeState::Idle);
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn test_gate_off_while_idle_stays_idle() {
        let mut env = AdsrEnvelope::new(48000.0);
        env.gate_off();
        assert_eq!(env.state(), EnvelopeState::Idle);
    }

    #[test]
    fn test_retrigger_keeps_level() {
        let mut env = AdsrEnvelope::new(48000.0);
        env.gate_on();
        for _ in 0..2000 {
            env.advance();
        }
        let held = env.level();
        env.gate_on();
        assert_eq!(env.state(), EnvelopeState::Attack);
        assert_eq!(env.level(), held);
        assert!(env.advance() >= held);
    }

    #[test]
    fn test_settings_are_sanitized() {
        let env = AdsrEnvelope::with_settings(
            48000.0,
            EnvelopeSettings {
                attack_ms: -1.0,
                decay_ms: f32::NAN,
                sustain: 3.0,
                release_ms: 0.0,
            },
        );
        let s = env.settings();
        assert_eq!(s.attack_ms, 0.1);
        assert_eq!(s.decay_ms, EnvelopeSettings::default().decay_ms);
        assert_eq!(s.sustain, 1.0);
        assert_eq!(s.release_ms, 0.1);
    }
}
