//! Engine configuration file format.

use serde::{Deserialize, Serialize};
use std::path::Path;

use pigment_core::{DEFAULT_SEED, Determinism, TraceLog};
use pigment_synth::gesture::{
    DEFAULT_BASE_PARTIALS, DEFAULT_MAX_HZ, DEFAULT_MIN_AMPLITUDE, DEFAULT_MIN_HZ,
    DEFAULT_PRESSURE_PARTIALS,
};
use pigment_synth::quantizer::{BASE_SIGMA_CENTS, MIN_SIGMA_CENTS};
use pigment_synth::{
    DEFAULT_MASTER_GAIN, EngineSettings, EnvelopeSettings, FrequencyCurve, GestureMapping,
    QuantizerSettings,
};

use crate::error::ConfigError;
use crate::validation::{ValidationResult, validate_config};

/// Complete engine configuration.
///
/// Every section and every key is optional; missing values take the
/// defaults shown below.
///
/// # TOML Format
///
/// ```toml
/// [engine]
/// sample_rate = 48000.0
/// max_block_size = 512
/// max_partials = 16
/// voice_count = 8
/// master_gain = 0.7
/// phase_scatter = true
///
/// [gesture]
/// min_hz = 80.0
/// max_hz = 2000.0
/// curve = "linear"
/// min_amplitude = 0.1
///
/// [quantizer]
/// enabled = true
/// base_sigma_cents = 200.0
/// min_sigma_cents = 8.0
///
/// [envelope]
/// attack_ms = 2.0
/// decay_ms = 10.0
/// sustain = 0.8
/// release_ms = 50.0
///
/// [determinism]
/// enabled = false
/// seed = 1297702388
///
/// [trace]
/// capacity = 4096
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Stream format and voices.
    pub engine: EngineSection,
    /// Canvas to sound mapping.
    pub gesture: GestureSection,
    /// Scale snapping.
    pub quantizer: QuantizerSection,
    /// Voice envelope.
    pub envelope: EnvelopeSection,
    /// Reproducible rendering.
    pub determinism: DeterminismSection,
    /// Diagnostic trace log.
    pub trace: TraceSection,
}

/// `[engine]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSection {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Largest host block.
    pub max_block_size: usize,
    /// Partials per voice.
    pub max_partials: usize,
    /// Voices in the pool.
    pub voice_count: usize,
    /// Initial master gain.
    pub master_gain: f32,
    /// Randomize partial phases of newly started voices.
    pub phase_scatter: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        let settings = EngineSettings::default();
        Self {
            sample_rate: settings.sample_rate,
            max_block_size: settings.max_block_size,
            max_partials: settings.max_partials,
            voice_count: settings.voice_count,
            master_gain: DEFAULT_MASTER_GAIN,
            phase_scatter: settings.phase_scatter,
        }
    }
}

/// Frequency curve names used in config files.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CurveSetting {
    /// Linear in Hz.
    #[default]
    Linear,
    /// Linear in octaves.
    Exponential,
}

impl From<CurveSetting> for FrequencyCurve {
    fn from(curve: CurveSetting) -> Self {
        match curve {
            CurveSetting::Linear => FrequencyCurve::Linear,
            CurveSetting::Exponential => FrequencyCurve::Exponential,
        }
    }
}

/// `[gesture]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GestureSection {
    /// Frequency at the bottom of the canvas.
    pub min_hz: f32,
    /// Frequency at the top of the canvas.
    pub max_hz: f32,
    /// Height to frequency curve.
    pub curve: CurveSetting,
    /// Amplitude floor for light strokes.
    pub min_amplitude: f32,
}

impl Default for GestureSection {
    fn default() -> Self {
        Self {
            min_hz: DEFAULT_MIN_HZ,
            max_hz: DEFAULT_MAX_HZ,
            curve: CurveSetting::Linear,
            min_amplitude: DEFAULT_MIN_AMPLITUDE,
        }
    }
}

/// `[quantizer]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuantizerSection {
    /// Whether to snap pitches to the scale.
    pub enabled: bool,
    /// Sigma at zero pressure, in cents.
    pub base_sigma_cents: f64,
    /// Sigma at full pressure, in cents.
    pub min_sigma_cents: f64,
}

impl Default for QuantizerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            base_sigma_cents: BASE_SIGMA_CENTS,
            min_sigma_cents: MIN_SIGMA_CENTS,
        }
    }
}

/// `[envelope]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvelopeSection {
    /// Attack in milliseconds.
    pub attack_ms: f32,
    /// Decay in milliseconds.
    pub decay_ms: f32,
    /// Sustain level.
    pub sustain: f32,
    /// Release in milliseconds.
    pub release_ms: f32,
}

impl Default for EnvelopeSection {
    fn default() -> Self {
        let env = EnvelopeSettings::default();
        Self {
            attack_ms: env.attack_ms,
            decay_ms: env.decay_ms,
            sustain: env.sustain,
            release_ms: env.release_ms,
        }
    }
}

/// `[determinism]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeterminismSection {
    /// Render reproducibly from `seed`.
    pub enabled: bool,
    /// Generator seed; 0 selects the built-in default.
    pub seed: u32,
}

impl Default for DeterminismSection {
    fn default() -> Self {
        Self {
            enabled: false,
            seed: DEFAULT_SEED,
        }
    }
}

/// `[trace]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TraceSection {
    /// Records kept by the trace log (rounded up to a power of two).
    pub capacity: usize,
}

impl Default for TraceSection {
    fn default() -> Self {
        Self {
            capacity: TraceLog::DEFAULT_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every value; see [`validate_config`].
    pub fn validate(&self) -> ValidationResult<()> {
        validate_config(self)
    }

    /// Settings for [`SynthEngine::prepare_with`](pigment_synth::SynthEngine::prepare_with).
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            sample_rate: self.engine.sample_rate,
            max_block_size: self.engine.max_block_size,
            max_partials: self.engine.max_partials,
            voice_count: self.engine.voice_count,
            envelope: self.envelope_settings(),
            phase_scatter: self.engine.phase_scatter,
        }
    }

    /// Envelope timing for every voice.
    pub fn envelope_settings(&self) -> EnvelopeSettings {
        EnvelopeSettings {
            attack_ms: self.envelope.attack_ms,
            decay_ms: self.envelope.decay_ms,
            sustain: self.envelope.sustain,
            release_ms: self.envelope.release_ms,
        }
    }

    /// Gesture mapping for the UI-side handle.
    pub fn gesture_mapping(&self) -> GestureMapping {
        GestureMapping {
            min_hz: self.gesture.min_hz,
            max_hz: self.gesture.max_hz,
            curve: self.gesture.curve.into(),
            min_amplitude: self.gesture.min_amplitude,
            base_partials: DEFAULT_BASE_PARTIALS,
            pressure_partials: DEFAULT_PRESSURE_PARTIALS,
            quantizer: QuantizerSettings {
                enabled: self.quantizer.enabled,
                base_sigma_cents: self.quantizer.base_sigma_cents,
                min_sigma_cents: self.quantizer.min_sigma_cents,
            },
        }
    }

    /// A determinism context configured from `[determinism]`.
    pub fn determinism(&self) -> Determinism {
        let ctx = Determinism::new();
        ctx.set_seed(self.determinism.seed);
        ctx.set_enabled(self.determinism.enabled);
        ctx
    }
}
