//! Engine configuration validation.
//!
//! Every problem is collected rather than stopping at the first one, so a
//! user editing a config file sees the full list at once.
//!
//! # Example
//!
//! ```rust
//! use pigment_config::{EngineConfig, ValidationError};
//!
//! let mut config = EngineConfig::default();
//! config.engine.voice_count = 0;
//! config.envelope.sustain = 1.5;
//!
//! match config.validate() {
//!     Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
//!     other => panic!("expected two errors, got {other:?}"),
//! }
//! ```

use thiserror::Error;

use crate::engine_config::EngineConfig;
use pigment_synth::{MAX_MASTER_GAIN, MAX_PARTIALS};

/// Lowest supported sample rate.
pub const MIN_SAMPLE_RATE: f64 = 8000.0;
/// Highest supported sample rate.
pub const MAX_SAMPLE_RATE: f64 = 384_000.0;
/// Largest host block accepted.
pub const MAX_BLOCK_SIZE: usize = 65_536;
/// Largest voice pool accepted.
pub const MAX_VOICES: usize = 128;
/// Longest envelope segment, in milliseconds.
pub const MAX_ENVELOPE_MS: f64 = 10_000.0;
/// Largest trace log accepted.
pub const MAX_TRACE_CAPACITY: usize = 1 << 20;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Value out of range.
    #[error("'{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted key, e.g. `engine.sample_rate`.
        param: String,
        /// The rejected value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Value violates a relation with another value.
    #[error("invalid value for '{param}': {reason}")]
    InvalidValue {
        /// Dotted key.
        param: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Check one value against an inclusive range. NaN is always out of range.
pub fn check_range(param: &str, value: f64, min: f64, max: f64) -> ValidationResult<()> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            param: param.to_string(),
            value,
            min,
            max,
        })
    }
}

/// Validate a whole configuration.
///
/// A single problem is returned as-is; several are wrapped in
/// [`ValidationError::Multiple`].
pub fn validate_config(config: &EngineConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();
    let mut check = |result: ValidationResult<()>| {
        if let Err(e) = result {
            errors.push(e);
        }
    };

    let engine = &config.engine;
    check(check_range(
        "engine.sample_rate",
        engine.sample_rate,
        MIN_SAMPLE_RATE,
        MAX_SAMPLE_RATE,
    ));
    check(check_range(
        "engine.max_block_size",
        engine.max_block_size as f64,
        1.0,
        MAX_BLOCK_SIZE as f64,
    ));
    check(check_range(
        "engine.max_partials",
        engine.max_partials as f64,
        1.0,
        MAX_PARTIALS as f64,
    ));
    check(check_range(
        "engine.voice_count",
        engine.voice_count as f64,
        1.0,
        MAX_VOICES as f64,
    ));
    check(check_range(
        "engine.master_gain",
        f64::from(engine.master_gain),
        0.0,
        f64::from(MAX_MASTER_GAIN),
    ));

    let gesture = &config.gesture;
    check(check_range("gesture.min_hz", f64::from(gesture.min_hz), 1.0, 20_000.0));
    check(check_range("gesture.max_hz", f64::from(gesture.max_hz), 1.0, 20_000.0));
    if gesture.max_hz <= gesture.min_hz {
        check(Err(ValidationError::InvalidValue {
            param: "gesture.max_hz".to_string(),
            reason: "must exceed min_hz".to_string(),
        }));
    }
    check(check_range(
        "gesture.min_amplitude",
        f64::from(gesture.min_amplitude),
        0.0,
        1.0,
    ));

    let quantizer = &config.quantizer;
    check(check_range(
        "quantizer.base_sigma_cents",
        quantizer.base_sigma_cents,
        0.01,
        2400.0,
    ));
    check(check_range(
        "quantizer.min_sigma_cents",
        quantizer.min_sigma_cents,
        0.01,
        2400.0,
    ));
    if quantizer.min_sigma_cents >= quantizer.base_sigma_cents {
        check(Err(ValidationError::InvalidValue {
            param: "quantizer.min_sigma_cents".to_string(),
            reason: "must be smaller than base_sigma_cents".to_string(),
        }));
    }

    let envelope = &config.envelope;
    for (param, value) in [
        ("envelope.attack_ms", envelope.attack_ms),
        ("envelope.decay_ms", envelope.decay_ms),
        ("envelope.release_ms", envelope.release_ms),
    ] {
        check(check_range(param, f64::from(value), 0.1, MAX_ENVELOPE_MS));
    }
    check(check_range(
        "envelope.sustain",
        f64::from(envelope.sustain),
        0.0,
        1.0,
    ));

    check(check_range(
        "trace.capacity",
        config.trace.capacity as f64,
        2.0,
        MAX_TRACE_CAPACITY as f64,
    ));

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
