//! Configuration and assembly for the pigment paint synthesizer.
//!
//! Reads the engine setup from TOML, validates it, and builds a prepared
//! [`SynthEngine`](pigment_synth::SynthEngine) together with its UI handle.
//!
//! # Features
//!
//! - **Config files**: Every section and key optional, with defaults
//! - **Validation**: All problems reported at once
//! - **Assembly**: One call from config to a running engine pair
//!
//! # Example
//!
//! ```rust
//! use pigment_config::EngineConfig;
//!
//! let config = EngineConfig::from_toml(
//!     r#"
//!     [engine]
//!     voice_count = 4
//!
//!     [determinism]
//!     enabled = true
//!     seed = 1234
//!     "#,
//! )
//! .unwrap();
//!
//! let mut assembly = config.build().unwrap();
//! assert!(assembly.handle.post_event(0.5, 0.5, 0.8));
//!
//! let mut left = vec![0.0f32; 512];
//! let mut right = vec![0.0f32; 512];
//! assembly.engine.process(&mut [&mut left[..], &mut right[..]]);
//! ```

mod assembly;
mod engine_config;
mod error;

/// Configuration validation.
pub mod validation;

pub use assembly::EngineAssembly;
pub use engine_config::{
    CurveSetting, DeterminismSection, EngineConfig, EngineSection, EnvelopeSection,
    GestureSection, QuantizerSection, TraceSection,
};
pub use error::ConfigError;
pub use validation::{ValidationError, ValidationResult, check_range, validate_config};
