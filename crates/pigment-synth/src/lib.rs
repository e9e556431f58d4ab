//! Pigment Synth - paint-driven additive synthesis
//!
//! Turns canvas gestures into sound. The UI thread maps each gesture sample
//! to a [`PaintEvent`] and posts it through an [`EngineHandle`]; the audio
//! thread's [`SynthEngine`] drains the events once per block and renders a
//! fixed pool of additive voices.
//!
//! # Core Components
//!
//! ## Engine
//!
//! - [`SynthEngine`] - Audio-thread half: `prepare`, `process`, master gain
//! - [`EngineHandle`] - UI-thread half: `post_event`, `post_stroke`
//! - [`EngineSettings`] / [`EngineContext`] - Setup and shared services
//!
//! ```rust
//! use pigment_synth::{EngineContext, GestureSample, StrokePhase, SynthEngine};
//!
//! let (mut engine, mut handle) = SynthEngine::new(EngineContext::default());
//! engine.prepare(44100.0, 256, 12, 4);
//!
//! handle.post_stroke(GestureSample::new(0.3, 0.7, 0.6).with_phase(StrokePhase::Start));
//! handle.post_stroke(GestureSample::new(0.3, 0.7, 0.0).with_phase(StrokePhase::End));
//!
//! let mut out = vec![0.0f32; 256];
//! engine.process(&mut [&mut out[..]]);
//! ```
//!
//! ## Gestures and Pitch
//!
//! - [`GestureSample`] / [`PaintEvent`] / [`StrokePhase`] - Event model
//! - [`GestureMapping`] - Canvas position and pressure to synthesis parameters
//! - [`quantizer`] - Gaussian snapping of frequencies to the C major scale
//!
//! ## Voices
//!
//! - [`Voice`] - Harmonic sine partials under an ADSR envelope
//! - [`VoicePool`] - Fixed voice set, first-free allocation
//! - [`AdsrEnvelope`] / [`SineOscillator`] - Building blocks
//!
//! # no_std Support
//!
//! Like `pigment-core`, this crate builds without `std` (it needs `alloc`).

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod engine;
pub mod envelope;
pub mod event;
pub mod gesture;
pub mod oscillator;
pub mod quantizer;
pub mod voice;

pub use engine::{
    DEFAULT_MASTER_GAIN, EngineContext, EngineHandle, EngineSettings, MAX_MASTER_GAIN,
    QUEUE_CAPACITY, SynthEngine,
};
pub use envelope::{AdsrEnvelope, EnvelopeSettings, EnvelopeState};
pub use event::{GestureSample, PaintEvent, StrokePhase};
pub use gesture::{FrequencyCurve, GestureMapping, QuantizerSettings};
pub use oscillator::SineOscillator;
pub use quantizer::{
    compute_snap_weight_cmaj, compute_snapped_frequency_cmaj, nearest_scale_degree_hz,
    pressure_to_sigma_cents,
};
pub use voice::{MAX_PARTIALS, Voice, VoicePool};
