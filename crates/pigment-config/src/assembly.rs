//! Build a ready-to-run engine from a configuration.

use std::sync::Arc;

use pigment_core::TraceLog;
use pigment_synth::{EngineContext, EngineHandle, SynthEngine};

use crate::engine_config::EngineConfig;
use crate::error::ConfigError;

/// A prepared engine, its UI handle and the services they share.
///
/// Move `engine` to the audio thread and keep `handle` on the UI thread.
#[derive(Debug)]
pub struct EngineAssembly {
    /// Audio-thread half.
    pub engine: SynthEngine,
    /// UI-thread half.
    pub handle: EngineHandle,
    /// Determinism context and trace log.
    pub context: EngineContext,
}

impl EngineConfig {
    /// Validate, then construct the determinism context, trace log and both
    /// engine halves, and prepare the engine.
    ///
    /// ```rust
    /// use pigment_config::EngineConfig;
    ///
    /// let assembly = EngineConfig::default().build().unwrap();
    /// assert!(assembly.engine.is_prepared());
    /// assert_eq!(assembly.engine.settings().voice_count, 8);
    /// ```
    pub fn build(&self) -> Result<EngineAssembly, ConfigError> {
        self.validate()?;

        let context = EngineContext {
            determinism: Arc::new(self.determinism()),
            trace: Arc::new(TraceLog::with_capacity(self.trace.capacity)),
        };
        let (mut engine, mut handle) = SynthEngine::new(context.clone());

        handle.set_mapping(self.gesture_mapping());
        handle.set_master_gain(self.engine.master_gain);
        engine.prepare_with(&self.engine_settings());

        tracing::debug!(
            sample_rate = self.engine.sample_rate,
            voices = self.engine.voice_count,
            deterministic = self.determinism.enabled,
            "engine assembled"
        );

        Ok(EngineAssembly {
            engine,
            handle,
            context,
        })
    }
}
