//! Real-time paint synthesis engine.
//!
//! The engine is split into two halves created together by
//! [`SynthEngine::new`]:
//!
//! - [`EngineHandle`] lives on the UI thread. It maps gestures to
//!   [`PaintEvent`]s (harmonic quantization happens here) and pushes them into
//!   a lock-free SPSC ring.
//! - [`SynthEngine`] lives on the audio thread. Each [`process`] call drains
//!   the events queued at block start, triggers voices, renders the pool and
//!   applies the master gain.
//!
//! Only atomics cross between the halves: the ring cursors, the master gain,
//! the prepared flag, the dropped-event counter and the sample clock used to
//! stamp trace records.
//!
//! [`process`]: SynthEngine::process
//!
//! # Example
//!
//! ```rust
//! use pigment_synth::{EngineContext, SynthEngine};
//!
//! let (mut engine, mut handle) = SynthEngine::new(EngineContext::default());
//! engine.prepare(48000.0, 512, 16, 8);
//!
//! assert!(handle.post_event(0.5, 0.5, 0.8));
//!
//! let mut left = vec![0.0f32; 512];
//! let mut right = vec![0.0f32; 512];
//! engine.process(&mut [&mut left[..], &mut right[..]]);
//!
//! assert_eq!(engine.active_voice_count(), 1);
//! assert!(left.iter().any(|&s| s != 0.0));
//! ```

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use pigment_core::{
    AtomicFloat, Consumer, Determinism, Producer, SmoothedGain, SpscRing, TraceKind, TraceLog,
    Xorshift32, flush_denormal,
};

use crate::envelope::EnvelopeSettings;
use crate::event::{GestureSample, PaintEvent, StrokePhase};
use crate::gesture::GestureMapping;
use crate::voice::{MAX_PARTIALS, Voice, VoicePool};

/// Slots in the UI-to-audio event ring (one is always kept free).
pub const QUEUE_CAPACITY: usize = 1024;

/// Upper bound for the master gain.
pub const MAX_MASTER_GAIN: f32 = 2.0;

/// Master gain of a fresh engine.
pub const DEFAULT_MASTER_GAIN: f32 = 0.7;

/// One-pole time constant for master gain changes.
const GAIN_SMOOTHING_MS: f32 = 5.0;

/// Sample rate used when an invalid one is supplied.
const FALLBACK_SAMPLE_RATE: f64 = 48000.0;

/// Distinguishes generator seeds of engines in the same process when
/// deterministic rendering is off.
static ENGINE_SALT: AtomicU32 = AtomicU32::new(1);

type EventRing = SpscRing<PaintEvent, QUEUE_CAPACITY>;

/// Stream format and voice configuration applied by
/// [`SynthEngine::prepare_with`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineSettings {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Largest block the host will pass to `process`.
    pub max_block_size: usize,
    /// Partial limit per voice, at most [`MAX_PARTIALS`].
    pub max_partials: usize,
    /// Number of voices in the pool.
    pub voice_count: usize,
    /// Envelope timing for every voice.
    pub envelope: EnvelopeSettings,
    /// Randomize partial phases when an idle voice starts.
    pub phase_scatter: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            max_block_size: 512,
            max_partials: 16,
            voice_count: 8,
            envelope: EnvelopeSettings::default(),
            phase_scatter: true,
        }
    }
}

/// Explicitly constructed services shared by an engine.
#[derive(Debug, Clone)]
pub struct EngineContext {
    /// Deterministic rendering switch and seed.
    pub determinism: Arc<Determinism>,
    /// Diagnostic event log.
    pub trace: Arc<TraceLog>,
}

impl Default for EngineContext {
    fn default() -> Self {
        Self {
            determinism: Arc::new(Determinism::new()),
            trace: Arc::new(TraceLog::with_capacity(TraceLog::DEFAULT_CAPACITY)),
        }
    }
}

#[derive(Debug)]
struct EngineShared {
    master_gain: AtomicFloat,
    prepared: AtomicBool,
    dropped_events: AtomicU64,
    /// Sample clock at the start of the current block
    frame: AtomicU64,
}

impl EngineShared {
    fn set_master_gain(&self, gain: f32) {
        if gain.is_finite() {
            self.master_gain
                .store(gain.clamp(0.0, MAX_MASTER_GAIN), Ordering::Relaxed);
        }
    }

    fn master_gain(&self) -> f32 {
        self.master_gain.load(Ordering::Relaxed)
    }

    fn is_prepared(&self) -> bool {
        self.prepared.load(Ordering::Acquire)
    }
}

/// Audio-thread half of the engine.
#[derive(Debug)]
pub struct SynthEngine {
    events: Consumer<PaintEvent, QUEUE_CAPACITY>,
    shared: Arc<EngineShared>,
    context: EngineContext,
    settings: EngineSettings,
    pool: Option<VoicePool>,
    gain: SmoothedGain,
    rng: Xorshift32,
    salt: u32,
    frames_rendered: u64,
}

impl SynthEngine {
    /// Create an unprepared engine and its UI handle.
    pub fn new(context: EngineContext) -> (Self, EngineHandle) {
        let (producer, consumer) = EventRing::new().split();
        let shared = Arc::new(EngineShared {
            master_gain: AtomicFloat::new(DEFAULT_MASTER_GAIN),
            prepared: AtomicBool::new(false),
            dropped_events: AtomicU64::new(0),
            frame: AtomicU64::new(0),
        });
        let salt = ENGINE_SALT.fetch_add(1, Ordering::Relaxed);

        let handle = EngineHandle {
            events: producer,
            shared: Arc::clone(&shared),
            trace: Arc::clone(&context.trace),
            mapping: GestureMapping::default(),
        };
        let engine = Self {
            events: consumer,
            shared,
            rng: context.determinism.rng(salt),
            context,
            settings: EngineSettings::default(),
            pool: None,
            gain: SmoothedGain::new(DEFAULT_MASTER_GAIN, 48000.0, GAIN_SMOOTHING_MS),
            salt,
            frames_rendered: 0,
        };
        (engine, handle)
    }

    /// Prepare for playback, keeping the current envelope and phase-scatter
    /// settings.
    ///
    /// Allocates the voice pool; must not be called from the audio thread.
    /// May be called again when the stream format changes.
    pub fn prepare(
        &mut self,
        sample_rate: f64,
        max_block_size: usize,
        max_partials: usize,
        voice_count: usize,
    ) {
        let settings = EngineSettings {
            sample_rate,
            max_block_size,
            max_partials,
            voice_count,
            ..self.settings
        };
        self.prepare_with(&settings);
    }

    /// Prepare with a full settings struct.
    ///
    /// Invalid values are corrected: a non-finite or non-positive sample rate
    /// falls back to 48 kHz, `max_partials` is clamped to
    /// `[1, MAX_PARTIALS]` and `voice_count` to at least 1.
    pub fn prepare_with(&mut self, settings: &EngineSettings) {
        self.shared.prepared.store(false, Ordering::Release);

        let sample_rate = if settings.sample_rate.is_finite() && settings.sample_rate > 0.0 {
            settings.sample_rate
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                sample_rate = settings.sample_rate,
                "invalid sample rate, using fallback"
            );
            FALLBACK_SAMPLE_RATE
        };
        self.settings = EngineSettings {
            sample_rate,
            max_partials: settings.max_partials.clamp(1, MAX_PARTIALS),
            voice_count: settings.voice_count.max(1),
            ..*settings
        };

        let sr = sample_rate as f32;
        self.pool = Some(VoicePool::new(
            self.settings.voice_count,
            sr,
            self.settings.max_partials,
            self.settings.envelope,
        ));
        self.gain.set_sample_rate(sr);
        self.gain.set_immediate(self.shared.master_gain());
        self.rng = self.context.determinism.rng(self.salt);
        self.frames_rendered = 0;
        self.shared.frame.store(0, Ordering::Relaxed);

        self.context.trace.log_event(
            TraceKind::Prepare,
            0,
            sr,
            self.settings.voice_count as f32,
            self.settings.max_partials as f32,
        );

        #[cfg(feature = "tracing")]
        tracing::debug!(
            sample_rate,
            max_block_size = self.settings.max_block_size,
            max_partials = self.settings.max_partials,
            voice_count = self.settings.voice_count,
            deterministic = self.context.determinism.is_enabled(),
            "engine prepared"
        );

        self.shared.prepared.store(true, Ordering::Release);
    }

    /// Drop the voice pool. `process` outputs silence until the next
    /// `prepare`.
    pub fn release_resources(&mut self) {
        self.shared.prepared.store(false, Ordering::Release);
        self.pool = None;

        #[cfg(feature = "tracing")]
        tracing::debug!(frames_rendered = self.frames_rendered, "engine released");
    }

    /// Render one block into `buffer` (one slice per channel).
    ///
    /// Clears the buffer, applies the events queued when the call started,
    /// renders every active voice and applies the smoothed master gain.
    /// Before `prepare` the output is silence and queued events are left in
    /// place. Never blocks or allocates; runtime is bounded by queued events,
    /// voices and block length.
    pub fn process(&mut self, buffer: &mut [&mut [f32]]) {
        for channel in buffer.iter_mut() {
            channel.fill(0.0);
        }

        let Some(pool) = self.pool.as_mut() else {
            return;
        };
        let trace = &*self.context.trace;
        let frame = self.frames_rendered;

        // Events pushed while this block runs wait for the next one.
        let pending = self.events.len();
        let mut drained = 0u32;
        for _ in 0..pending {
            let Some(event) = self.events.pop() else {
                break;
            };
            drained += 1;

            match event.phase {
                StrokePhase::Start | StrokePhase::Move => {
                    let index = pool.allocate_index();
                    let stolen = pool.voice(index).is_some_and(Voice::is_active);
                    if let Some(voice) = pool.voice_mut(index) {
                        if !stolen {
                            if self.settings.phase_scatter {
                                voice.scatter_phases(&mut self.rng);
                            } else {
                                voice.reset_phases();
                            }
                        }
                        voice.note_on(event.base_hz, event.amplitude, event.partials, event.pan);
                    }

                    trace.log_event(
                        TraceKind::PaintGesture,
                        frame,
                        event.base_hz,
                        event.amplitude,
                        event.pan,
                    );
                    if stolen {
                        trace.log_event(TraceKind::VoiceSteal, frame, index as f32, event.base_hz, 0.0);
                    }
                }
                StrokePhase::End => {
                    let released = pool.release_all();
                    trace.log_event(TraceKind::StrokeEnd, frame, released as f32, 0.0, 0.0);
                }
            }
        }

        pool.render(buffer);

        self.gain.set_target(self.shared.master_gain());
        let frames = buffer.iter().map(|ch| ch.len()).max().unwrap_or(0);
        let mut peak = 0.0f32;
        for i in 0..frames {
            let g = self.gain.advance();
            for channel in buffer.iter_mut() {
                if let Some(sample) = channel.get_mut(i) {
                    *sample = flush_denormal(*sample * g);
                    peak = peak.max(sample.abs());
                }
            }
        }

        let active = pool.active_voice_count();
        trace.log_event(
            TraceKind::AudioBlock,
            frame,
            drained as f32,
            active as f32,
            peak,
        );

        self.frames_rendered = frame + frames as u64;
        self.shared
            .frame
            .store(self.frames_rendered, Ordering::Relaxed);
    }

    /// Set the master gain. Non-finite values are ignored; others are
    /// clamped to `[0, MAX_MASTER_GAIN]`.
    pub fn set_master_gain(&self, gain: f32) {
        self.shared.set_master_gain(gain);
    }

    /// Master gain target (the value most recently set).
    pub fn master_gain(&self) -> f32 {
        self.shared.master_gain()
    }

    /// Whether `prepare` has completed.
    pub fn is_prepared(&self) -> bool {
        self.shared.is_prepared()
    }

    /// Approximate number of queued events.
    pub fn queue_len(&self) -> usize {
        self.events.len()
    }

    /// Number of sounding voices (0 before `prepare`).
    pub fn active_voice_count(&self) -> usize {
        self.pool.as_ref().map_or(0, VoicePool::active_voice_count)
    }

    /// Samples rendered since the last `prepare`.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Settings applied by the last `prepare`.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The voice pool, if prepared.
    pub fn voice_pool(&self) -> Option<&VoicePool> {
        self.pool.as_ref()
    }

    /// Shared services.
    pub fn context(&self) -> &EngineContext {
        &self.context
    }
}

/// UI-thread half of the engine.
///
/// Not `Clone`: the event ring has exactly one producer.
#[derive(Debug)]
pub struct EngineHandle {
    events: Producer<PaintEvent, QUEUE_CAPACITY>,
    shared: Arc<EngineShared>,
    trace: Arc<TraceLog>,
    mapping: GestureMapping,
}

impl EngineHandle {
    /// Post a `Move` gesture at normalized `(x, y)` with `pressure`.
    ///
    /// Returns `false` when the queue is full; the sample is dropped and
    /// counted in [`dropped_event_count`](Self::dropped_event_count).
    pub fn post_event(&mut self, x: f32, y: f32, pressure: f32) -> bool {
        self.post_stroke(GestureSample::new(x, y, pressure))
    }

    /// Post a gesture sample with an explicit stroke phase.
    pub fn post_stroke(&mut self, sample: GestureSample) -> bool {
        let event = self.mapping.to_event(sample);
        self.post_paint_event(event)
    }

    /// Post an already-mapped event, bypassing gesture mapping.
    pub fn post_paint_event(&mut self, event: PaintEvent) -> bool {
        if self.events.push(event) {
            return true;
        }
        self.shared.dropped_events.fetch_add(1, Ordering::Relaxed);
        self.trace.log_event(
            TraceKind::Backpressure,
            self.shared.frame.load(Ordering::Relaxed),
            self.events.len() as f32,
            0.0,
            0.0,
        );
        false
    }

    /// Set the master gain. Non-finite values are ignored; others are
    /// clamped to `[0, MAX_MASTER_GAIN]`.
    pub fn set_master_gain(&self, gain: f32) {
        self.shared.set_master_gain(gain);
    }

    /// Master gain target.
    pub fn master_gain(&self) -> f32 {
        self.shared.master_gain()
    }

    /// Whether the audio side has been prepared.
    pub fn is_prepared(&self) -> bool {
        self.shared.is_prepared()
    }

    /// Approximate number of queued events.
    pub fn queue_len(&self) -> usize {
        self.events.len()
    }

    /// Free slots in the event queue.
    pub fn free_space(&self) -> usize {
        self.events.free_space()
    }

    /// Gesture samples rejected because the queue was full.
    pub fn dropped_event_count(&self) -> u64 {
        self.shared.dropped_events.load(Ordering::Relaxed)
    }

    /// Replace the gesture mapping used by subsequent posts.
    pub fn set_mapping(&mut self, mapping: GestureMapping) {
        self.mapping = mapping;
    }

    /// Current gesture mapping.
    pub fn mapping(&self) -> &GestureMapping {
        &self.mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn stereo_block(engine: &mut SynthEngine, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let mut l = vec![0.0f32; frames];
        let mut r = vec![0.0f32; frames];
        engine.process(&mut [&mut l[..], &mut r[..]]);
        (l, r)
    }

    #[test]
    fn test_master_gain_bounds() {
        let (engine, handle) = SynthEngine::new(EngineContext::default());
        assert_eq!(engine.master_gain(), DEFAULT_MASTER_GAIN);

        handle.set_master_gain(5.0);
        assert_eq!(engine.master_gain(), MAX_MASTER_GAIN);
        engine.set_master_gain(-1.0);
        assert_eq!(handle.master_gain(), 0.0);
        handle.set_master_gain(f32::NAN);
        assert_eq!(handle.master_gain(), 0.0);
        handle.set_master_gain(0.25);
        assert_eq!(engine.master_gain(), 0.25);
    }

    #[test]
    fn test_unprepared_process_is_silent_and_keeps_queue() {
        let (mut engine, mut handle) = SynthEngine::new(EngineContext::default());
        assert!(!handle.is_prepared());
        assert!(handle.post_event(0.5, 0.5, 0.5));

        let mut l = vec![1.0f32; 64];
        let mut r = vec![1.0f32; 64];
        engine.process(&mut [&mut l[..], &mut r[..]]);
        assert!(l.iter().chain(&r).all(|&s| s == 0.0));
        assert_eq!(engine.queue_len(), 1);
        assert_eq!(engine.frames_rendered(), 0);
    }

    #[test]
    fn test_prepare_sanitizes_settings() {
        let (mut engine, handle) = SynthEngine::new(EngineContext::default());
        engine.prepare(f64::NAN, 256, 500, 0);
        assert!(handle.is_prepared());
        assert_eq!(engine.settings().sample_rate, 48000.0);
        assert_eq!(engine.settings().max_partials, MAX_PARTIALS);
        assert_eq!(engine.settings().voice_count, 1);
        assert_eq!(engine.voice_pool().map(VoicePool::len), Some(1));
    }

    #[test]
    fn test_event_triggers_voice_and_traces() {
        let context = EngineContext::default();
        let trace = Arc::clone(&context.trace);
        let (mut engine, mut handle) = SynthEngine::new(context);
        engine.prepare(48000.0, 256, 16, 4);

        assert!(handle.post_event(0.25, 0.5, 1.0));
        stereo_block(&mut engine, 256);

        assert_eq!(engine.active_voice_count(), 1);
        let voice = engine.voice_pool().and_then(|p| p.voice(0)).unwrap();
        assert_eq!(voice.partial_count(), 16);
        assert_eq!(voice.pan(), -0.5);

        let gesture = trace.last_of(TraceKind::PaintGesture).unwrap();
        assert_eq!(gesture.params[0], voice.base_hz());
        let block = trace.last_of(TraceKind::AudioBlock).unwrap();
        assert_eq!(block.params[0], 1.0);
        assert_eq!(block.params[1], 1.0);
        assert!(block.params[2] > 0.0);
    }

    #[test]
    fn test_steal_is_traced() {
        let context = EngineContext::default();
        let trace = Arc::clone(&context.trace);
        let (mut engine, mut handle) = SynthEngine::new(context);
        engine.prepare(48000.0, 128, 4, 2);

        for _ in 0..3 {
            assert!(handle.post_event(0.5, 0.3, 0.5));
        }
        stereo_block(&mut engine, 128);

        assert_eq!(engine.active_voice_count(), 2);
        let steal = trace.last_of(TraceKind::VoiceSteal).unwrap();
        assert_eq!(steal.params[0], 0.0);
    }

    #[test]
    fn test_release_resources() {
        let (mut engine, mut handle) = SynthEngine::new(EngineContext::default());
        engine.prepare(48000.0, 128, 8, 2);
        handle.post_event(0.5, 0.5, 0.5);
        stereo_block(&mut engine, 128);

        engine.release_resources();
        assert!(!handle.is_prepared());
        assert_eq!(engine.active_voice_count(), 0);
        let (l, r) = stereo_block(&mut engine, 128);
        assert!(l.iter().chain(&r).all(|&s| s == 0.0));
    }

    #[test]
    fn test_zero_gain_silences() {
        let (mut engine, mut handle) = SynthEngine::new(EngineContext::default());
        handle.set_master_gain(0.0);
        engine.prepare(48000.0, 512, 8, 2);
        handle.post_event(0.5, 0.5, 1.0);
        let (l, r) = stereo_block(&mut engine, 512);
        assert!(l.iter().chain(&r).all(|&s| s == 0.0));
        assert_eq!(engine.active_voice_count(), 1);
    }
}
