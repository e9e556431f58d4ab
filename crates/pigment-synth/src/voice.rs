//! Additive paint voices and the fixed-size pool that owns them.
//!
//! A [`Voice`] is a bank of harmonic sine partials under one ADSR envelope:
//!
//! ```text
//! out = env * amp * sum(sin_h / (h + 1))   for h in 0..partials
//! ```
//!
//! with partial `h` at `base_hz * (h + 1)`. Partials that would sit at or
//! above Nyquist are muted rather than aliased.
//!
//! [`VoicePool`] allocates every voice up front and never grows. Allocation
//! picks the first inactive voice; when all are busy it returns voice 0,
//! which is re-triggered (stolen).

use alloc::vec::Vec;

use pigment_core::{Xorshift32, flush_denormal};

use crate::envelope::{AdsrEnvelope, EnvelopeSettings, EnvelopeState};
use crate::oscillator::SineOscillator;

/// Upper bound on partials per voice.
pub const MAX_PARTIALS: usize = 64;

/// Output magnitude under which a finished voice is considered silent.
const SILENCE_THRESHOLD: f32 = 1e-5;

/// One additive-synthesis voice.
///
/// # Example
///
/// ```rust
/// use pigment_synth::Voice;
///
/// let mut voice = Voice::new(48000.0);
/// voice.note_on(440.0, 0.8, 8, 0.0);
///
/// let mut left = vec![0.0f32; 256];
/// let mut right = vec![0.0f32; 256];
/// voice.process(&mut [&mut left[..], &mut right[..]], 0, 256);
///
/// assert!(left.iter().any(|&s| s != 0.0));
/// assert_eq!(left, right);
/// ```
#[derive(Debug, Clone)]
pub struct Voice {
    partials: [SineOscillator; MAX_PARTIALS],
    /// `1 / (h + 1)`, or zero for muted partials
    partial_gains: [f32; MAX_PARTIALS],
    /// Partials rendered by the current note
    partial_count: usize,
    /// Limit applied at note-on
    max_partials: usize,
    envelope: AdsrEnvelope,
    sample_rate: f32,
    base_hz: f32,
    base_amp: f32,
    pan: f32,
    active: bool,
}

impl Default for Voice {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Voice {
    /// Create an inactive voice allowing [`MAX_PARTIALS`] partials.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            partials: core::array::from_fn(|_| SineOscillator::new(sample_rate)),
            partial_gains: [0.0; MAX_PARTIALS],
            partial_count: 0,
            max_partials: MAX_PARTIALS,
            envelope: AdsrEnvelope::new(sample_rate),
            sample_rate,
            base_hz: 0.0,
            base_amp: 0.0,
            pan: 0.0,
            active: false,
        }
    }

    /// Configure for a new stream format. Silences the voice.
    ///
    /// `max_partials` is clamped to `[1, MAX_PARTIALS]`.
    pub fn prepare(&mut self, sample_rate: f32, max_partials: usize, envelope: EnvelopeSettings) {
        self.sample_rate = sample_rate;
        self.max_partials = max_partials.clamp(1, MAX_PARTIALS);
        for osc in &mut self.partials {
            osc.set_sample_rate(sample_rate);
        }
        self.envelope.set_sample_rate(sample_rate);
        self.envelope.set_settings(envelope);
        self.kill();
    }

    /// Start (or re-trigger) a note.
    ///
    /// Out-of-range values are clamped: `partials` to `[1, max_partials]`,
    /// `amplitude` to `[0, 1]`, `pan` to `[-1, 1]`. Non-finite amplitude or
    /// pan become 0. A non-finite or non-positive `base_hz` yields a silent
    /// note. Re-triggering an active voice replaces its parameters; it does
    /// not stack a second note.
    pub fn note_on(&mut self, base_hz: f32, amplitude: f32, partials: u16, pan: f32) {
        self.base_hz = if base_hz.is_finite() && base_hz > 0.0 {
            base_hz
        } else {
            0.0
        };
        self.base_amp = finite_clamp(amplitude, 0.0, 1.0);
        self.pan = finite_clamp(pan, -1.0, 1.0);
        self.partial_count = usize::from(partials).clamp(1, self.max_partials);

        let nyquist = self.sample_rate * 0.5;
        for (h, (osc, gain)) in self
            .partials
            .iter_mut()
            .zip(self.partial_gains.iter_mut())
            .enumerate()
            .take(self.partial_count)
        {
            let freq = self.base_hz * (h + 1) as f32;
            if freq > 0.0 && freq < nyquist {
                osc.set_frequency(freq);
                *gain = 1.0 / (h + 1) as f32;
            } else {
                osc.set_frequency(0.0);
                *gain = 0.0;
            }
        }

        self.envelope.gate_on();
        self.active = true;
    }

    /// Enter release. The voice keeps sounding until the tail has decayed.
    pub fn note_off(&mut self) {
        self.envelope.gate_off();
    }

    /// Stop immediately without a release tail.
    pub fn kill(&mut self) {
        self.active = false;
        self.envelope.reset();
    }

    /// Randomize partial start phases.
    pub fn scatter_phases(&mut self, rng: &mut Xorshift32) {
        for osc in &mut self.partials {
            osc.set_phase(rng.next_f32());
        }
    }

    /// Put every partial back at phase zero.
    pub fn reset_phases(&mut self) {
        for osc in &mut self.partials {
            osc.reset();
        }
    }

    /// Accumulate `num_samples` samples starting at `start_sample`.
    ///
    /// Adds into the buffer, never overwrites. Two or more channels get the
    /// pan split on channels 0 and 1; a mono buffer gets the unsplit signal.
    /// The range is clipped to the shortest channel. When the envelope has
    /// finished and the output is below the silence threshold the voice
    /// deactivates and returns early.
    pub fn process(&mut self, buffer: &mut [&mut [f32]], start_sample: usize, num_samples: usize) {
        if !self.active || buffer.is_empty() {
            return;
        }

        let stereo = buffer.len() >= 2;
        let len = buffer.iter().take(2).map(|ch| ch.len()).min().unwrap_or(0);
        let end = start_sample.saturating_add(num_samples).min(len);
        if start_sample >= end {
            return;
        }

        let pan_l = 0.5 * (1.0 - self.pan);
        let pan_r = 0.5 * (1.0 + self.pan);

        for i in start_sample..end {
            let mut sum = 0.0f32;
            for (osc, &gain) in self
                .partials
                .iter_mut()
                .zip(self.partial_gains.iter())
                .take(self.partial_count)
            {
                sum += osc.advance() * gain;
            }

            let level = self.envelope.advance();
            let out = flush_denormal(sum * level * self.base_amp);

            if !self.envelope.is_active() && out.abs() < SILENCE_THRESHOLD {
                self.active = false;
                return;
            }

            if stereo {
                buffer[0][i] += flush_denormal(out * pan_l);
                buffer[1][i] += flush_denormal(out * pan_r);
            } else {
                buffer[0][i] += out;
            }
        }
    }

    /// Whether the voice is sounding (including its release tail).
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Fundamental of the current note.
    pub fn base_hz(&self) -> f32 {
        self.base_hz
    }

    /// Peak amplitude of the current note.
    pub fn amplitude(&self) -> f32 {
        self.base_amp
    }

    /// Pan of the current note.
    pub fn pan(&self) -> f32 {
        self.pan
    }

    /// Partials rendered by the current note.
    pub fn partial_count(&self) -> usize {
        self.partial_count
    }

    /// Partial limit set by [`prepare`](Self::prepare).
    pub fn max_partials(&self) -> usize {
        self.max_partials
    }

    /// Frequency of partial `h` (0 = fundamental); 0 Hz when muted.
    pub fn partial_frequency(&self, h: usize) -> f32 {
        self.partials.get(h).map_or(0.0, SineOscillator::frequency)
    }

    /// Envelope stage.
    pub fn envelope_state(&self) -> EnvelopeState {
        self.envelope.state()
    }
}

#[inline]
fn finite_clamp(v: f32, lo: f32, hi: f32) -> f32 {
    if v.is_finite() { v.clamp(lo, hi) } else { 0.0 }
}

/// Fixed set of voices, allocated once.
///
/// # Example
///
/// ```rust
/// use pigment_synth::{EnvelopeSettings, VoicePool};
///
/// let mut pool = VoicePool::new(2, 48000.0, 16, EnvelopeSettings::default());
/// pool.allocate().note_on(220.0, 0.5, 4, 0.0);
/// pool.allocate().note_on(330.0, 0.5, 4, 0.0);
///
/// // Both voices busy: voice 0 is stolen.
/// assert_eq!(pool.allocate_index(), 0);
/// assert_eq!(pool.active_voice_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct VoicePool {
    voices: Vec<Voice>,
}

impl VoicePool {
    /// Allocate `voice_count` voices (at least one).
    pub fn new(
        voice_count: usize,
        sample_rate: f32,
        max_partials: usize,
        envelope: EnvelopeSettings,
    ) -> Self {
        let count = voice_count.max(1);
        let mut voices = Vec::with_capacity(count);
        for _ in 0..count {
            let mut voice = Voice::new(sample_rate);
            voice.prepare(sample_rate, max_partials, envelope);
            voices.push(voice);
        }
        Self { voices }
    }

    /// Index [`allocate`](Self::allocate) would return: the first inactive
    /// voice, or 0 if every voice is busy.
    pub fn allocate_index(&self) -> usize {
        self.voices.iter().position(|v| !v.is_active()).unwrap_or(0)
    }

    /// Voice to use for the next note.
    pub fn allocate(&mut self) -> &mut Voice {
        let idx = self.allocate_index();
        &mut self.voices[idx]
    }

    /// Render every active voice into `buffer` (additively).
    pub fn render(&mut self, buffer: &mut [&mut [f32]]) {
        let len = buffer.iter().map(|ch| ch.len()).min().unwrap_or(0);
        for voice in &mut self.voices {
            if voice.is_active() {
                voice.process(buffer, 0, len);
            }
        }
    }

    /// Release every active voice; returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        for voice in self.voices.iter_mut().filter(|v| v.is_active()) {
            voice.note_off();
            released += 1;
        }
        released
    }

    /// Silence every voice immediately.
    pub fn kill_all(&mut self) {
        for voice in &mut self.voices {
            voice.kill();
        }
    }

    /// Number of sounding voices.
    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Voice at `index`.
    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    /// Mutable voice at `index`.
    pub fn voice_mut(&mut self, index: usize) -> Option<&mut Voice> {
        self.voices.get_mut(index)
    }

    /// Number of voices.
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    /// Always false; a pool holds at least one voice.
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    const SR: f32 = 48000.0;

    fn render(voice: &mut Voice, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let mut l = vec![0.0f32; frames];
        let mut r = vec![0.0f32; frames];
        voice.process(&mut [&mut l[..], &mut r[..]], 0, frames);
        (l, r)
    }

    #[test]
    fn test_note_on_clamps() {
        let mut v = Voice::new(SR);
        v.prepare(SR, 16, EnvelopeSettings::default());

        v.note_on(220.0, 4.0, 500, -9.0);
        assert_eq!(v.amplitude(), 1.0);
        assert_eq!(v.pan(), -1.0);
        assert_eq!(v.partial_count(), 16);

        v.note_on(220.0, f32::NAN, 0, f32::INFINITY);
        assert_eq!(v.amplitude(), 0.0);
        assert_eq!(v.pan(), 0.0);
        assert_eq!(v.partial_count(), 1);
    }

    #[test]
    fn test_harmonic_frequencies() {
        let mut v = Voice::new(SR);
        v.note_on(100.0, 1.0, 8, 0.0);
        for h in 0..8 {
            assert_eq!(v.partial_frequency(h), 100.0 * (h + 1) as f32);
        }
    }

    #[test]
    fn test_partials_above_nyquist_are_muted() {
        let mut v = Voice::new(SR);
        v.note_on(10_000.0, 1.0, 8, 0.0);
        assert_eq!(v.partial_frequency(0), 10_000.0);
        assert_eq!(v.partial_frequency(1), 20_000.0);
        assert_eq!(v.partial_frequency(2), 0.0);

        let (l, _) = render(&mut v, 512);
        assert!(l.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_pan_split() {
        let mut v = Voice::new(SR);
        v.note_on(440.0, 1.0, 4, -1.0);
        let (l, r) = render(&mut v, 256);
        assert!(l.iter().any(|&s| s != 0.0));
        assert!(r.iter().all(|&s| s == 0.0));

        let mut v = Voice::new(SR);
        v.note_on(440.0, 1.0, 4, 0.5);
        let (l, r) = render(&mut v, 256);
        for (a, b) in l.iter().zip(&r) {
            assert!((a * 3.0 - b).abs() < 1e-5, "L=0.25, R=0.75 of the same signal");
        }
    }

    #[test]
    fn test_mono_buffer_gets_unsplit_signal() {
        let mut stereo = Voice::new(SR);
        stereo.note_on(330.0, 0.5, 6, 0.0);
        let (l, _) = render(&mut stereo, 128);

        let mut mono = Voice::new(SR);
        mono.note_on(330.0, 0.5, 6, 0.0);
        let mut m = vec![0.0f32; 128];
        mono.process(&mut [&mut m[..]], 0, 128);

        for (a, b) in l.iter().zip(&m) {
            assert!((a * 2.0 - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_process_accumulates() {
        let mut v = Voice::new(SR);
        v.note_on(440.0, 1.0, 2, 0.0);
        let mut l = vec![1.0f32; 64];
        let mut r = vec![1.0f32; 64];
        v.process(&mut [&mut l[..], &mut r[..]], 0, 64);
        assert_eq!(l[0], 1.0, "sin(0) adds nothing to the first sample");
        assert!(l[10] != 1.0);
    }

    #[test]
    fn test_range_is_clipped() {
        let mut v = Voice::new(SR);
        v.note_on(440.0, 1.0, 2, 0.0);
        let mut l = vec![0.0f32; 32];
        let mut r = vec![0.0f32; 32];
        v.process(&mut [&mut l[..], &mut r[..]], 16, 1000);
        assert!(l[..16].iter().all(|&s| s == 0.0));
        v.process(&mut [&mut l[..], &mut r[..]], 64, 10);
    }

    #[test]
    fn test_inactive_is_noop() {
        let mut v = Voice::new(SR);
        let (l, r) = render(&mut v, 64);
        assert!(l.iter().chain(&r).all(|&s| s == 0.0));
    }

    #[test]
    fn test_release_deactivates_with_exact_zero() {
        let mut v = Voice::new(SR);
        v.note_on(440.0, 1.0, 8, 0.0);
        render(&mut v, 4800);
        v.note_off();
        assert!(v.is_active(), "release tail keeps the voice alive");

        let (l, _) = render(&mut v, 48_000);
        assert!(!v.is_active());
        assert_eq!(v.envelope_state(), EnvelopeState::Idle);
        assert_eq!(*l.last().unwrap(), 0.0);
        assert!(l.iter().all(|&s| s == 0.0 || s.abs() >= 1e-20));
    }

    fn rms(samples: &[f32]) -> f32 {
        let sum: f32 = samples.iter().map(|s| s * s).sum();
        libm::sqrtf(sum / samples.len() as f32)
    }

    #[test]
    fn test_note_off_right_after_note_on_decays() {
        let mut v = Voice::new(SR);
        v.note_on(440.0, 1.0, 8, 0.0);
        v.note_off();

        let (l, r) = render(&mut v, 4800);
        assert!(rms(&l[4320..]) < 1e-4);
        assert!(rms(&r[4320..]) < 1e-4);
        assert!(!v.is_active());
    }

    #[test]
    fn test_short_note_tail_decays() {
        let mut v = Voice::new(SR);
        v.note_on(440.0, 1.0, 8, 0.0);
        render(&mut v, 256);
        v.note_off();

        let (l, _) = render(&mut v, 48_000);
        let head = rms(&l[..480]);
        let tail = rms(&l[43_200..]);
        assert!(head > 1e-2, "release starts audible: {head}");
        assert!(tail < 1e-4, "tail must decay: {tail}");
        assert!(!v.is_active());
    }

    #[test]
    fn test_invalid_frequency_is_silent() {
        let mut v = Voice::new(SR);
        v.note_on(f32::NAN, 1.0, 8, 0.0);
        let (l, r) = render(&mut v, 256);
        assert!(l.iter().chain(&r).all(|&s| s == 0.0));
        assert!(v.is_active());
    }

    #[test]
    fn test_scatter_is_reproducible() {
        let mut a = Voice::new(SR);
        let mut b = Voice::new(SR);
        a.scatter_phases(&mut Xorshift32::new(5));
        b.scatter_phases(&mut Xorshift32::new(5));
        a.note_on(300.0, 1.0, 8, 0.0);
        b.note_on(300.0, 1.0, 8, 0.0);
        assert_eq!(render(&mut a, 256), render(&mut b, 256));
    }

    #[test]
    fn test_pool_allocation_policy() {
        let mut pool = VoicePool::new(3, SR, 8, EnvelopeSettings::default());
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.allocate_index(), 0);

        pool.allocate().note_on(100.0, 1.0, 1, 0.0);
        assert_eq!(pool.allocate_index(), 1);
        pool.allocate().note_on(200.0, 1.0, 1, 0.0);
        pool.allocate().note_on(300.0, 1.0, 1, 0.0);
        assert_eq!(pool.active_voice_count(), 3);

        assert_eq!(pool.allocate_index(), 0);
        pool.allocate().note_on(400.0, 1.0, 1, 0.0);
        assert_eq!(pool.voice(0).unwrap().base_hz(), 400.0);
        assert_eq!(pool.active_voice_count(), 3);

        pool.voice_mut(1).unwrap().kill();
        assert_eq!(pool.allocate_index(), 1);
    }

    #[test]
    fn test_pool_never_empty() {
        let pool = VoicePool::new(0, SR, 8, EnvelopeSettings::default());
        assert_eq!(pool.len(), 1);
        assert!(!pool.is_empty());
        assert_eq!(pool.voice(0).unwrap().max_partials(), 8);
    }

    #[test]
    fn test_pool_release_and_kill() {
        let mut pool = VoicePool::new(4, SR, 8, EnvelopeSettings::default());
        pool.allocate().note_on(100.0, 1.0, 4, 0.0);
        pool.allocate().note_on(200.0, 1.0, 4, 0.0);
        assert_eq!(pool.release_all(), 2);

        let mut l = vec![0.0f32; 48_000];
        let mut r = vec![0.0f32; 48_000];
        pool.render(&mut [&mut l[..], &mut r[..]]);
        assert_eq!(pool.active_voice_count(), 0);

        pool.allocate().note_on(100.0, 1.0, 4, 0.0);
        pool.kill_all();
        assert_eq!(pool.active_voice_count(), 0);
    }
}
