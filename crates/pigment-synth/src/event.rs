//! Paint gesture records passed from the UI thread to the audio thread.

/// Where a gesture sample sits within a brush stroke.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StrokePhase {
    /// First sample of a stroke (pen down).
    Start,
    /// Continuing sample while the pen moves.
    #[default]
    Move,
    /// Pen lifted. Voices triggered by the stroke are released.
    End,
}

/// One gesture sample, already mapped to synthesis parameters.
///
/// Plain value data: it is copied into the event ring and consumed exactly
/// once by the audio thread.
///
/// # Example
///
/// ```rust
/// use pigment_synth::{PaintEvent, StrokePhase};
///
/// let event = PaintEvent::new(440.0, 0.8, -0.25, 12);
/// assert_eq!(event.phase, StrokePhase::Move);
/// assert_eq!(event.sample_offset, 0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaintEvent {
    /// Fundamental frequency in Hz, after harmonic quantization.
    pub base_hz: f32,
    /// Peak amplitude, 0.0 to 1.0.
    pub amplitude: f32,
    /// Stereo position, -1.0 (left) to 1.0 (right).
    pub pan: f32,
    /// Number of harmonics to synthesize; bounded by the engine at note-on.
    pub partials: u16,
    /// Intra-block offset. Informational: the engine applies events at the
    /// start of the block in which they are drained.
    pub sample_offset: u32,
    /// Stroke phase of the originating gesture.
    pub phase: StrokePhase,
}

impl Default for PaintEvent {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 1)
    }
}

impl PaintEvent {
    /// Create a `Move` event with no sample offset.
    pub const fn new(base_hz: f32, amplitude: f32, pan: f32, partials: u16) -> Self {
        Self {
            base_hz,
            amplitude,
            pan,
            partials,
            sample_offset: 0,
            phase: StrokePhase::Move,
        }
    }

    /// A stroke-end marker carrying no sound parameters.
    pub const fn stroke_end() -> Self {
        Self {
            phase: StrokePhase::End,
            ..Self::new(0.0, 0.0, 0.0, 1)
        }
    }

    /// Same event with a different phase.
    pub const fn with_phase(self, phase: StrokePhase) -> Self {
        Self { phase, ..self }
    }

    /// Same event with a sample offset.
    pub const fn with_sample_offset(self, sample_offset: u32) -> Self {
        Self {
            sample_offset,
            ..self
        }
    }
}

/// Raw UI-side gesture input in normalized canvas coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GestureSample {
    /// Horizontal position, 0.0 (left) to 1.0 (right).
    pub x: f32,
    /// Vertical position, 0.0 (lowest pitch) to 1.0 (highest pitch).
    pub y: f32,
    /// Pen pressure, 0.0 to 1.0.
    pub pressure: f32,
    /// Stroke phase.
    pub phase: StrokePhase,
}

impl GestureSample {
    /// A `Move` sample.
    pub const fn new(x: f32, y: f32, pressure: f32) -> Self {
        Self {
            x,
            y,
            pressure,
            phase: StrokePhase::Move,
        }
    }

    /// Same sample with a different phase.
    pub const fn with_phase(self, phase: StrokePhase) -> Self {
        Self { phase, ..self }
    }

    /// Copy with every field made finite and clamped to `[0, 1]`.
    pub fn sanitized(self) -> Self {
        Self {
            x: unit(self.x),
            y: unit(self.y),
            pressure: unit(self.pressure),
            phase: self.phase,
        }
    }
}

#[inline]
fn unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}
