//! Deterministic rendering switch and pseudo-random source.
//!
//! A [`Determinism`] context carries an enable flag and a 32-bit seed. It is
//! constructed by whoever assembles the application and handed (as an `Arc`)
//! to the components that need reproducible randomness, so every test can
//! build an isolated instance instead of sharing process-wide state.
//!
//! [`Xorshift32`] is the generator those components seed from the context.
//! It is tiny, allocation-free and has no failure modes, so it can run on
//! the audio thread.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Seed used when none is configured, or when `0` is requested.
pub const DEFAULT_SEED: u32 = 0x4D59_5DF4;

/// Substitute state for the xorshift generator, which is stuck at zero.
const ZERO_STATE_REPLACEMENT: u32 = 0xA341_316C;

/// Shared deterministic-rendering context.
///
/// Both fields are plain atomics; readers never block writers. Changes are
/// picked up the next time a consumer seeds itself (the synth engine does so
/// in `prepare`).
///
/// # Example
///
/// ```rust
/// use pigment_core::{Determinism, Xorshift32};
///
/// let ctx = Determinism::new();
/// ctx.set_seed(1234);
/// ctx.set_enabled(true);
///
/// let mut a = Xorshift32::new(ctx.seed());
/// let mut b = Xorshift32::new(ctx.seed());
/// assert_eq!(a.next_u32(), b.next_u32());
/// ```
#[derive(Debug)]
pub struct Determinism {
    enabled: AtomicBool,
    seed: AtomicU32,
}

impl Default for Determinism {
    fn default() -> Self {
        Self::new()
    }
}

impl Determinism {
    /// Create a disabled context with [`DEFAULT_SEED`].
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            seed: AtomicU32::new(DEFAULT_SEED),
        }
    }

    /// Create an enabled context with the given seed.
    pub fn seeded(seed: u32) -> Self {
        let ctx = Self::new();
        ctx.set_seed(seed);
        ctx.set_enabled(true);
        ctx
    }

    /// Whether reproducible rendering is requested.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turn reproducible rendering on or off.
    pub fn set_enabled(&self, enabled: bool) {
        #[cfg(feature = "tracing")]
        tracing::debug!(enabled, seed = self.seed(), "deterministic rendering toggled");
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Current seed.
    #[inline]
    pub fn seed(&self) -> u32 {
        self.seed.load(Ordering::Acquire)
    }

    /// Set the seed. `0` restores [`DEFAULT_SEED`].
    pub fn set_seed(&self, seed: u32) {
        let seed = if seed == 0 { DEFAULT_SEED } else { seed };
        self.seed.store(seed, Ordering::Release);
    }

    /// Build a generator for a consumer.
    ///
    /// When enabled the generator starts from the configured seed, so two
    /// consumers seeded the same way produce identical streams. Otherwise the
    /// seed is mixed with `salt`, which callers vary per instance.
    pub fn rng(&self, salt: u32) -> Xorshift32 {
        if self.is_enabled() {
            Xorshift32::new(self.seed())
        } else {
            Xorshift32::new(self.seed() ^ salt.wrapping_mul(0x9E37_79B9))
        }
    }
}

/// Xorshift32 pseudo-random generator.
///
/// Period 2^32 - 1. The all-zero state is unreachable: a zero seed is
/// replaced by a fixed non-zero constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    /// Create a generator from a seed.
    pub const fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 {
                ZERO_STATE_REPLACEMENT
            } else {
                seed
            },
        }
    }

    /// Next 32 random bits.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform float in `[0.0, 1.0)` built from the top 24 bits.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * (1.0 / 16_777_216.0)
    }

    /// Uniform float in `[-1.0, 1.0)`.
    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        self.next_f32() * 2.0 - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ctx = Determinism::new();
        assert!(!ctx.is_enabled());
        assert_eq!(ctx.seed(), DEFAULT_SEED);
    }

    #[test]
    fn test_zero_seed_restores_default() {
        let ctx = Determinism::new();
        ctx.set_seed(42);
        assert_eq!(ctx.seed(), 42);
        ctx.set_seed(0);
        assert_eq!(ctx.seed(), DEFAULT_SEED);
    }

    #[test]
    fn test_enabled_rng_is_reproducible() {
        let ctx = Determinism::seeded(99);
        let mut a = ctx.rng(1);
        let mut b = ctx.rng(2);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn test_disabled_rng_varies_with_salt() {
        let ctx = Determinism::new();
        let mut a = ctx.rng(1);
        let mut b = ctx.rng(2);
        assert_ne!(a.next_u32(), b.next_u32());
    }

    #[test]
    fn test_zero_seed_never_sticks() {
        let mut rng = Xorshift32::new(0);
        for _ in 0..1000 {
            assert_ne!(rng.next_u32(), 0);
        }
    }

    #[test]
    fn test_float_ranges() {
        let mut rng = Xorshift32::new(DEFAULT_SEED);
        for _ in 0..10_000 {
            let u = rng.next_f32();
            assert!((0.0..1.0).contains(&u), "unipolar out of range: {u}");
            let b = rng.next_bipolar();
            assert!((-1.0..1.0).contains(&b), "bipolar out of range: {b}");
        }
    }

    #[test]
    fn test_known_sequence() {
        // x=1: 1^(1<<13)=8193; 8193^(8193>>17)=8193; 8193^(8193<<5)=270369
        let mut rng = Xorshift32::new(1);
        assert_eq!(rng.next_u32(), 270_369);
    }
}
