//! White-noise sources
//!
//! Two generators, one per consumption mode:
//!
//! - [`Lcg31`]: the real-time source. Park–Miller multiplicative LCG with a
//!   31-bit state, reseeded on each playback start. Branch-free inner loop,
//!   no allocation, suitable for the audio thread.
//! - [`OfflineNoise`]: the offline source. PCG32 with deterministic
//!   per-track seed derivation and O(log n) stream positioning, so any
//!   sub-span of the render timeline regenerates identical samples
//!   regardless of how the timeline is chunked or which worker renders it.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;

use nf_core::Sample;

/// Park–Miller modulus: 2^31 - 1
const LCG_MODULUS: u64 = 0x7fff_ffff;
/// Park–Miller multiplier
const LCG_MULTIPLIER: u64 = 16807;

/// Real-time white-noise source, uniform on [-1, 1]
#[derive(Debug, Clone)]
pub struct Lcg31 {
    state: u64,
}

impl Lcg31 {
    /// Create with the given seed. Seeds are reduced into (0, 2^31 - 1);
    /// a degenerate zero maps to a fixed nonzero state.
    pub fn new(seed: u32) -> Self {
        let state = u64::from(seed) % LCG_MODULUS;
        Self {
            state: if state == 0 { 1 } else { state },
        }
    }

    /// Replace the state, as on playback start
    pub fn reseed(&mut self, seed: u32) {
        *self = Self::new(seed);
    }

    /// Next sample, uniform on [-1, 1]
    #[inline]
    pub fn next_sample(&mut self) -> Sample {
        self.state = (self.state * LCG_MULTIPLIER) % LCG_MODULUS;
        (2.0 * self.state as f64 / LCG_MODULUS as f64 - 1.0) as Sample
    }

    /// Fill a buffer with noise
    pub fn fill(&mut self, buffer: &mut [Sample]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }
}

/// Derive an independent stream seed for a track from a render base seed.
/// SplitMix64 finalization: distinct inputs give well-separated states.
pub fn derive_track_seed(base_seed: u64, track_id: u64) -> u64 {
    let mut z = base_seed ^ track_id.wrapping_mul(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Offline white-noise source: position-addressable uniform noise on [-1, 1]
#[derive(Debug, Clone)]
pub struct OfflineNoise {
    rng: Pcg32,
}

impl OfflineNoise {
    /// Stream for one track, positioned at timeline sample `start`.
    /// Exactly one raw draw is consumed per sample, so positioning at
    /// `start` and generating `k` samples equals positioning at 0 and
    /// skipping `start` samples.
    pub fn for_track(base_seed: u64, track_id: u64, start: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(derive_track_seed(base_seed, track_id));
        rng.advance(start);
        Self { rng }
    }

    /// Next sample, uniform on [-1, 1]
    #[inline]
    pub fn next_sample(&mut self) -> Sample {
        (2.0 * f64::from(self.rng.next_u32()) / f64::from(u32::MAX) - 1.0) as Sample
    }

    /// Fill a buffer with noise
    pub fn fill(&mut self, buffer: &mut [Sample]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }
}
