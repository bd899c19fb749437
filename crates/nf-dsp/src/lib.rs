//! nf-dsp: DSP kernels for NoiseForge
//!
//! ## Core modules
//! - `fft` - Iterative in-place radix-2 FFT/IFFT kernel
//! - `mask` - Plateau/Gaussian/parabolic spectral masks and composites
//! - `noise` - Real-time LCG and position-addressable offline noise
//! - `ring` - Sample FIFO for block-size adaptation
//! - `stft` - Hann-windowed overlap-add streaming filter (N=4096, 75%)
//! - `window` - Analysis windows and OLA normalization
//!
//! ## Support modules
//! - `analyzer` - Magnitude-spectrum analyzer for display consumers
//! - `biquad` - TDF-II second-order pass-through sections
//! - `smoothing` - Lock-free linear parameter ramps

pub mod analyzer;
pub mod biquad;
pub mod fft;
pub mod mask;
pub mod noise;
pub mod ring;
pub mod smoothing;
pub mod stft;
pub mod window;

pub use analyzer::{AnalyzerConfig, FrequencyScale, SpectrumAnalyzer, ANALYZER_FLOOR_DB};
pub use biquad::{Biquad, BiquadCoeffs, SectionType};
pub use fft::FftKernel;
pub use mask::{bin_frequency, SharedMask, SpectralMask};
pub use noise::{derive_track_seed, Lcg31, OfflineNoise};
pub use ring::SampleRing;
pub use smoothing::{SmoothedParam, GAIN_RAMP_MS};
pub use stft::{StftProcessor, STFT_HOP, STFT_SIZE};
pub use window::{hann, ola_norm, WindowKind};

use nf_core::Sample;

/// Trait for all DSP processors
pub trait Processor: Send {
    /// Reset processor state
    fn reset(&mut self);

    /// Latency in samples
    fn latency(&self) -> usize {
        0
    }
}

/// Mono processor trait
pub trait MonoProcessor: Processor {
    /// Process a single sample
    fn process_sample(&mut self, input: Sample) -> Sample;

    /// Process a block of samples in place
    fn process_block(&mut self, buffer: &mut [Sample]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}
