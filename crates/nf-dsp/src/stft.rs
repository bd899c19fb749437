//! STFT streaming processor
//!
//! Converts between the host's small fixed block size (64/128/256 samples)
//! and the internal analysis size N = 4096 with hop H = N/4 (75% overlap).
//! Hann-windowed analysis and synthesis with overlap-add reconstruction;
//! the chain's composite mask is applied to the spectrum of every frame.
//!
//! Latency is exactly N samples: the output ring is prefilled with N zeros
//! at construction, and the per-iteration protocol emits H samples for
//! every H consumed once the input ring holds a full analysis frame.
//!
//! Audio-thread contract: after construction this type never allocates,
//! locks, or performs I/O. Mask updates arrive through a pointer swap
//! ([`SharedMask`]) read once per iteration.

use nf_core::Sample;

use crate::fft::FftKernel;
use crate::mask::{SharedMask, SpectralMask};
use crate::ring::SampleRing;
use crate::window::{hann, ola_norm};

/// Analysis frame size
pub const STFT_SIZE: usize = 4096;
/// Hop size; the accumulator shift below is only correct for N/4
pub const STFT_HOP: usize = STFT_SIZE / 4;

/// Streaming overlap-add STFT filter
pub struct StftProcessor {
    fft: FftKernel,
    window: Vec<f64>,
    /// Overlap-add reconstruction gain (Σ w² / H)
    norm: f64,
    mask: SharedMask,

    input: SampleRing,
    output: SampleRing,

    /// Peek scratch for one analysis frame
    frame: Vec<Sample>,
    /// Split-complex FFT workspace
    re: Vec<f64>,
    im: Vec<f64>,
    /// Overlap accumulator; holds up to N/H = 4 in-flight windows
    accum: Vec<f64>,
    /// Emission scratch for the oldest H accumulator samples
    emit: Vec<Sample>,
}

impl StftProcessor {
    /// Create a processor reading its composite mask from `mask`.
    /// The mask must be computed for `STFT_SIZE` bins.
    pub fn new(mask: SharedMask) -> Self {
        let window = hann(STFT_SIZE);
        let norm = ola_norm(&window, STFT_HOP);

        let mut output = SampleRing::with_capacity(2 * STFT_SIZE);
        // Prefill one full frame of silence: total latency is N samples
        output.push(&[0.0; STFT_SIZE]);

        let fft = FftKernel::new(STFT_SIZE).expect("STFT_SIZE is a power of two");

        Self {
            fft,
            window,
            norm,
            mask,
            input: SampleRing::with_capacity(2 * STFT_SIZE),
            output,
            frame: vec![0.0; STFT_SIZE],
            re: vec![0.0; STFT_SIZE],
            im: vec![0.0; STFT_SIZE],
            accum: vec![0.0; STFT_SIZE],
            emit: vec![0.0; STFT_HOP],
        }
    }

    /// Latency in samples
    #[inline]
    pub fn latency(&self) -> usize {
        STFT_SIZE
    }

    /// Process one host block. `input` and `output` must be the same
    /// length, at most `STFT_HOP` samples.
    pub fn process_block(&mut self, input: &[Sample], output: &mut [Sample]) {
        debug_assert_eq!(input.len(), output.len());
        debug_assert!(input.len() <= STFT_HOP);

        self.input.push(input);

        while self.input.len() >= STFT_SIZE {
            self.run_iteration();
        }

        // Underruns (only possible before the prefill is established)
        // manifest as zero-filled output
        let read = self.output.pop(output);
        output[read..].fill(0.0);
    }

    /// One analysis/synthesis iteration: peek N, window, transform, mask,
    /// inverse, window again, overlap-add, emit H, advance by H.
    fn run_iteration(&mut self) {
        self.input.peek(&mut self.frame);

        for i in 0..STFT_SIZE {
            self.re[i] = f64::from(self.frame[i]) * self.window[i];
            self.im[i] = 0.0;
        }

        self.fft.forward(&mut self.re, &mut self.im);
        self.mask.load().apply(&mut self.re, &mut self.im);
        self.fft.inverse(&mut self.re, &mut self.im);

        // Synthesis window and OLA normalization; the real part carries
        // the signal
        for i in 0..STFT_SIZE {
            self.accum[i] += self.re[i] * self.window[i] / self.norm;
        }

        for i in 0..STFT_HOP {
            self.emit[i] = self.accum[i] as Sample;
        }
        self.output.push(&self.emit);

        // Slide the accumulator left by one hop, exposing a zeroed tail
        self.accum.copy_within(STFT_HOP.., 0);
        self.accum[STFT_SIZE - STFT_HOP..].fill(0.0);

        self.input.skip(STFT_HOP);
    }

    /// Drop all buffered signal and return to the initial (silent,
    /// N-sample-latency) state
    pub fn reset(&mut self) {
        self.input.clear();
        self.output.clear();
        self.accum.fill(0.0);
        self.output.push(&[0.0; STFT_SIZE]);
    }

    /// Handle used to publish composite masks to this processor
    pub fn mask(&self) -> &SharedMask {
        &self.mask
    }
}

/// Convenience constructor for a processor with a unity (all-pass) mask
impl Default for StftProcessor {
    fn default() -> Self {
        Self::new(SharedMask::new(SpectralMask::unity(STFT_SIZE)))
    }
}
