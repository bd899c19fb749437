//! Radix-2 FFT kernel
//!
//! Iterative in-place decimation-in-time Cooley–Tukey on split real and
//! imaginary slices. The bit-reversal permutation table and twiddle factors
//! are precomputed at construction; processing allocates nothing, takes no
//! locks, and is reentrant (`&self` with caller-owned buffers), which is
//! what the real-time path requires.
//!
//! The inverse transform is defined as: conjugate, forward transform,
//! conjugate, scale by 1/N.

use nf_core::{NfError, NfResult};

/// Precomputed kernel for one power-of-two transform size
#[derive(Debug, Clone)]
pub struct FftKernel {
    n: usize,
    /// Bit-reversed index for each position
    rev: Vec<u32>,
    /// Twiddle factors for the largest butterfly stage: e^{-2πik/N} for
    /// k in [0, N/2). Smaller stages stride through this table.
    twiddle_re: Vec<f64>,
    twiddle_im: Vec<f64>,
}

impl FftKernel {
    /// Create a kernel for size `n`. `n` must be a power of two ≥ 2.
    pub fn new(n: usize) -> NfResult<Self> {
        if n < 2 || !n.is_power_of_two() {
            return Err(NfError::BadParameter(format!(
                "FFT size must be a power of two >= 2, got {n}"
            )));
        }

        let bits = n.trailing_zeros();
        let rev = (0..n as u32)
            .map(|i| i.reverse_bits() >> (32 - bits))
            .collect();

        let half = n / 2;
        let mut twiddle_re = Vec::with_capacity(half);
        let mut twiddle_im = Vec::with_capacity(half);
        for k in 0..half {
            let angle = -2.0 * std::f64::consts::PI * k as f64 / n as f64;
            twiddle_re.push(angle.cos());
            twiddle_im.push(angle.sin());
        }

        Ok(Self {
            n,
            rev,
            twiddle_re,
            twiddle_im,
        })
    }

    /// Transform size
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Forward transform, in place. Both slices must be exactly `len()`.
    pub fn forward(&self, re: &mut [f64], im: &mut [f64]) {
        debug_assert_eq!(re.len(), self.n);
        debug_assert_eq!(im.len(), self.n);

        // Bit-reversal permutation
        for i in 0..self.n {
            let j = self.rev[i] as usize;
            if i < j {
                re.swap(i, j);
                im.swap(i, j);
            }
        }

        // Butterfly stages
        let mut len = 2;
        while len <= self.n {
            let half = len / 2;
            let stride = self.n / len;
            for start in (0..self.n).step_by(len) {
                let mut k = 0;
                for i in start..start + half {
                    let wr = self.twiddle_re[k];
                    let wi = self.twiddle_im[k];
                    let j = i + half;

                    let tr = re[j] * wr - im[j] * wi;
                    let ti = re[j] * wi + im[j] * wr;

                    re[j] = re[i] - tr;
                    im[j] = im[i] - ti;
                    re[i] += tr;
                    im[i] += ti;

                    k += stride;
                }
            }
            len <<= 1;
        }
    }

    /// Inverse transform, in place, including the 1/N scale.
    pub fn inverse(&self, re: &mut [f64], im: &mut [f64]) {
        for v in im.iter_mut() {
            *v = -*v;
        }
        self.forward(re, im);
        let scale = 1.0 / self.n as f64;
        for (r, i) in re.iter_mut().zip(im.iter_mut()) {
            *r *= scale;
            *i = -*i * scale;
        }
    }
}
