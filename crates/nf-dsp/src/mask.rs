//! Spectral mask library
//!
//! A mask is one real non-negative gain per FFT bin, pointwise multiplied
//! onto a complex spectrum. Masks are generated from a `FilterConfig` for a
//! given transform size and sample rate, and are recomputed whenever any
//! configuration field changes.
//!
//! Bin frequency uses the folded magnitude layout: bin i maps to
//! `min(i, N - i) * sr / N`, so bins i and N - i always receive the same
//! gain and every mask is conjugate-symmetric by construction. Skew terms
//! read the signed offset from the center frequency on that folded axis.

use std::sync::Arc;

use arc_swap::ArcSwap;

use nf_core::FilterConfig;

/// Guard against division by zero in width normalization
const WIDTH_EPSILON: f64 = 1e-10;

/// Per-bin gain mask of length equal to the FFT size
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralMask {
    gains: Vec<f64>,
}

impl SpectralMask {
    /// All-pass mask (gain 1 everywhere)
    pub fn unity(n: usize) -> Self {
        Self {
            gains: vec![1.0; n],
        }
    }

    /// Compute the mask for one filter configuration
    pub fn compute(config: &FilterConfig, n: usize, sample_rate: f64) -> Self {
        let gain = nf_core::db_to_linear(config.gain_db());
        let gains = (0..n)
            .map(|i| {
                let freq = bin_frequency(i, n, sample_rate);
                shape_magnitude(config, freq) * gain
            })
            .collect();
        Self { gains }
    }

    /// Pointwise product with another mask of the same length
    pub fn multiply(&mut self, other: &SpectralMask) {
        debug_assert_eq!(self.gains.len(), other.gains.len());
        for (a, b) in self.gains.iter_mut().zip(&other.gains) {
            *a *= b;
        }
    }

    /// Composite mask: pointwise product over `masks`, unity when empty
    pub fn composite<'a>(masks: impl Iterator<Item = &'a SpectralMask>, n: usize) -> Self {
        let mut result = Self::unity(n);
        for mask in masks {
            result.multiply(mask);
        }
        result
    }

    /// Apply to a split-complex spectrum in place
    #[inline]
    pub fn apply(&self, re: &mut [f64], im: &mut [f64]) {
        debug_assert_eq!(re.len(), self.gains.len());
        for ((r, i), &g) in re.iter_mut().zip(im.iter_mut()).zip(&self.gains) {
            *r *= g;
            *i *= g;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.gains.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.gains.is_empty()
    }

    #[inline]
    pub fn gains(&self) -> &[f64] {
        &self.gains
    }
}

/// Atomically published mask handle
///
/// The control thread recomputes composite masks and publishes them with a
/// pointer swap; the audio thread loads the current pointer once per STFT
/// iteration. The retired mask is freed on the control thread when the last
/// reader guard drops.
#[derive(Debug, Clone)]
pub struct SharedMask {
    inner: Arc<ArcSwap<SpectralMask>>,
}

impl SharedMask {
    pub fn new(initial: SpectralMask) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// Control thread: publish a recomputed mask
    pub fn publish(&self, mask: SpectralMask) {
        self.inner.store(Arc::new(mask));
    }

    /// Audio thread: borrow the current mask, wait-free
    #[inline]
    pub fn load(&self) -> arc_swap::Guard<Arc<SpectralMask>> {
        self.inner.load()
    }
}

/// Folded bin frequency: bins above N/2 mirror onto the negative-frequency
/// half, whose magnitude equals the positive mirror's.
#[inline]
pub fn bin_frequency(i: usize, n: usize, sample_rate: f64) -> f64 {
    let folded = i.min(n - i);
    folded as f64 * sample_rate / n as f64
}

/// Magnitude response of a shaper at one frequency, before dB gain
fn shape_magnitude(config: &FilterConfig, freq: f64) -> f64 {
    match *config {
        FilterConfig::Plateau {
            center_freq,
            width,
            flat_width,
            ..
        } => plateau(freq, center_freq, width, flat_width),
        FilterConfig::Gaussian {
            center_freq,
            width,
            skew,
            kurtosis,
            ..
        } => gaussian(freq, center_freq, width, skew, kurtosis),
        FilterConfig::Parabolic {
            center_freq,
            width,
            skew,
            flatness,
            ..
        } => parabolic(freq, center_freq, width, skew, flatness),
    }
}

/// Flat top of `flat_width` Hz, raised-cosine rolloff out to `width` Hz.
/// With `width <= flat_width` the rolloff region vanishes and the response
/// is a pure plateau over `width`.
fn plateau(freq: f64, center: f64, width: f64, flat_width: f64) -> f64 {
    let d = (freq - center).abs();

    if width <= flat_width {
        return if d <= width / 2.0 { 1.0 } else { 0.0 };
    }

    let half_flat = flat_width / 2.0;
    if d < half_flat {
        1.0
    } else if d <= width / 2.0 {
        let rolloff = (width - flat_width) / 2.0;
        0.5 * (1.0 + (std::f64::consts::PI * (d - half_flat) / rolloff).cos())
    } else {
        0.0
    }
}

/// Generalized Gaussian bump with erf-based skew
fn gaussian(freq: f64, center: f64, width: f64, skew: f64, kurtosis: f64) -> f64 {
    let z = (freq - center) / (width + WIDTH_EPSILON);
    let base = (-(z * z).powf(kurtosis) / 2.0).exp();
    if skew == 0.0 {
        return base;
    }
    base * (1.0 + erf(skew * z / std::f64::consts::SQRT_2)).max(0.0)
}

/// Inverted power-law parabola; skew steepens one side and softens the other
fn parabolic(freq: f64, center: f64, width: f64, skew: f64, flatness: f64) -> f64 {
    let offset = freq - center;
    let n = offset.abs() / width;
    if n > 1.0 {
        return 0.0;
    }

    let exponent = if skew == 0.0 {
        2.0 / flatness
    } else {
        let s = 1.0 + skew.abs() / 5.0;
        if skew.signum() == offset.signum() {
            2.0 * s / flatness
        } else {
            2.0 / (flatness * s)
        }
    };

    (1.0 - n.powf(exponent)).max(0.0)
}

/// Error function via the Abramowitz–Stegun 5-term rational approximation
/// (7.1.26), max absolute error ~1.5e-7.
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    sign * y
}
