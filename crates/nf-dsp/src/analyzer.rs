//! Real-time spectrum analyzer
//!
//! Computes windowed magnitude spectra of the mix in dB for display
//! consumers. Frames are Hann-windowed regardless of the configured
//! window-kind metadata (which only labels the display). Temporal smoothing
//! is an exponential filter per bin plus an optional N-frame moving
//! average. `display_data` maps pixel columns to frequency on a logarithmic
//! [20, 20000] Hz scale by default; values are NOT range-clipped, since
//! clipping to [min_db, max_db] is the consumer's job at read time.

use std::collections::VecDeque;

use nf_core::{NfError, NfResult, Sample};
use serde::{Deserialize, Serialize};

use crate::fft::FftKernel;
use crate::window::{hann, WindowKind};

/// Allowed analysis sizes
pub const ANALYZER_SIZES: [usize; 5] = [512, 1024, 2048, 4096, 8192];

/// Display floor; silence and unfilled frames read as this
pub const ANALYZER_FLOOR_DB: f64 = -120.0;

/// Frequency axis mapping for display columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyScale {
    /// Logarithmic from 20 Hz to 20 kHz
    #[default]
    Logarithmic,
    /// Linear from 0 Hz to Nyquist
    Linear,
}

/// Analyzer configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Analysis frame size; one of [`ANALYZER_SIZES`]
    pub fft_size: usize,
    /// Exponential smoothing time constant, [0, 0.95]; 0 disables
    pub smoothing: f64,
    /// Moving-average depth in frames, [1, 10]; 1 disables
    pub averaging: usize,
    pub scale: FrequencyScale,
    /// Metadata for the display pipeline; analysis always uses Hann
    pub window: WindowKind,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing: 0.8,
            averaging: 1,
            scale: FrequencyScale::default(),
            window: WindowKind::default(),
        }
    }
}

impl AnalyzerConfig {
    fn validated(mut self) -> NfResult<Self> {
        if !ANALYZER_SIZES.contains(&self.fft_size) {
            return Err(NfError::BadParameter(format!(
                "analyzer size {} not in {:?}",
                self.fft_size, ANALYZER_SIZES
            )));
        }
        self.smoothing = self.smoothing.clamp(0.0, 0.95);
        self.averaging = self.averaging.clamp(1, 10);
        Ok(self)
    }
}

/// Windowed magnitude-spectrum analyzer
pub struct SpectrumAnalyzer {
    config: AnalyzerConfig,
    sample_rate: f64,
    fft: FftKernel,
    window: Vec<f64>,

    /// Circular frame buffer of the most recent fft_size samples
    input: Vec<Sample>,
    write_pos: usize,

    re: Vec<f64>,
    im: Vec<f64>,
    /// Exponentially smoothed dB per bin (fft_size / 2 + 1 bins)
    smoothed: Vec<f64>,
    /// Recent frames for the moving average
    history: VecDeque<Vec<f64>>,
    /// Current display spectrum
    averaged: Vec<f64>,
}

impl SpectrumAnalyzer {
    pub fn new(config: AnalyzerConfig, sample_rate: f64) -> NfResult<Self> {
        let config = config.validated()?;
        let n = config.fft_size;
        let bins = n / 2 + 1;

        Ok(Self {
            config,
            sample_rate,
            fft: FftKernel::new(n)?,
            window: hann(n),
            input: vec![0.0; n],
            write_pos: 0,
            re: vec![0.0; n],
            im: vec![0.0; n],
            smoothed: vec![ANALYZER_FLOOR_DB; bins],
            history: VecDeque::with_capacity(10),
            averaged: vec![ANALYZER_FLOOR_DB; bins],
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Apply a new configuration. Changing the analysis size rebuilds the
    /// internal buffers and resets all averaging state.
    pub fn reconfigure(&mut self, config: AnalyzerConfig) -> NfResult<()> {
        let config = config.validated()?;
        if config.fft_size != self.config.fft_size {
            *self = Self::new(config, self.sample_rate)?;
        } else {
            self.config = config;
            self.history.clear();
        }
        Ok(())
    }

    /// Feed mix samples into the frame buffer
    pub fn push_samples(&mut self, samples: &[Sample]) {
        let n = self.config.fft_size;
        for &sample in samples {
            self.input[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % n;
        }
    }

    /// Analyze the current frame and update the display spectrum
    pub fn analyze(&mut self) {
        let n = self.config.fft_size;

        // Unroll the circular buffer so the oldest sample leads
        for i in 0..n {
            let src = (self.write_pos + i) % n;
            self.re[i] = f64::from(self.input[src]) * self.window[i];
            self.im[i] = 0.0;
        }
        self.fft.forward(&mut self.re, &mut self.im);

        let bins = n / 2 + 1;
        let scale = 2.0 / n as f64;
        let tau = self.config.smoothing;

        let mut frame = Vec::with_capacity(bins);
        for i in 0..bins {
            let magnitude = (self.re[i] * self.re[i] + self.im[i] * self.im[i]).sqrt() * scale;
            let db = (20.0 * magnitude.max(1e-10).log10()).max(ANALYZER_FLOOR_DB);
            let smoothed = if tau > 0.0 {
                self.smoothed[i] * tau + db * (1.0 - tau)
            } else {
                db
            };
            self.smoothed[i] = smoothed;
            frame.push(smoothed);
        }

        self.history.push_back(frame);
        while self.history.len() > self.config.averaging {
            self.history.pop_front();
        }

        for i in 0..bins {
            let sum: f64 = self.history.iter().map(|f| f[i]).sum();
            self.averaged[i] = sum / self.history.len() as f64;
        }
    }

    /// Current spectrum, one dB value per bin
    pub fn spectrum_db(&self) -> &[f64] {
        &self.averaged
    }

    /// One dB value per pixel column, mapped on the configured scale.
    /// Values are interpolated between bins and not range-clipped.
    pub fn display_data(&self, pixel_width: usize) -> Vec<f32> {
        let n = self.config.fft_size;
        let bins = self.averaged.len();
        let mut out = Vec::with_capacity(pixel_width);

        for x in 0..pixel_width {
            let t = if pixel_width > 1 {
                x as f64 / (pixel_width - 1) as f64
            } else {
                0.0
            };
            let freq = match self.config.scale {
                FrequencyScale::Logarithmic => 20.0 * (20000.0f64 / 20.0).powf(t),
                FrequencyScale::Linear => t * self.sample_rate / 2.0,
            };
            let bin_pos = (freq * n as f64 / self.sample_rate).min((bins - 1) as f64);
            let lo = bin_pos.floor() as usize;
            let hi = (lo + 1).min(bins - 1);
            let frac = bin_pos - lo as f64;
            let db = self.averaged[lo] * (1.0 - frac) + self.averaged[hi] * frac;
            out.push(db as f32);
        }

        out
    }

    pub fn reset(&mut self) {
        self.input.fill(0.0);
        self.write_pos = 0;
        self.smoothed.fill(ANALYZER_FLOOR_DB);
        self.history.clear();
        self.averaged.fill(ANALYZER_FLOOR_DB);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_sine(analyzer: &mut SpectrumAnalyzer, freq: f64, sample_rate: f64, len: usize) {
        let samples: Vec<Sample> = (0..len)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate).sin() as Sample)
            .collect();
        analyzer.push_samples(&samples);
    }

    #[test]
    fn test_rejects_bad_size() {
        let config = AnalyzerConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(SpectrumAnalyzer::new(config, 48000.0).is_err());
    }

    #[test]
    fn test_sine_peak_at_expected_bin() {
        let config = AnalyzerConfig {
            fft_size: 2048,
            smoothing: 0.0,
            ..Default::default()
        };
        let mut analyzer = SpectrumAnalyzer::new(config, 48000.0).unwrap();
        feed_sine(&mut analyzer, 1000.0, 48000.0, 2048);
        analyzer.analyze();

        let spectrum = analyzer.spectrum_db();
        let peak_bin = (1000.0 * 2048.0 / 48000.0_f64).round() as usize;
        assert!(spectrum[peak_bin] > -6.0);
        assert!(spectrum[peak_bin] > spectrum[peak_bin + 30] + 30.0);
    }

    #[test]
    fn test_silence_reads_floor() {
        let config = AnalyzerConfig {
            smoothing: 0.0,
            ..Default::default()
        };
        let mut analyzer = SpectrumAnalyzer::new(config, 48000.0).unwrap();
        analyzer.analyze();
        for &db in analyzer.spectrum_db() {
            assert_eq!(db, ANALYZER_FLOOR_DB);
        }
    }

    #[test]
    fn test_display_data_has_pixel_width() {
        let mut analyzer = SpectrumAnalyzer::new(AnalyzerConfig::default(), 44100.0).unwrap();
        feed_sine(&mut analyzer, 440.0, 44100.0, 2048);
        analyzer.analyze();

        for width in [1usize, 320, 1920] {
            assert_eq!(analyzer.display_data(width).len(), width);
        }
    }

    #[test]
    fn test_smoothing_lags_input() {
        let config = AnalyzerConfig {
            fft_size: 1024,
            smoothing: 0.9,
            ..Default::default()
        };
        let mut analyzer = SpectrumAnalyzer::new(config, 48000.0).unwrap();
        feed_sine(&mut analyzer, 1000.0, 48000.0, 1024);
        analyzer.analyze();
        let first = analyzer.spectrum_db().to_vec();
        analyzer.analyze();
        let second = analyzer.spectrum_db().to_vec();

        // With tau = 0.9 the spectrum keeps rising toward steady state
        let peak_bin = (1000.0 * 1024.0 / 48000.0_f64).round() as usize;
        assert!(second[peak_bin] > first[peak_bin]);
    }

    #[test]
    fn test_reconfigure_size_resets_state() {
        let mut analyzer = SpectrumAnalyzer::new(AnalyzerConfig::default(), 48000.0).unwrap();
        feed_sine(&mut analyzer, 1000.0, 48000.0, 2048);
        analyzer.analyze();

        let new_config = AnalyzerConfig {
            fft_size: 4096,
            ..Default::default()
        };
        analyzer.reconfigure(new_config).unwrap();
        assert_eq!(analyzer.config().fft_size, 4096);
        for &db in analyzer.spectrum_db() {
            assert_eq!(db, ANALYZER_FLOOR_DB);
        }
    }

    #[test]
    fn test_averaging_bounds_clamped() {
        let config = AnalyzerConfig {
            averaging: 99,
            smoothing: 2.0,
            ..Default::default()
        };
        let analyzer = SpectrumAnalyzer::new(config, 48000.0).unwrap();
        assert_eq!(analyzer.config().averaging, 10);
        assert_eq!(analyzer.config().smoothing, 0.95);
    }
}
