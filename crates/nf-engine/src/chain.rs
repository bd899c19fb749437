//! Filter chain
//!
//! An ordered list of spectral filter instances per track. The chain never
//! exposes individual instances in the signal path; it maintains one
//! composite mask (the pointwise product of all enabled instances) and
//! publishes it to the track's STFT processor through a pointer swap on
//! every mutation. Disabled instances are bypass and excluded from the
//! composite.
//!
//! Instance identifiers are positional: removing an instance shifts later
//! indices down.

use nf_core::{FilterConfig, FilterType, NfError, NfResult};
use nf_dsp::{SharedMask, SpectralMask, STFT_SIZE};

/// One filter instance: configuration, bypass flag, and its cached mask
#[derive(Debug, Clone)]
pub struct FilterInstance {
    config: FilterConfig,
    enabled: bool,
    mask: SpectralMask,
}

impl FilterInstance {
    pub fn config(&self) -> FilterConfig {
        self.config
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

/// Ordered serial chain of spectral filters with one published composite
#[derive(Debug)]
pub struct FilterChain {
    filters: Vec<FilterInstance>,
    fft_size: usize,
    sample_rate: f64,
    shared: SharedMask,
}

impl FilterChain {
    /// Create an empty chain publishing masks of `STFT_SIZE` bins
    pub fn new(sample_rate: f64) -> Self {
        Self::with_fft_size(sample_rate, STFT_SIZE)
    }

    pub fn with_fft_size(sample_rate: f64, fft_size: usize) -> Self {
        Self {
            filters: Vec::new(),
            fft_size,
            sample_rate,
            shared: SharedMask::new(SpectralMask::unity(fft_size)),
        }
    }

    /// Mask handle for the audio-side STFT processor
    pub fn shared_mask(&self) -> SharedMask {
        self.shared.clone()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Append a new instance with the variant's default (or the given)
    /// configuration; returns its index.
    pub fn add(&mut self, filter_type: FilterType, config: Option<FilterConfig>) -> usize {
        let config = config
            .unwrap_or_else(|| FilterConfig::default_for(filter_type))
            .clamped();
        let mask = SpectralMask::compute(&config, self.fft_size, self.sample_rate);
        self.filters.push(FilterInstance {
            config,
            enabled: true,
            mask,
        });
        self.rebuild();
        self.filters.len() - 1
    }

    /// Remove and destroy an instance; later indices shift down
    pub fn remove(&mut self, index: usize) -> NfResult<()> {
        if index >= self.filters.len() {
            return Err(NfError::BadIndex(index));
        }
        self.filters.remove(index);
        self.rebuild();
        Ok(())
    }

    /// Reorder an instance from one position to another
    pub fn move_filter(&mut self, from: usize, to: usize) -> NfResult<()> {
        if from >= self.filters.len() {
            return Err(NfError::BadIndex(from));
        }
        if to >= self.filters.len() {
            return Err(NfError::BadIndex(to));
        }
        let instance = self.filters.remove(from);
        self.filters.insert(to, instance);
        self.rebuild();
        Ok(())
    }

    /// Enable or bypass an instance
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> NfResult<()> {
        let instance = self
            .filters
            .get_mut(index)
            .ok_or(NfError::BadIndex(index))?;
        instance.enabled = enabled;
        self.rebuild();
        Ok(())
    }

    /// Set one parameter by key. The value is clamped to the parameter's
    /// range; the returned configuration is the post-clamp read-back.
    pub fn set_parameter(&mut self, index: usize, key: &str, value: f64) -> NfResult<FilterConfig> {
        let fft_size = self.fft_size;
        let sample_rate = self.sample_rate;
        let instance = self
            .filters
            .get_mut(index)
            .ok_or(NfError::BadIndex(index))?;
        instance.config.set_param(key, value)?;
        instance.mask = SpectralMask::compute(&instance.config, fft_size, sample_rate);
        let config = instance.config;
        self.rebuild();
        Ok(config)
    }

    /// Post-clamp configuration read-back
    pub fn config(&self, index: usize) -> NfResult<FilterConfig> {
        self.filters
            .get(index)
            .map(|f| f.config)
            .ok_or(NfError::BadIndex(index))
    }

    pub fn instance(&self, index: usize) -> NfResult<&FilterInstance> {
        self.filters.get(index).ok_or(NfError::BadIndex(index))
    }

    /// Current composite mask (what the audio thread sees)
    pub fn composite(&self) -> SpectralMask {
        SpectralMask::composite(
            self.filters
                .iter()
                .filter(|f| f.enabled)
                .map(|f| &f.mask),
            self.fft_size,
        )
    }

    fn rebuild(&mut self) {
        self.shared.publish(self.composite());
    }
}
