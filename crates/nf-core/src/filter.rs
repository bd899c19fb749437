//! Spectral shaper configuration
//!
//! Three shaper variants share a center/width/gain parameter set and add
//! per-variant shape controls. Values are clamped to their ranges, never
//! rejected; the clamped configuration is what read-back returns, so hosts
//! (and tests) can observe the clamp.

use serde::{Deserialize, Serialize};

use crate::{NfError, NfResult};

/// Valid range for `center_freq` (Hz)
pub const CENTER_FREQ_RANGE: (f64, f64) = (20.0, 20000.0);
/// Valid range for `width` (Hz)
pub const WIDTH_RANGE: (f64, f64) = (50.0, 10000.0);
/// Valid range for `gain_db` (dB)
pub const GAIN_DB_RANGE: (f64, f64) = (-40.0, 40.0);
/// Valid range for `flat_width` (Hz); additionally capped at `width`
pub const FLAT_WIDTH_RANGE: (f64, f64) = (10.0, 2000.0);
/// Valid range for `skew`
pub const SKEW_RANGE: (f64, f64) = (-5.0, 5.0);
/// Valid range for `kurtosis`
pub const KURTOSIS_RANGE: (f64, f64) = (0.2, 5.0);
/// Valid range for `flatness`
pub const FLATNESS_RANGE: (f64, f64) = (0.5, 3.0);

/// Filter variant discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    Plateau,
    Gaussian,
    Parabolic,
}

impl FilterType {
    /// Parse from a wire-format name; unknown names are a `BadParameter`
    pub fn from_name(name: &str) -> NfResult<Self> {
        match name {
            "plateau" => Ok(Self::Plateau),
            "gaussian" => Ok(Self::Gaussian),
            "parabolic" => Ok(Self::Parabolic),
            other => Err(NfError::BadParameter(format!("unknown filter type: {other}"))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Plateau => "plateau",
            Self::Gaussian => "gaussian",
            Self::Parabolic => "parabolic",
        }
    }
}

/// Configuration for one spectral shaper instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterConfig {
    /// Flat top with raised-cosine rolloff to zero
    Plateau {
        center_freq: f64,
        width: f64,
        gain_db: f64,
        flat_width: f64,
    },
    /// Generalized Gaussian with skew and kurtosis controls
    Gaussian {
        center_freq: f64,
        width: f64,
        gain_db: f64,
        skew: f64,
        kurtosis: f64,
    },
    /// Inverted power-law parabola with skew and flatness controls
    Parabolic {
        center_freq: f64,
        width: f64,
        gain_db: f64,
        skew: f64,
        flatness: f64,
    },
}

#[inline]
fn clamp(value: f64, range: (f64, f64)) -> f64 {
    value.clamp(range.0, range.1)
}

impl FilterConfig {
    /// Default configuration for a variant
    pub fn default_for(filter_type: FilterType) -> Self {
        match filter_type {
            FilterType::Plateau => Self::Plateau {
                center_freq: 1000.0,
                width: 500.0,
                gain_db: 0.0,
                flat_width: 100.0,
            },
            FilterType::Gaussian => Self::Gaussian {
                center_freq: 1000.0,
                width: 500.0,
                gain_db: 0.0,
                skew: 0.0,
                kurtosis: 1.0,
            },
            FilterType::Parabolic => Self::Parabolic {
                center_freq: 1000.0,
                width: 500.0,
                gain_db: 0.0,
                skew: 0.0,
                flatness: 1.0,
            },
        }
    }

    pub fn filter_type(&self) -> FilterType {
        match self {
            Self::Plateau { .. } => FilterType::Plateau,
            Self::Gaussian { .. } => FilterType::Gaussian,
            Self::Parabolic { .. } => FilterType::Parabolic,
        }
    }

    pub fn center_freq(&self) -> f64 {
        match *self {
            Self::Plateau { center_freq, .. }
            | Self::Gaussian { center_freq, .. }
            | Self::Parabolic { center_freq, .. } => center_freq,
        }
    }

    pub fn width(&self) -> f64 {
        match *self {
            Self::Plateau { width, .. }
            | Self::Gaussian { width, .. }
            | Self::Parabolic { width, .. } => width,
        }
    }

    pub fn gain_db(&self) -> f64 {
        match *self {
            Self::Plateau { gain_db, .. }
            | Self::Gaussian { gain_db, .. }
            | Self::Parabolic { gain_db, .. } => gain_db,
        }
    }

    /// Return this configuration with every field clamped to its range.
    /// `flat_width` is additionally capped at `width`.
    pub fn clamped(self) -> Self {
        match self {
            Self::Plateau {
                center_freq,
                width,
                gain_db,
                flat_width,
            } => {
                let width = clamp(width, WIDTH_RANGE);
                Self::Plateau {
                    center_freq: clamp(center_freq, CENTER_FREQ_RANGE),
                    width,
                    gain_db: clamp(gain_db, GAIN_DB_RANGE),
                    flat_width: clamp(flat_width, FLAT_WIDTH_RANGE).min(width),
                }
            }
            Self::Gaussian {
                center_freq,
                width,
                gain_db,
                skew,
                kurtosis,
            } => Self::Gaussian {
                center_freq: clamp(center_freq, CENTER_FREQ_RANGE),
                width: clamp(width, WIDTH_RANGE),
                gain_db: clamp(gain_db, GAIN_DB_RANGE),
                skew: clamp(skew, SKEW_RANGE),
                kurtosis: clamp(kurtosis, KURTOSIS_RANGE),
            },
            Self::Parabolic {
                center_freq,
                width,
                gain_db,
                skew,
                flatness,
            } => Self::Parabolic {
                center_freq: clamp(center_freq, CENTER_FREQ_RANGE),
                width: clamp(width, WIDTH_RANGE),
                gain_db: clamp(gain_db, GAIN_DB_RANGE),
                skew: clamp(skew, SKEW_RANGE),
                flatness: clamp(flatness, FLATNESS_RANGE),
            },
        }
    }

    /// Set a parameter by key, clamping the value. Keys a variant does not
    /// own fail with `BadParameter`.
    pub fn set_param(&mut self, key: &str, value: f64) -> NfResult<()> {
        let updated = match (&mut *self, key) {
            (
                Self::Plateau { center_freq, .. }
                | Self::Gaussian { center_freq, .. }
                | Self::Parabolic { center_freq, .. },
                "center_freq",
            ) => {
                *center_freq = value;
                true
            }
            (
                Self::Plateau { width, .. }
                | Self::Gaussian { width, .. }
                | Self::Parabolic { width, .. },
                "width",
            ) => {
                *width = value;
                true
            }
            (
                Self::Plateau { gain_db, .. }
                | Self::Gaussian { gain_db, .. }
                | Self::Parabolic { gain_db, .. },
                "gain_db",
            ) => {
                *gain_db = value;
                true
            }
            (Self::Plateau { flat_width, .. }, "flat_width") => {
                *flat_width = value;
                true
            }
            (Self::Gaussian { skew, .. } | Self::Parabolic { skew, .. }, "skew") => {
                *skew = value;
                true
            }
            (Self::Gaussian { kurtosis, .. }, "kurtosis") => {
                *kurtosis = value;
                true
            }
            (Self::Parabolic { flatness, .. }, "flatness") => {
                *flatness = value;
                true
            }
            _ => false,
        };

        if !updated {
            return Err(NfError::BadParameter(format!(
                "{} has no parameter '{key}'",
                self.filter_type().name()
            )));
        }

        *self = self.clamped();
        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::default_for(FilterType::Plateau)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_in_range() {
        for ty in [FilterType::Plateau, FilterType::Gaussian, FilterType::Parabolic] {
            let config = FilterConfig::default_for(ty);
            assert_eq!(config, config.clamped());
        }
    }

    #[test]
    fn test_clamp_is_observable() {
        let mut config = FilterConfig::default_for(FilterType::Gaussian);
        config.set_param("center_freq", 50000.0).unwrap();
        assert_eq!(config.center_freq(), CENTER_FREQ_RANGE.1);

        config.set_param("skew", -99.0).unwrap();
        match config {
            FilterConfig::Gaussian { skew, .. } => assert_eq!(skew, SKEW_RANGE.0),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_clamp_idempotent() {
        let mut a = FilterConfig::default_for(FilterType::Parabolic);
        a.set_param("flatness", 100.0).unwrap();
        let mut b = a;
        b.set_param("flatness", 100.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_flat_width_capped_at_width() {
        let mut config = FilterConfig::default_for(FilterType::Plateau);
        config.set_param("width", 80.0).unwrap();
        config.set_param("flat_width", 500.0).unwrap();
        match config {
            FilterConfig::Plateau { width, flat_width, .. } => {
                assert_eq!(width, 80.0);
                assert_eq!(flat_width, 80.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_unknown_key_for_variant() {
        let mut config = FilterConfig::default_for(FilterType::Plateau);
        let err = config.set_param("kurtosis", 1.0).unwrap_err();
        assert!(matches!(err, NfError::BadParameter(_)));
    }

    #[test]
    fn test_unknown_type_name() {
        assert!(FilterType::from_name("brickwall").is_err());
        assert_eq!(FilterType::from_name("plateau").unwrap(), FilterType::Plateau);
    }

    #[test]
    fn test_serde_round_trip() {
        let config = FilterConfig::default_for(FilterType::Gaussian);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"type\":\"gaussian\""));
        let back: FilterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
