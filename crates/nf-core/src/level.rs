//! Signal level with an explicit silent variant
//!
//! Silence is a distinct state, not a `-inf` float smuggled through dB
//! arithmetic. Conversions to and from linear gain live here; the core
//! itself treats gain uniformly as linear in [0, 1] and dB appears only at
//! presentation boundaries.

use serde::{Deserialize, Serialize};

/// Gain below this many dB converts to exact silence
const SILENCE_FLOOR_DB: f64 = -144.0;

/// A signal level: either exact silence or a finite decibel value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Level {
    Silent,
    Db(f64),
}

impl Level {
    pub const UNITY: Self = Self::Db(0.0);

    /// Convert a linear gain to a level
    #[inline]
    pub fn from_gain(gain: f64) -> Self {
        if gain <= 0.0 {
            Self::Silent
        } else {
            Self::Db(20.0 * gain.log10())
        }
    }

    /// Convert to linear gain
    #[inline]
    pub fn to_gain(self) -> f64 {
        match self {
            Self::Silent => 0.0,
            Self::Db(db) if db <= SILENCE_FLOOR_DB => 0.0,
            Self::Db(db) => 10.0_f64.powf(db / 20.0),
        }
    }

    #[inline]
    pub fn is_silent(self) -> bool {
        matches!(self, Self::Silent)
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::UNITY
    }
}

/// Convert dB to linear gain
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert linear gain to dB; silence maps to the explicit variant via
/// [`Level::from_gain`], use that at boundaries.
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    20.0 * linear.max(1e-10).log10()
}
