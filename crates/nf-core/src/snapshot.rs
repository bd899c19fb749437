//! Immutable render snapshots
//!
//! The offline renderer and its workers never touch live engine state; they
//! receive value snapshots taken on the control thread. Mutation produces a
//! new snapshot.

use serde::{Deserialize, Serialize};

use crate::{FilterConfig, SampleRate};

/// Snapshot of one filter instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSnapshot {
    pub config: FilterConfig,
    pub enabled: bool,
}

/// Snapshot of one track's render-relevant state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub id: u64,
    /// Linear gain in [0, 1]
    pub gain: f64,
    pub muted: bool,
    pub filters: Vec<FilterSnapshot>,
}

impl TrackSnapshot {
    /// A track contributes to the offline mix unless muted
    pub fn is_audible(&self) -> bool {
        !self.muted && self.gain > 0.0
    }

    /// Enabled filter configurations, in chain order
    pub fn enabled_filters(&self) -> impl Iterator<Item = &FilterConfig> {
        self.filters
            .iter()
            .filter(|f| f.enabled)
            .map(|f| &f.config)
    }
}

/// Snapshot of the full mix, ordered by ascending track id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixSnapshot {
    pub sample_rate: SampleRate,
    pub tracks: Vec<TrackSnapshot>,
}

impl MixSnapshot {
    pub fn new(sample_rate: SampleRate, mut tracks: Vec<TrackSnapshot>) -> Self {
        // Fixed summation order is by ascending track id
        tracks.sort_by_key(|t| t.id);
        Self { sample_rate, tracks }
    }

    pub fn audible_tracks(&self) -> impl Iterator<Item = &TrackSnapshot> {
        self.tracks.iter().filter(|t| t.is_audible())
    }
}
