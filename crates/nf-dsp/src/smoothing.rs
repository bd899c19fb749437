//! Lock-free parameter smoothing
//!
//! Click-free gain changes: the control thread retargets atomically, the
//! audio thread ramps toward the target one sample at a time with zero
//! allocation. Tracks and the master stage use 10 ms linear ramps.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Default ramp length for gain changes
pub const GAIN_RAMP_MS: f64 = 10.0;

/// Linearly smoothed parameter with an atomic target
#[derive(Debug)]
pub struct SmoothedParam {
    /// Target value, set from the control thread
    target: AtomicU64,
    /// Current smoothed value (audio thread only)
    current: f64,
    /// Ramp length in samples
    ramp_samples: f64,
    /// Step per sample while ramping
    step: f64,
    /// Samples left in the active ramp
    remaining: u32,
    /// Target changed since the last ramp recalculation
    dirty: AtomicBool,
}

impl SmoothedParam {
    pub fn new(initial: f64, ramp_ms: f64, sample_rate: f64) -> Self {
        Self {
            target: AtomicU64::new(initial.to_bits()),
            current: initial,
            ramp_samples: (ramp_ms / 1000.0) * sample_rate,
            step: 0.0,
            remaining: 0,
            dirty: AtomicBool::new(false),
        }
    }

    /// Set the target (thread-safe; the audio thread picks up the change
    /// at its next sample)
    #[inline]
    pub fn set_target(&self, value: f64) {
        self.target.store(value.to_bits(), Ordering::Relaxed);
        self.dirty.store(true, Ordering::Release);
    }

    #[inline]
    pub fn target(&self) -> f64 {
        f64::from_bits(self.target.load(Ordering::Relaxed))
    }

    /// Current smoothed value without advancing
    #[inline]
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Jump to a value immediately, cancelling any ramp
    pub fn set_immediate(&mut self, value: f64) {
        self.current = value;
        self.target.store(value.to_bits(), Ordering::Relaxed);
        self.remaining = 0;
        self.dirty.store(false, Ordering::Relaxed);
    }

    /// True while a ramp is in flight
    #[inline]
    pub fn is_ramping(&self) -> bool {
        self.remaining > 0 || self.dirty.load(Ordering::Acquire)
    }

    /// Advance one sample and return the smoothed value
    #[inline]
    pub fn next(&mut self) -> f64 {
        if self.dirty.swap(false, Ordering::Acquire) {
            let target = self.target();
            let diff = target - self.current;
            self.remaining = self.ramp_samples as u32;
            if self.remaining > 0 {
                self.step = diff / f64::from(self.remaining);
            } else {
                self.current = target;
                self.step = 0.0;
            }
        }

        if self.remaining > 0 {
            self.current += self.step;
            self.remaining -= 1;
            if self.remaining == 0 {
                // Land exactly on the target
                self.current = self.target();
            }
        }

        self.current
    }
}
