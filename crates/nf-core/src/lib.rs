//! nf-core: Shared types for NoiseForge
//!
//! This crate provides the foundational types used across all NoiseForge
//! crates: the sample scalar, sample-rate and host-block enums, the error
//! taxonomy, filter and export configuration, and the immutable snapshots
//! the offline renderer consumes.

mod error;
mod export;
mod filter;
mod level;
mod snapshot;

pub use error::*;
pub use export::*;
pub use filter::*;
pub use level::*;
pub use snapshot::*;

/// Type alias for audio samples at the signal boundary (32-bit float,
/// interpreted in [-1, 1] at the sink). DSP interiors compute in f64.
pub type Sample = f32;

/// Supported sample rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum SampleRate {
    Hz44100 = 44100,
    Hz48000 = 48000,
}

impl SampleRate {
    #[inline]
    pub fn as_f64(self) -> f64 {
        self as u32 as f64
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Parse from a raw rate; anything other than the two supported rates
    /// is unsupported at initialization time.
    pub fn from_u32(rate: u32) -> NfResult<Self> {
        match rate {
            44100 => Ok(Self::Hz44100),
            48000 => Ok(Self::Hz48000),
            other => Err(NfError::Unsupported(format!("sample rate {other} Hz"))),
        }
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::Hz48000
    }
}

/// Host callback block sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum HostBlockSize {
    Samples64 = 64,
    Samples128 = 128,
    Samples256 = 256,
}

impl HostBlockSize {
    #[inline]
    pub fn as_usize(self) -> usize {
        self as u32 as usize
    }

    /// Callback deadline in milliseconds
    #[inline]
    pub fn deadline_ms(self, sample_rate: SampleRate) -> f64 {
        (self.as_usize() as f64 / sample_rate.as_f64()) * 1000.0
    }
}

impl Default for HostBlockSize {
    fn default() -> Self {
        Self::Samples128
    }
}
