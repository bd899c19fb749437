//! Analysis windows

use serde::{Deserialize, Serialize};

/// Window type metadata for display consumers. Analysis paths always use
/// their own internally consistent Hann window; this enum only travels with
/// spectrum data so a UI can label what it is drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    #[default]
    Hann,
    Hamming,
    Blackman,
}

/// Periodic Hann window of length `n`
pub fn hann(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / n as f64).cos()))
        .collect()
}

/// OLA normalization scalar for double-windowed (analysis + synthesis)
/// reconstruction: Σ w²[i] / hop. For a periodic Hann window at 75% overlap
/// this is exactly 1.5, and dividing each synthesized frame by it makes a
/// unity mask reconstruct input amplitude exactly.
pub fn ola_norm(window: &[f64], hop: usize) -> f64 {
    window.iter().map(|w| w * w).sum::<f64>() / hop as f64
}
