//! Render progress reporting
//!
//! The progress consumer may return `false` to request cancellation. The
//! contract is advisory: in-flight chunks are not interrupted, and the
//! renderer resolves with `Cancelled` once they settle.

use serde::{Deserialize, Serialize};

/// Render phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPhase {
    Starting,
    Processing,
    Finalizing,
}

/// One progress report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderProgress {
    pub phase: RenderPhase,
    pub chunks_completed: usize,
    pub chunks_total: usize,
    pub overall_progress_pct: f64,
}

impl RenderProgress {
    pub fn new(phase: RenderPhase, chunks_completed: usize, chunks_total: usize) -> Self {
        let overall_progress_pct = if chunks_total == 0 {
            0.0
        } else {
            100.0 * chunks_completed as f64 / chunks_total as f64
        };
        Self {
            phase,
            chunks_completed,
            chunks_total,
            overall_progress_pct,
        }
    }
}

/// Progress callback: return `false` to request cancellation
pub type ProgressFn<'a> = dyn FnMut(RenderProgress) -> bool + 'a;
