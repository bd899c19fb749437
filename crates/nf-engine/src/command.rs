//! Typed command channels
//!
//! Two layers: [`EngineCommand`] is the internal control→audio stream
//! drained once per block at block boundaries; [`ConfigRequest`] /
//! [`ConfigResponse`] is the host-facing configuration channel handled
//! synchronously on the control thread.

use serde::{Deserialize, Serialize};

use crate::track::TrackDsp;

/// Control→audio command, applied at the next block boundary
pub enum EngineCommand {
    /// Install a fully constructed track processor at the end of the set
    AddTrack(Box<TrackDsp>),
    /// Remove the track at this position; later positions shift down.
    /// The removed processor is returned over the reclaim ring.
    RemoveTrack(usize),
    StartTrack { index: usize, seed: u32 },
    StopTrack(usize),
    SetTrackGain { index: usize, gain: f64 },
    SetTrackMuted { index: usize, muted: bool },
    SetMasterGain(f64),
    StopAll,
}

/// Host-facing configuration request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigRequest {
    /// Partial reconfiguration of one filter instance: a set of
    /// key/value pairs applied in order
    Config {
        track: usize,
        filter: usize,
        params: Vec<(String, f64)>,
    },
    GetPerformance,
    GetFftInfo,
}

/// Host-facing response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigResponse {
    /// Acknowledgement of a successful `Config` request
    Initialized,
    Performance(PerformanceInfo),
    FftInfo(FftInfo),
    Error(String),
}

/// Real-time processing statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceInfo {
    pub blocks_processed: u64,
    /// Wall time of the most recent block, microseconds
    pub last_block_us: f64,
    /// Callback deadline, microseconds
    pub deadline_us: f64,
}

/// STFT geometry exposed to hosts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FftInfo {
    pub fft_size: usize,
    pub hop_size: usize,
    pub latency_samples: usize,
    pub sample_rate: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = ConfigRequest::Config {
            track: 0,
            filter: 1,
            params: vec![("center_freq".into(), 440.0)],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"kind\":\"config\""));
        let back: ConfigRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, back);
    }

    #[test]
    fn test_response_wire_format() {
        let response = ConfigResponse::FftInfo(FftInfo {
            fft_size: 4096,
            hop_size: 1024,
            latency_samples: 4096,
            sample_rate: 48000,
        });
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"kind\":\"fft_info\""));
    }
}
