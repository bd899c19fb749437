//! Engine facade
//!
//! [`NoiseEngine::new`] wires the two halves together and hands back:
//!
//! - [`AudioProcessor`]: owned by the audio host, drives the mix bus from
//!   the real-time callback. Never allocates, locks, logs, or fails
//!   loudly; internal trouble zero-fills the block and raises a one-shot
//!   diagnostic.
//! - [`EngineController`]: owned by the control thread. All configuration
//!   mutation flows through it; structural changes travel to the audio
//!   thread over an SPSC command ring drained once per block.
//!
//! There are no global singletons: the host constructs the engine and
//! threads the two halves to where they live.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};

use nf_core::{
    FilterConfig, FilterType, HostBlockSize, MixSnapshot, NfError, NfResult, Sample, SampleRate,
    TrackSnapshot,
};
use nf_dsp::{AnalyzerConfig, Biquad, SpectrumAnalyzer, STFT_HOP, STFT_SIZE};

use crate::bus::MixBus;
use crate::command::{ConfigRequest, ConfigResponse, EngineCommand, FftInfo, PerformanceInfo};
use crate::event::{Diagnostic, EngineEvent, EventBus};
use crate::track::{TrackCtl, TrackDsp};

/// Command ring capacity; the control thread throttles itself against this
const COMMAND_RING_CAPACITY: usize = 256;
/// Analyzer tap capacity in samples
const ANALYZER_RING_CAPACITY: usize = 1 << 15;
/// Reclaim ring capacity in removed tracks
const RECLAIM_RING_CAPACITY: usize = 64;

/// Shared real-time statistics (audio writes, control reads)
#[derive(Debug, Default)]
struct PerfCounters {
    blocks: AtomicU64,
    last_block_nanos: AtomicU64,
}

/// Audio-host half of the engine
pub struct AudioProcessor {
    bus: MixBus,
    cmd_rx: Consumer<EngineCommand>,
    perf: Arc<PerfCounters>,
    block_size: usize,
}

impl AudioProcessor {
    /// Host callback: render one mono block. Returns `true` to continue.
    ///
    /// Blocks longer than the configured size are an internal error:
    /// output is zero-filled and a diagnostic is raised, but the audio
    /// thread keeps running.
    pub fn process(&mut self, output: &mut [Sample]) -> bool {
        let started = Instant::now();

        if output.len() > self.block_size {
            output.fill(0.0);
            self.bus.raise(Diagnostic::BadBlockSize);
            return true;
        }

        // Apply parameter updates atomically at the block boundary
        while let Ok(command) = self.cmd_rx.pop() {
            self.apply(command);
        }

        self.bus.process(output);

        self.perf.blocks.fetch_add(1, Ordering::Relaxed);
        self.perf
            .last_block_nanos
            .store(started.elapsed().as_nanos() as u64, Ordering::Relaxed);
        true
    }

    fn apply(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::AddTrack(track) => self.bus.add_track(track),
            EngineCommand::RemoveTrack(index) => self.bus.remove_track(index),
            EngineCommand::StartTrack { index, seed } => {
                if let Some(track) = self.bus.track_mut(index) {
                    track.start(seed);
                }
            }
            EngineCommand::StopTrack(index) => {
                if let Some(track) = self.bus.track_mut(index) {
                    track.stop();
                }
            }
            EngineCommand::SetTrackGain { index, gain } => {
                if let Some(track) = self.bus.track_mut(index) {
                    track.set_gain(gain);
                }
            }
            EngineCommand::SetTrackMuted { index, muted } => {
                if let Some(track) = self.bus.track_mut(index) {
                    track.set_muted(muted);
                }
            }
            EngineCommand::SetMasterGain(gain) => self.bus.set_master_gain(gain),
            EngineCommand::StopAll => {
                for track in self.bus.tracks_mut() {
                    track.stop();
                }
            }
        }
    }
}

/// Analyzer fed from the audio thread's tap ring
pub struct AnalyzerTap {
    rx: Consumer<Sample>,
    analyzer: SpectrumAnalyzer,
    scratch: Vec<Sample>,
}

impl AnalyzerTap {
    /// Drain tapped mix samples and refresh the spectrum
    pub fn update(&mut self) {
        loop {
            let mut read = 0;
            while read < self.scratch.len() {
                match self.rx.pop() {
                    Ok(sample) => {
                        self.scratch[read] = sample;
                        read += 1;
                    }
                    Err(_) => break,
                }
            }
            if read == 0 {
                break;
            }
            self.analyzer.push_samples(&self.scratch[..read]);
            if read < self.scratch.len() {
                break;
            }
        }
        self.analyzer.analyze();
    }

    pub fn display_data(&self, pixel_width: usize) -> Vec<f32> {
        self.analyzer.display_data(pixel_width)
    }

    pub fn reconfigure(&mut self, config: AnalyzerConfig) -> NfResult<()> {
        self.analyzer.reconfigure(config)
    }

    pub fn analyzer(&self) -> &SpectrumAnalyzer {
        &self.analyzer
    }
}

/// Control-thread half of the engine
pub struct EngineController {
    cmd_tx: Producer<EngineCommand>,
    reclaim_rx: Consumer<Box<TrackDsp>>,
    diag_rx: Consumer<Diagnostic>,
    events: EventBus,
    analyzer: Arc<Mutex<AnalyzerTap>>,
    perf: Arc<PerfCounters>,

    tracks: Vec<TrackCtl>,
    master_gain: f64,
    /// True between `start_all` and `stop_all`: newly added tracks
    /// soft-join the running mix
    playing: bool,
    sample_rate: SampleRate,
    block_size: HostBlockSize,
    /// Session counter mixed into playback-start seeds
    seed_counter: u32,
}

impl EngineController {
    /// Number of tracks
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Event bus for UI consumers
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Shared analyzer handle; reconfiguration is safe concurrently with
    /// display reads because both go through the mutex
    pub fn analyzer(&self) -> Arc<Mutex<AnalyzerTap>> {
        Arc::clone(&self.analyzer)
    }

    /// Forward any audio-thread diagnostics onto the event bus and free
    /// reclaimed track processors. Call periodically from the control
    /// thread (UI tick rate is plenty).
    pub fn poll(&mut self) {
        while let Ok(diag) = self.diag_rx.pop() {
            log::warn!("audio-thread diagnostic: {diag:?}");
            self.events.publish(EngineEvent::Diagnostic(diag));
        }
        while let Ok(track) = self.reclaim_rx.pop() {
            drop(track);
        }
    }

    fn send(&mut self, command: EngineCommand) -> NfResult<()> {
        self.cmd_tx
            .push(command)
            .map_err(|_| NfError::Internal("command ring full".into()))
    }

    fn next_seed(&mut self) -> u32 {
        self.seed_counter = self.seed_counter.wrapping_add(0x9e37_79b9);
        self.seed_counter | 1
    }

    fn check_track(&self, index: usize) -> NfResult<()> {
        if index >= self.tracks.len() {
            return Err(NfError::BadIndex(index));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // TRACK SET
    // ═══════════════════════════════════════════════════════════════════

    /// Add a track; returns its positional id. While the engine is
    /// playing the new track soft-joins the running mix immediately.
    pub fn add_track(&mut self) -> NfResult<usize> {
        self.add_track_with_passthrough(Vec::new())
    }

    /// Add a track with time-domain pass-through sections ahead of its
    /// STFT stage
    pub fn add_track_with_passthrough(&mut self, passthrough: Vec<Biquad>) -> NfResult<usize> {
        let ctl = TrackCtl::new(self.sample_rate.as_f64());
        let dsp = Box::new(TrackDsp::new(
            ctl.chain.shared_mask(),
            passthrough,
            self.sample_rate.as_f64(),
            self.block_size.as_usize(),
        ));

        let index = self.tracks.len();
        self.tracks.push(ctl);
        self.send(EngineCommand::AddTrack(dsp))?;
        self.events.publish(EngineEvent::TrackAdded(index));

        if self.playing {
            self.start_track(index)?;
        }
        Ok(index)
    }

    /// Remove a track; later positional ids shift down
    pub fn remove_track(&mut self, index: usize) -> NfResult<()> {
        self.check_track(index)?;
        self.tracks.remove(index);
        self.send(EngineCommand::RemoveTrack(index))?;
        self.events.publish(EngineEvent::TrackRemoved(index));
        Ok(())
    }

    pub fn start_track(&mut self, index: usize) -> NfResult<()> {
        self.check_track(index)?;
        let seed = self.next_seed();
        self.tracks[index].playing = true;
        self.send(EngineCommand::StartTrack { index, seed })?;
        self.events.publish(EngineEvent::TrackStarted(index));
        Ok(())
    }

    pub fn stop_track(&mut self, index: usize) -> NfResult<()> {
        self.check_track(index)?;
        self.tracks[index].playing = false;
        self.send(EngineCommand::StopTrack(index))?;
        self.events.publish(EngineEvent::TrackStopped(index));
        Ok(())
    }

    pub fn start_all(&mut self) -> NfResult<()> {
        self.playing = true;
        for index in 0..self.tracks.len() {
            self.start_track(index)?;
        }
        Ok(())
    }

    pub fn stop_all(&mut self) -> NfResult<()> {
        self.playing = false;
        for track in &mut self.tracks {
            track.playing = false;
        }
        self.send(EngineCommand::StopAll)
    }

    pub fn set_track_gain(&mut self, index: usize, gain: f64) -> NfResult<()> {
        self.check_track(index)?;
        let gain = gain.clamp(0.0, 1.0);
        self.tracks[index].gain = gain;
        self.send(EngineCommand::SetTrackGain { index, gain })
    }

    pub fn set_track_muted(&mut self, index: usize, muted: bool) -> NfResult<()> {
        self.check_track(index)?;
        self.tracks[index].muted = muted;
        self.send(EngineCommand::SetTrackMuted { index, muted })
    }

    pub fn set_master_gain(&mut self, gain: f64) -> NfResult<()> {
        self.master_gain = gain.clamp(0.0, 1.0);
        self.send(EngineCommand::SetMasterGain(self.master_gain))
    }

    pub fn master_gain(&self) -> f64 {
        self.master_gain
    }

    /// True between `start_all` and `stop_all`
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    // ═══════════════════════════════════════════════════════════════════
    // FILTER CHAIN OPERATIONS
    // ═══════════════════════════════════════════════════════════════════

    /// Append a filter to a track's chain; returns the filter index
    pub fn add_filter(
        &mut self,
        track: usize,
        filter_type: FilterType,
        config: Option<FilterConfig>,
    ) -> NfResult<usize> {
        self.check_track(track)?;
        let index = self.tracks[track].chain.add(filter_type, config);
        self.events
            .publish(EngineEvent::FilterAdded { track, filter: index });
        Ok(index)
    }

    pub fn remove_filter(&mut self, track: usize, filter: usize) -> NfResult<()> {
        self.check_track(track)?;
        self.tracks[track].chain.remove(filter)?;
        self.events
            .publish(EngineEvent::FilterRemoved { track, filter });
        Ok(())
    }

    pub fn move_filter(&mut self, track: usize, from: usize, to: usize) -> NfResult<()> {
        self.check_track(track)?;
        self.tracks[track].chain.move_filter(from, to)?;
        self.events
            .publish(EngineEvent::FilterMoved { track, from, to });
        Ok(())
    }

    pub fn set_filter_enabled(&mut self, track: usize, filter: usize, enabled: bool) -> NfResult<()> {
        self.check_track(track)?;
        self.tracks[track].chain.set_enabled(filter, enabled)
    }

    /// Set one filter parameter; returns the post-clamp configuration
    pub fn set_filter_parameter(
        &mut self,
        track: usize,
        filter: usize,
        key: &str,
        value: f64,
    ) -> NfResult<FilterConfig> {
        self.check_track(track)?;
        self.tracks[track].chain.set_parameter(filter, key, value)
    }

    pub fn filter_config(&self, track: usize, filter: usize) -> NfResult<FilterConfig> {
        self.check_track(track)?;
        self.tracks[track].chain.config(filter)
    }

    // ═══════════════════════════════════════════════════════════════════
    // CONFIGURATION CHANNEL
    // ═══════════════════════════════════════════════════════════════════

    /// Handle one typed configuration request synchronously
    pub fn handle_request(&mut self, request: ConfigRequest) -> ConfigResponse {
        match request {
            ConfigRequest::Config {
                track,
                filter,
                params,
            } => {
                for (key, value) in &params {
                    if let Err(err) = self.set_filter_parameter(track, filter, key, *value) {
                        return ConfigResponse::Error(err.to_string());
                    }
                }
                ConfigResponse::Initialized
            }
            ConfigRequest::GetPerformance => match self.performance() {
                Ok(info) => ConfigResponse::Performance(info),
                Err(err) => ConfigResponse::Error(err.to_string()),
            },
            ConfigRequest::GetFftInfo => ConfigResponse::FftInfo(self.fft_info()),
        }
    }

    /// Real-time statistics; `NotInitialized` until the audio thread has
    /// processed its first block
    pub fn performance(&self) -> NfResult<PerformanceInfo> {
        let blocks = self.perf.blocks.load(Ordering::Relaxed);
        if blocks == 0 {
            return Err(NfError::NotInitialized);
        }
        Ok(PerformanceInfo {
            blocks_processed: blocks,
            last_block_us: self.perf.last_block_nanos.load(Ordering::Relaxed) as f64 / 1000.0,
            deadline_us: self.block_size.deadline_ms(self.sample_rate) * 1000.0,
        })
    }

    pub fn fft_info(&self) -> FftInfo {
        FftInfo {
            fft_size: STFT_SIZE,
            hop_size: STFT_HOP,
            latency_samples: STFT_SIZE,
            sample_rate: self.sample_rate.as_u32(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // SNAPSHOTS
    // ═══════════════════════════════════════════════════════════════════

    /// Immutable snapshot of the current mix for the offline renderer
    pub fn snapshot(&self) -> MixSnapshot {
        let tracks = self
            .tracks
            .iter()
            .enumerate()
            .map(|(id, track)| TrackSnapshot {
                id: id as u64,
                gain: track.gain,
                muted: track.muted,
                filters: (0..track.chain.len())
                    .map(|i| {
                        let instance = track.chain.instance(i).expect("index in range");
                        nf_core::FilterSnapshot {
                            config: instance.config(),
                            enabled: instance.enabled(),
                        }
                    })
                    .collect(),
            })
            .collect();
        MixSnapshot::new(self.sample_rate, tracks)
    }
}

/// Engine constructor
pub struct NoiseEngine;

impl NoiseEngine {
    /// Build the audio and control halves, wired together. The sample
    /// rate is discovered at construction; hosts with a raw rate go
    /// through [`SampleRate::from_u32`] first and surface `Unsupported`
    /// before anything is built.
    pub fn new(
        sample_rate: SampleRate,
        block_size: HostBlockSize,
    ) -> (AudioProcessor, EngineController) {
        let (cmd_tx, cmd_rx) = RingBuffer::new(COMMAND_RING_CAPACITY);
        let (analyzer_tx, analyzer_rx) = RingBuffer::new(ANALYZER_RING_CAPACITY);
        let (reclaim_tx, reclaim_rx) = RingBuffer::new(RECLAIM_RING_CAPACITY);
        let (diag_tx, diag_rx) = RingBuffer::new(RECLAIM_RING_CAPACITY);

        let perf = Arc::new(PerfCounters::default());

        let analyzer = SpectrumAnalyzer::new(AnalyzerConfig::default(), sample_rate.as_f64())
            .expect("default analyzer config is valid");
        let tap = AnalyzerTap {
            rx: analyzer_rx,
            analyzer,
            scratch: vec![0.0; 4096],
        };

        let bus = MixBus::new(
            block_size.as_usize(),
            sample_rate.as_f64(),
            analyzer_tx,
            reclaim_tx,
            diag_tx,
        );

        let processor = AudioProcessor {
            bus,
            cmd_rx,
            perf: Arc::clone(&perf),
            block_size: block_size.as_usize(),
        };

        let controller = EngineController {
            cmd_tx,
            reclaim_rx,
            diag_rx,
            events: EventBus::new(),
            analyzer: Arc::new(Mutex::new(tap)),
            perf,
            tracks: Vec::new(),
            master_gain: 1.0,
            playing: false,
            sample_rate,
            block_size,
            seed_counter: 0x6b8b_4567,
        };

        (processor, controller)
    }
}
