//! Offline renderer
//!
//! Renders a mix snapshot into a dense mono buffer, either in one pass
//! (direct mode) or split into chunks (chunked mode) when the memory
//! estimate exceeds the budget. Each track's enabled filters are composed
//! into one mask and applied with a single bulk FFT over the span (next
//! power of two, zero-padded, trimmed after the inverse transform).
//!
//! Offline noise is position-addressable (`OfflineNoise`), so any span of
//! the timeline regenerates identical samples no matter how the timeline
//! is chunked or which worker renders it. Tracks are summed in ascending
//! track-id order for bit-stable output; in direct mode the per-track
//! renders fan out over rayon and are summed in order after the join.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use nf_core::{MixSnapshot, NfError, NfResult, Sample, TrackSnapshot};
use nf_dsp::{FftKernel, OfflineNoise, SpectralMask};

use crate::progress::{ProgressFn, RenderPhase, RenderProgress};
use crate::worker::{ChunkJob, WorkerPool};

/// Chunk length in sequential chunked mode
pub const CHUNK_SECONDS_SEQUENTIAL: usize = 30;
/// Chunk length in parallel chunked mode
pub const CHUNK_SECONDS_PARALLEL: usize = 10;
/// Memory budget that flips the renderer into chunked mode
const MEMORY_LIMIT_BYTES: usize = 500 * 1024 * 1024;
/// Estimated working-set bytes per rendered sample (output + split-complex
/// FFT scratch)
const BYTES_PER_SAMPLE_ESTIMATE: usize = 5 * 4;
/// Leading context rendered per chunk in overlap-add blending
const BLEND_CONTEXT_SAMPLES: usize = 4096;

/// How chunk outputs are joined in chunked mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkBlend {
    /// Concatenate independent per-chunk renders. Filters are applied to
    /// each chunk as an independent bulk FFT, so very narrow filters can
    /// click at chunk boundaries.
    #[default]
    Strict,
    /// Render each chunk with a leading context and raised-cosine
    /// crossfade the seams. Smooths boundary artifacts at the cost of one
    /// extra context render per chunk.
    OverlapAdd,
}

/// Mode override; `Auto` selects by memory estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Auto,
    Direct,
    Chunked,
}

/// Renderer options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Dispatch chunks to a worker pool when there are at least two
    pub parallel: bool,
    pub chunk_blend: ChunkBlend,
    pub mode: RenderMode,
    /// Base seed for the deterministic offline noise streams
    pub base_seed: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            chunk_blend: ChunkBlend::default(),
            mode: RenderMode::default(),
            base_seed: 0,
        }
    }
}

/// Offline mix renderer over an immutable snapshot
pub struct OfflineRenderer {
    snapshot: Arc<MixSnapshot>,
    options: RenderOptions,
}

impl OfflineRenderer {
    pub fn new(snapshot: MixSnapshot, options: RenderOptions) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            options,
        }
    }

    pub fn snapshot(&self) -> &MixSnapshot {
        &self.snapshot
    }

    /// Render `seconds` of the mix from the start of the timeline
    pub fn render_seconds(
        &self,
        seconds: f64,
        progress: &mut ProgressFn<'_>,
    ) -> NfResult<Vec<Sample>> {
        let len = (seconds * self.snapshot.sample_rate.as_f64()).floor() as usize;
        self.render(0, len, progress)
    }

    /// Render `len` samples starting at timeline position `start`
    pub fn render(
        &self,
        start: usize,
        len: usize,
        progress: &mut ProgressFn<'_>,
    ) -> NfResult<Vec<Sample>> {
        let chunked = match self.options.mode {
            RenderMode::Direct => false,
            RenderMode::Chunked => true,
            RenderMode::Auto => len * BYTES_PER_SAMPLE_ESTIMATE > MEMORY_LIMIT_BYTES,
        };

        if !chunked {
            if !progress(RenderProgress::new(RenderPhase::Starting, 0, 1)) {
                return Err(NfError::Cancelled);
            }
            let buffer = render_span_parallel(&self.snapshot, self.options.base_seed, start, len);
            if !progress(RenderProgress::new(RenderPhase::Processing, 1, 1)) {
                return Err(NfError::Cancelled);
            }
            progress(RenderProgress::new(RenderPhase::Finalizing, 1, 1));
            return Ok(buffer);
        }

        self.render_chunked(start, len, progress)
    }

    fn render_chunked(
        &self,
        start: usize,
        len: usize,
        progress: &mut ProgressFn<'_>,
    ) -> NfResult<Vec<Sample>> {
        let sr = self.snapshot.sample_rate.as_u32() as usize;
        let parallel = self.options.parallel;
        let chunk_len = if parallel {
            CHUNK_SECONDS_PARALLEL * sr
        } else {
            CHUNK_SECONDS_SEQUENTIAL * sr
        };

        let jobs = plan_chunks(start, len, chunk_len, self.options.chunk_blend);
        let total = jobs.len();

        if !progress(RenderProgress::new(RenderPhase::Starting, 0, total)) {
            return Err(NfError::Cancelled);
        }

        let buffers = if parallel && total >= 2 {
            match WorkerPool::spawn(Arc::clone(&self.snapshot), self.options.base_seed) {
                Ok(pool) => pool.dispatch(jobs.clone(), progress)?,
                Err(NfError::WorkerInitTimeout(worker, ms)) => {
                    log::warn!(
                        "worker {worker} missed the {ms} ms init deadline; \
                         degrading to sequential chunk rendering"
                    );
                    self.render_chunks_sequential(&jobs, progress)?
                }
                Err(other) => return Err(other),
            }
        } else {
            self.render_chunks_sequential(&jobs, progress)?
        };

        progress(RenderProgress::new(RenderPhase::Finalizing, total, total));
        Ok(assemble_chunks(buffers, &jobs, len))
    }

    fn render_chunks_sequential(
        &self,
        jobs: &[ChunkJob],
        progress: &mut ProgressFn<'_>,
    ) -> NfResult<Vec<Vec<Sample>>> {
        let total = jobs.len();
        let mut buffers = Vec::with_capacity(total);

        for (completed, job) in jobs.iter().enumerate() {
            // Cooperative cancellation between chunks only; partial
            // buffers are discarded on the way out
            if !progress(RenderProgress::new(RenderPhase::Processing, completed, total)) {
                return Err(NfError::Cancelled);
            }
            buffers.push(render_span_parallel(
                &self.snapshot,
                self.options.base_seed,
                job.render_start(),
                job.render_len(),
            ));
        }

        if !progress(RenderProgress::new(RenderPhase::Processing, total, total)) {
            return Err(NfError::Cancelled);
        }
        Ok(buffers)
    }
}

/// Split `[start, start + len)` into chunk jobs. In overlap-add blending
/// every chunk after the first renders `BLEND_CONTEXT_SAMPLES` of leading
/// context for the seam crossfade.
pub(crate) fn plan_chunks(
    start: usize,
    len: usize,
    chunk_len: usize,
    blend: ChunkBlend,
) -> Vec<ChunkJob> {
    let count = len.div_ceil(chunk_len).max(1);
    (0..count)
        .map(|index| {
            let chunk_start = start + index * chunk_len;
            let chunk_size = chunk_len.min(start + len - chunk_start);
            let context = match blend {
                ChunkBlend::Strict => 0,
                ChunkBlend::OverlapAdd => {
                    if index == 0 {
                        0
                    } else {
                        BLEND_CONTEXT_SAMPLES.min(chunk_start)
                    }
                }
            };
            ChunkJob {
                index,
                start: chunk_start,
                len: chunk_size,
                context,
            }
        })
        .collect()
}

/// Join chunk buffers in index order. Strict-mode chunks concatenate;
/// context-carrying chunks crossfade their context against the previous
/// chunk's tail with a raised-cosine ramp.
pub(crate) fn assemble_chunks(
    buffers: Vec<Vec<Sample>>,
    jobs: &[ChunkJob],
    total_len: usize,
) -> Vec<Sample> {
    let mut out: Vec<Sample> = Vec::with_capacity(total_len);

    for (buffer, job) in buffers.into_iter().zip(jobs) {
        if job.context == 0 {
            out.extend_from_slice(&buffer);
            continue;
        }

        let seam = out.len() - job.context;
        for (j, &incoming) in buffer[..job.context].iter().enumerate() {
            let w = 0.5 * (1.0 - (std::f64::consts::PI * j as f64 / job.context as f64).cos());
            let blended = f64::from(out[seam + j]) * (1.0 - w) + f64::from(incoming) * w;
            out[seam + j] = blended as Sample;
        }
        out.extend_from_slice(&buffer[job.context..]);
    }

    debug_assert_eq!(out.len(), total_len);
    out
}

/// Render one span with the per-track work fanned out over rayon, then
/// summed in ascending track-id order
pub(crate) fn render_span_parallel(
    snapshot: &MixSnapshot,
    base_seed: u64,
    start: usize,
    len: usize,
) -> Vec<Sample> {
    let rendered: Vec<Vec<Sample>> = snapshot
        .tracks
        .par_iter()
        .map(|track| render_track_span(track, snapshot.sample_rate.as_f64(), base_seed, start, len))
        .collect();

    sum_in_order(rendered, len)
}

/// Render one span with tracks processed sequentially (worker threads use
/// this to avoid oversubscribing the machine)
pub(crate) fn render_span_sequential(
    snapshot: &MixSnapshot,
    base_seed: u64,
    start: usize,
    len: usize,
) -> Vec<Sample> {
    let rendered: Vec<Vec<Sample>> = snapshot
        .tracks
        .iter()
        .map(|track| render_track_span(track, snapshot.sample_rate.as_f64(), base_seed, start, len))
        .collect();

    sum_in_order(rendered, len)
}

fn sum_in_order(rendered: Vec<Vec<Sample>>, len: usize) -> Vec<Sample> {
    let mut mix = vec![0.0; len];
    for buffer in rendered {
        if buffer.is_empty() {
            continue;
        }
        for (acc, &sample) in mix.iter_mut().zip(&buffer) {
            *acc += sample;
        }
    }
    mix
}

/// Render one track's contribution over a span: positioned noise, one
/// composite-masked bulk FFT, then track gain. Muted tracks contribute
/// nothing (an empty buffer).
fn render_track_span(
    track: &TrackSnapshot,
    sample_rate: f64,
    base_seed: u64,
    start: usize,
    len: usize,
) -> Vec<Sample> {
    if !track.is_audible() || len == 0 {
        return Vec::new();
    }

    let mut buffer = vec![0.0; len];
    OfflineNoise::for_track(base_seed, track.id, start as u64).fill(&mut buffer);

    let filters: Vec<_> = track.enabled_filters().collect();
    if !filters.is_empty() {
        apply_bulk_filters(&mut buffer, &filters, sample_rate);
    }

    if track.gain != 1.0 {
        let gain = track.gain;
        for sample in buffer.iter_mut() {
            *sample = (f64::from(*sample) * gain) as Sample;
        }
    }

    buffer
}

/// Apply the composite of the given filters via a single bulk FFT sized to
/// the next power of two at or above the buffer length
fn apply_bulk_filters(
    buffer: &mut [Sample],
    filters: &[&nf_core::FilterConfig],
    sample_rate: f64,
) {
    let fft_len = buffer.len().next_power_of_two().max(2);
    let fft = FftKernel::new(fft_len).expect("power-of-two size");

    let masks: Vec<SpectralMask> = filters
        .iter()
        .map(|config| SpectralMask::compute(config, fft_len, sample_rate))
        .collect();
    let composite = SpectralMask::composite(masks.iter(), fft_len);

    let mut re = vec![0.0f64; fft_len];
    let mut im = vec![0.0f64; fft_len];
    for (slot, &sample) in re.iter_mut().zip(buffer.iter()) {
        *slot = f64::from(sample);
    }

    fft.forward(&mut re, &mut im);
    composite.apply(&mut re, &mut im);
    fft.inverse(&mut re, &mut im);

    for (sample, &value) in buffer.iter_mut().zip(re.iter()) {
        *sample = value as Sample;
    }
}

/// Cancellation flag shared with worker threads
pub(crate) type CancelFlag = Arc<AtomicBool>;

pub(crate) fn cancelled(flag: &CancelFlag) -> bool {
    flag.load(Ordering::Relaxed)
}
