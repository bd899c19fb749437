//! Export orchestration
//!
//! Renders a clip plan against a mix snapshot, applies per-clip and global
//! post-processing, and serializes to byte buffers. No filesystem writes
//! happen here; failed or cancelled exports produce no output at all.

use nf_core::{ClipPlan, ExportSettings, NfResult, NormalizeScope, Sample};

use crate::cheader::emit_c_header;
use crate::post::{post_process, normalize_peak, sequence_clips};
use crate::progress::{ProgressFn, RenderPhase, RenderProgress};
use crate::render::{OfflineRenderer, RenderOptions};
use crate::wav::encode_wav;

/// A finished export: the assembled signal plus serializers
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub samples: Vec<Sample>,
    pub sample_rate: u32,
    /// Per-clip rendered buffers, post-processed, for the C-header emitter
    clips: Vec<Vec<Sample>>,
    /// Mono inter-clip silence length
    silence_samples: usize,
}

impl ExportResult {
    /// Peak level of the assembled signal for presentation; an all-zero
    /// export reads as explicitly silent rather than a dB sentinel
    pub fn peak_level(&self) -> nf_core::Level {
        let peak = self.samples.iter().fold(0.0f32, |a, &x| a.max(x.abs()));
        nf_core::Level::from_gain(f64::from(peak))
    }

    /// Complete WAV file as bytes
    pub fn to_wav(&self) -> NfResult<Vec<u8>> {
        encode_wav(&self.samples, self.sample_rate)
    }

    /// C header with one `int16_t` array per clip
    pub fn to_c_header(&self, file_name: &str) -> String {
        emit_c_header(file_name, self.sample_rate, &self.clips, self.silence_samples)
    }
}

/// Clip-plan exporter over an offline renderer
pub struct Exporter {
    renderer: OfflineRenderer,
}

impl Exporter {
    pub fn new(snapshot: nf_core::MixSnapshot, options: RenderOptions) -> Self {
        Self {
            renderer: OfflineRenderer::new(snapshot, options),
        }
    }

    /// Render and post-process the full clip plan.
    ///
    /// Clips are consecutive spans of the render timeline. With per-clip
    /// normalization scope each clip is normalized before concatenation;
    /// the fade envelope always applies to the assembled signal, ordered
    /// against global normalization by `fade_order`.
    pub fn export(
        &self,
        plan: &ClipPlan,
        settings: &ExportSettings,
        progress: &mut ProgressFn<'_>,
    ) -> NfResult<ExportResult> {
        let sample_rate = self.renderer.snapshot().sample_rate;
        let clip_samples = plan.clip_samples(sample_rate);

        let mut clips = Vec::with_capacity(plan.clip_count);
        for clip in 0..plan.clip_count {
            let start = clip * clip_samples;
            // Scale clip-level reports into an overall clip_count-sized
            // progress space
            let mut scaled = |p: RenderProgress| {
                let overall = (clip * p.chunks_total + p.chunks_completed).min(
                    plan.clip_count * p.chunks_total.max(1),
                );
                progress(RenderProgress::new(
                    p.phase,
                    overall,
                    plan.clip_count * p.chunks_total.max(1),
                ))
            };
            let mut buffer = self.renderer.render(start, clip_samples, &mut scaled)?;

            if settings.normalize_enabled && settings.normalize_scope == NormalizeScope::PerClip {
                normalize_peak(&mut buffer, settings.normalize_target);
            }
            clips.push(buffer);
        }

        if !progress(RenderProgress::new(
            RenderPhase::Finalizing,
            plan.clip_count,
            plan.clip_count.max(1),
        )) {
            return Err(nf_core::NfError::Cancelled);
        }

        let mut samples = sequence_clips(clips.clone(), plan, sample_rate);

        // Global post-processing; with per-clip scope normalization has
        // already happened, so only the fades remain
        let mut effective = *settings;
        if settings.normalize_scope == NormalizeScope::PerClip {
            effective.normalize_enabled = false;
        }
        post_process(&mut samples, &effective);

        Ok(ExportResult {
            samples,
            sample_rate: sample_rate.as_u32(),
            clips,
            silence_samples: plan.silence_samples(sample_rate),
        })
    }
}
