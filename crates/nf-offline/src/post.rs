//! Post-processing: fades, peak normalization, clip sequencing
//!
//! Applied after all chunks are assembled, to the full signal. Per-clip
//! normalization is the one exception: it runs on each clip before
//! concatenation (the fade envelope always sees the assembled signal).

use nf_core::{ClipPlan, ExportSettings, FadeOrder, Sample, SampleRate};

/// Power-law raised-cosine fade envelope value for sample `i` in a buffer
/// of length `len`. When the fade regions would overlap (`f_in + f_out >=
/// len`), both lengths are rescaled by `(len - 1) / (f_in + f_out)` first.
pub fn fade_envelope(
    i: usize,
    len: usize,
    fade_in: usize,
    fade_out: usize,
    power_in: f64,
    power_out: f64,
) -> f64 {
    if len == 0 {
        return 1.0;
    }

    let (fade_in, fade_out) = if fade_in + fade_out >= len && fade_in + fade_out > 0 {
        let scale = (len - 1) as f64 / (fade_in + fade_out) as f64;
        (
            (fade_in as f64 * scale) as usize,
            (fade_out as f64 * scale) as usize,
        )
    } else {
        (fade_in, fade_out)
    };

    if fade_in > 0 && i < fade_in {
        let raised = 0.5 * (1.0 - (std::f64::consts::PI * i as f64 / fade_in as f64).cos());
        raised.powf(power_in)
    } else if fade_out > 0 && i >= len - fade_out {
        let t = (len - 1 - i) as f64 / fade_out as f64;
        let raised = 0.5 * (1.0 - (std::f64::consts::PI * t).cos());
        raised.powf(power_out)
    } else {
        1.0
    }
}

/// Apply the fade envelope from `settings` to the whole buffer in place
pub fn apply_fades(buffer: &mut [Sample], settings: &ExportSettings) {
    let fade_in = settings.fade_in_samples();
    let fade_out = settings.fade_out_samples();
    if fade_in == 0 && fade_out == 0 {
        return;
    }

    let len = buffer.len();
    for (i, sample) in buffer.iter_mut().enumerate() {
        let env = fade_envelope(
            i,
            len,
            fade_in,
            fade_out,
            settings.fade_in_power,
            settings.fade_out_power,
        );
        *sample = (f64::from(*sample) * env) as Sample;
    }
}

/// Peak-normalize to `target` in place. All-zero input passes through.
/// The peak sample lands on the target exactly: each sample is scaled as
/// `(x / peak) * target`, which maps the peak itself to `1.0 * target`.
pub fn normalize_peak(buffer: &mut [Sample], target: f64) {
    let peak = buffer.iter().fold(0.0f32, |a, &x| a.max(x.abs()));
    if peak == 0.0 {
        return;
    }
    let peak = f64::from(peak);
    for sample in buffer.iter_mut() {
        *sample = ((f64::from(*sample) / peak) * target) as Sample;
    }
}

/// Apply fades and (optional) global normalization in the configured order
pub fn post_process(buffer: &mut [Sample], settings: &ExportSettings) {
    match settings.fade_order {
        FadeOrder::FadeThenNormalize => {
            apply_fades(buffer, settings);
            if settings.normalize_enabled {
                normalize_peak(buffer, settings.normalize_target);
            }
        }
        FadeOrder::NormalizeThenFade => {
            if settings.normalize_enabled {
                normalize_peak(buffer, settings.normalize_target);
            }
            apply_fades(buffer, settings);
        }
    }
}

/// Concatenate per-clip buffers with inter-clip silence per the plan; if
/// final silence is enabled one more silence block follows the last clip.
pub fn sequence_clips(
    clips: Vec<Vec<Sample>>,
    plan: &ClipPlan,
    sample_rate: SampleRate,
) -> Vec<Sample> {
    let silence = plan.silence_samples(sample_rate);
    let total = plan.total_samples(sample_rate);
    let mut out = Vec::with_capacity(total);

    let clip_count = clips.len();
    for (k, clip) in clips.into_iter().enumerate() {
        out.extend_from_slice(&clip);
        let is_last = k + 1 == clip_count;
        if silence > 0 && (!is_last || plan.final_silence_enabled) {
            out.resize(out.len() + silence, 0.0);
        }
    }

    out
}
