//! End-to-end properties of the streaming STFT path

use nf_core::{FilterConfig, Sample};
use nf_dsp::{
    Lcg31, SharedMask, SpectralMask, StftProcessor, FftKernel, STFT_SIZE,
};

const BLOCK: usize = 128;
const SR: f64 = 44100.0;

fn drive(processor: &mut StftProcessor, input: &[Sample]) -> Vec<Sample> {
    let mut output = vec![0.0; input.len()];
    for (in_block, out_block) in input.chunks(BLOCK).zip(output.chunks_mut(BLOCK)) {
        processor.process_block(in_block, out_block);
    }
    output
}

/// Magnitude spectrum of a signal slice, in dBFS per bin
fn spectrum_db(signal: &[Sample], n: usize) -> Vec<f64> {
    let fft = FftKernel::new(n).unwrap();
    let window = nf_dsp::hann(n);
    let mut re: Vec<f64> = signal[..n]
        .iter()
        .zip(&window)
        .map(|(&s, &w)| f64::from(s) * w)
        .collect();
    let mut im = vec![0.0; n];
    fft.forward(&mut re, &mut im);

    let scale = 2.0 / window.iter().sum::<f64>();
    (0..n / 2)
        .map(|i| {
            let mag = (re[i] * re[i] + im[i] * im[i]).sqrt() * scale;
            20.0 * mag.max(1e-12).log10()
        })
        .collect()
}

/// Average dB over the bins covering [lo, hi] Hz
fn band_mean_db(spectrum: &[f64], n: usize, lo: f64, hi: f64) -> f64 {
    let lo_bin = (lo * n as f64 / SR).ceil() as usize;
    let hi_bin = (hi * n as f64 / SR).floor() as usize;
    let band = &spectrum[lo_bin..=hi_bin];
    band.iter().sum::<f64>() / band.len() as f64
}

#[test]
fn streaming_identity_with_unity_mask_on_noise() {
    let mut processor = StftProcessor::default();
    let mut noise = Lcg31::new(20250412);
    let mut input = vec![0.0; STFT_SIZE * 6];
    noise.fill(&mut input);

    let output = drive(&mut processor, &input);

    for i in STFT_SIZE..4 * STFT_SIZE {
        let expected = input[i];
        let actual = output[i + STFT_SIZE];
        assert!(
            (actual - expected).abs() < 1e-4,
            "sample {i}: {expected} vs {actual}"
        );
    }
}

#[test]
fn plateau_passband_is_transparent_and_stopband_is_silent() {
    // One plateau filter: center 1000, width 400, flat 200, 0 dB; 1 s of
    // uniform noise. In-band spectrum matches the input within 0.1 dB on
    // average; outside the skirt the output is below -60 dBFS.
    let config = FilterConfig::Plateau {
        center_freq: 1000.0,
        width: 400.0,
        gain_db: 0.0,
        flat_width: 200.0,
    };
    let mask = SharedMask::new(SpectralMask::compute(&config, STFT_SIZE, SR));
    let mut processor = StftProcessor::new(mask);

    let len = SR as usize;
    let mut input = vec![0.0; len + 2 * STFT_SIZE];
    Lcg31::new(99).fill(&mut input);

    let output = drive(&mut processor, &input);
    let settled_in = &input[STFT_SIZE..];
    let settled_out = &output[2 * STFT_SIZE..];

    // Average several analysis frames for a stable spectral estimate
    let frames = 8;
    let n = STFT_SIZE;
    let mut in_db_sum = vec![0.0; n / 2];
    let mut out_db_sum = vec![0.0; n / 2];
    for k in 0..frames {
        let offset = k * n;
        for (acc, v) in in_db_sum
            .iter_mut()
            .zip(spectrum_db(&settled_in[offset..], n))
        {
            *acc += v;
        }
        for (acc, v) in out_db_sum
            .iter_mut()
            .zip(spectrum_db(&settled_out[offset..], n))
        {
            *acc += v;
        }
    }
    let in_db: Vec<f64> = in_db_sum.iter().map(|v| v / frames as f64).collect();
    let out_db: Vec<f64> = out_db_sum.iter().map(|v| v / frames as f64).collect();

    // Flat region [900, 1100]: input magnitude preserved within 0.1 dB avg
    let in_band = band_mean_db(&in_db, n, 900.0, 1100.0);
    let out_band = band_mean_db(&out_db, n, 900.0, 1100.0);
    assert!(
        (in_band - out_band).abs() < 0.1,
        "in-band delta {} dB",
        in_band - out_band
    );

    // Stopband: below -60 dBFS everywhere outside [800, 1200]
    let out_low = band_mean_db(&out_db, n, 100.0, 700.0);
    let out_high = band_mean_db(&out_db, n, 1400.0, 10000.0);
    assert!(out_low < -60.0, "low stopband {out_low} dBFS");
    assert!(out_high < -60.0, "high stopband {out_high} dBFS");
}

#[test]
fn six_db_gain_shifts_passband_by_six_db() {
    let len = SR as usize;
    let mut input = vec![0.0; len + 2 * STFT_SIZE];
    Lcg31::new(99).fill(&mut input);

    let mut band_levels = Vec::new();
    for gain_db in [0.0, 6.0] {
        let config = FilterConfig::Plateau {
            center_freq: 1000.0,
            width: 400.0,
            gain_db,
            flat_width: 200.0,
        };
        let mask = SharedMask::new(SpectralMask::compute(&config, STFT_SIZE, SR));
        let mut processor = StftProcessor::new(mask);
        let output = drive(&mut processor, &input);
        let settled = &output[2 * STFT_SIZE..];

        let n = STFT_SIZE;
        let frames = 8;
        let mut db_sum = vec![0.0; n / 2];
        for k in 0..frames {
            for (acc, v) in db_sum.iter_mut().zip(spectrum_db(&settled[k * n..], n)) {
                *acc += v;
            }
        }
        let db: Vec<f64> = db_sum.iter().map(|v| v / frames as f64).collect();
        band_levels.push(band_mean_db(&db, n, 900.0, 1100.0));
    }

    let delta = band_levels[1] - band_levels[0];
    assert!((delta - 6.0).abs() < 0.1, "gain delta {delta} dB");
}
