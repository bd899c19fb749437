//! C header emitter
//!
//! Emits rendered clips as `int16_t` arrays in an ASCII header file with
//! LF line endings, for firmware builds that play the buffers from flash.
//! Layout: include guard derived from the file name, size macros, one
//! `bufferN` array per clip (eight six-char right-justified values per
//! line, trailing comma on all but the final row), a zeroed
//! `silenceBuffer`, and a `noiseBuffers` pointer table.

use std::fmt::Write;

use nf_core::Sample;

use crate::wav::sample_to_i16;

/// Values per emitted row
const VALUES_PER_ROW: usize = 8;

/// Derive the include guard from a file name: `noise_buffers.h` becomes
/// `NOISE_BUFFERS_H`
pub fn include_guard(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Emit a complete C header for the given clips. All clips must share one
/// length (`MONO_SAMPLES`). `silence_samples` is the mono inter-clip
/// silence length; the emitted macros and `silenceBuffer` use the stereo
/// (doubled) count for output-side compatibility even though the emitted
/// arrays are mono.
pub fn emit_c_header(
    file_name: &str,
    sample_rate: u32,
    clips: &[Vec<Sample>],
    silence_samples: usize,
) -> String {
    let guard = include_guard(file_name);
    let mono_samples = clips.first().map_or(0, |c| c.len());
    let stereo_silence = silence_samples * 2;

    let mut out = String::new();

    writeln!(out, "#ifndef {guard}").unwrap();
    writeln!(out, "#define {guard}").unwrap();
    out.push('\n');
    writeln!(out, "#include <stdint.h>").unwrap();
    out.push('\n');
    writeln!(out, "#define SAMPLE_RATE {sample_rate}").unwrap();
    writeln!(out, "#define NUM_BUFFERS {}", clips.len()).unwrap();
    writeln!(out, "#define MONO_SAMPLES {mono_samples}").unwrap();
    // Buffers are mono int16; the stereo count is kept for players that
    // address interleaved frames
    writeln!(out, "#define STEREO_SAMPLES {}", mono_samples * 2).unwrap();
    writeln!(out, "#define SILENCE_SAMPLES {stereo_silence}").unwrap();
    out.push('\n');

    for (index, clip) in clips.iter().enumerate() {
        writeln!(out, "const int16_t buffer{}[MONO_SAMPLES] = {{", index + 1).unwrap();
        emit_rows(&mut out, clip);
        writeln!(out, "}};").unwrap();
        out.push('\n');
    }

    writeln!(out, "const int16_t silenceBuffer[SILENCE_SAMPLES] = {{0}};").unwrap();
    out.push('\n');

    writeln!(out, "const int16_t* noiseBuffers[NUM_BUFFERS] = {{").unwrap();
    for index in 0..clips.len() {
        let separator = if index + 1 == clips.len() { "" } else { "," };
        writeln!(out, "    buffer{}{separator}", index + 1).unwrap();
    }
    writeln!(out, "}};").unwrap();
    out.push('\n');
    writeln!(out, "#endif /* {guard} */").unwrap();

    out
}

/// Emit sample rows: eight six-char right-justified values per line,
/// comma-separated, trailing comma on all but the final row
fn emit_rows(out: &mut String, clip: &[Sample]) {
    let rows = clip.chunks(VALUES_PER_ROW).count();
    for (row_index, row) in clip.chunks(VALUES_PER_ROW).enumerate() {
        let mut line = String::with_capacity(VALUES_PER_ROW * 7 + 2);
        line.push_str("    ");
        for (i, &sample) in row.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            write!(line, "{:6}", sample_to_i16(sample)).unwrap();
        }
        if row_index + 1 < rows {
            line.push(',');
        }
        out.push_str(&line);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_guard() {
        assert_eq!(include_guard("noise_buffers.h"), "NOISE_BUFFERS_H");
        assert_eq!(include_guard("my-export.v2.h"), "MY_EXPORT_V2_H");
    }

    #[test]
    fn test_header_structure() {
        let clips = vec![vec![0.5f32; 20], vec![-0.5f32; 20]];
        let header = emit_c_header("noise_buffers.h", 44100, &clips, 100);

        assert!(header.starts_with("#ifndef NOISE_BUFFERS_H\n"));
        assert!(header.contains("#define SAMPLE_RATE 44100\n"));
        assert!(header.contains("#define NUM_BUFFERS 2\n"));
        assert!(header.contains("#define MONO_SAMPLES 20\n"));
        assert!(header.contains("#define STEREO_SAMPLES 40\n"));
        assert!(header.contains("#define SILENCE_SAMPLES 200\n"));
        assert!(header.contains("const int16_t buffer1[MONO_SAMPLES] = {"));
        assert!(header.contains("const int16_t buffer2[MONO_SAMPLES] = {"));
        assert!(header.contains("const int16_t silenceBuffer[SILENCE_SAMPLES] = {0};"));
        assert!(header.contains("const int16_t* noiseBuffers[NUM_BUFFERS] = {"));
        assert!(header.ends_with("#endif /* NOISE_BUFFERS_H */\n"));
        // ASCII, LF-only
        assert!(header.is_ascii());
        assert!(!header.contains('\r'));
    }

    #[test]
    fn test_rows_are_eight_wide_with_six_char_values() {
        let clip: Vec<Sample> = (0..20).map(|i| i as f32 / 100.0).collect();
        let header = emit_c_header("x.h", 48000, &[clip], 0);

        let body: Vec<&str> = header
            .lines()
            .skip_while(|l| !l.contains("buffer1"))
            .skip(1)
            .take_while(|l| !l.starts_with("};"))
            .collect();
        assert_eq!(body.len(), 3); // 8 + 8 + 4 values

        // Full rows carry eight values and a trailing comma
        assert_eq!(body[0].matches(',').count(), VALUES_PER_ROW);
        assert!(body[0].ends_with(','));
        assert!(body[1].ends_with(','));
        // Final row has no trailing comma
        assert!(!body[2].ends_with(','));
        assert_eq!(body[2].matches(',').count(), 3);

        // Values are right-justified to width six
        let first_value = sample_to_i16(0.0);
        assert!(body[0].starts_with(&format!("    {first_value:6},")));
    }

    #[test]
    fn test_values_round_like_wav_path() {
        let clip = vec![1.0f32, -1.0, 0.0];
        let header = emit_c_header("x.h", 44100, &[clip], 0);
        assert!(header.contains(" 32767"));
        assert!(header.contains("-32767"));
    }
}
