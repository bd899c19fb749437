//! WAV serialization
//!
//! 16-bit little-endian mono PCM with the standard 44-byte RIFF/WAVE
//! header, written into an in-memory byte buffer. The core performs no
//! filesystem writes; emitting the bytes to disk is the host's job.

use std::io::Cursor;

use nf_core::{NfError, NfResult, Sample};

/// Encode mono samples as a complete 16-bit PCM WAV byte buffer.
/// Samples are clamped to [-1, 1] and converted via `round(x * 32767)`.
pub fn encode_wav(samples: &[Sample], sample_rate: u32) -> NfResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut bytes = Vec::with_capacity(44 + samples.len() * 2);
    let cursor = Cursor::new(&mut bytes);
    let mut writer = hound::WavWriter::new(cursor, spec)
        .map_err(|e| NfError::Internal(format!("wav writer: {e}")))?;

    for &sample in samples {
        writer
            .write_sample(sample_to_i16(sample))
            .map_err(|e| NfError::Internal(format!("wav write: {e}")))?;
    }

    writer
        .finalize()
        .map_err(|e| NfError::Internal(format!("wav finalize: {e}")))?;

    Ok(bytes)
}

/// Clamp and convert one sample to PCM16
#[inline]
pub fn sample_to_i16(sample: Sample) -> i16 {
    (f64::from(sample.clamp(-1.0, 1.0)) * 32767.0).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_conversion() {
        assert_eq!(sample_to_i16(0.0), 0);
        assert_eq!(sample_to_i16(1.0), 32767);
        assert_eq!(sample_to_i16(-1.0), -32767);
        assert_eq!(sample_to_i16(2.0), 32767);
        assert_eq!(sample_to_i16(-2.0), -32767);
        // Rounding, not truncation
        assert_eq!(sample_to_i16(0.49999), (0.49999f64 * 32767.0).round() as i16);
    }

    #[test]
    fn test_header_is_44_bytes() {
        let samples = vec![0.0f32; 100];
        let bytes = encode_wav(&samples, 44100).unwrap();
        assert_eq!(bytes.len(), 44 + 100 * 2);

        // RIFF/WAVE magic
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(&bytes[36..40], b"data");
    }

    #[test]
    fn test_header_fields() {
        let samples = vec![0.25f32; 50];
        let bytes = encode_wav(&samples, 48000).unwrap();

        // PCM format 1, mono, 16-bit
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 16);
        // Sample rate and byte rate
        assert_eq!(
            u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
            48000
        );
        assert_eq!(
            u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]),
            48000 * 2
        );
        // Chunk sizes computed exactly
        assert_eq!(
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            36 + 50 * 2
        );
        assert_eq!(
            u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
            50 * 2
        );
    }

    #[test]
    fn test_payload_round_trips() {
        let samples = vec![0.5f32, -0.5, 0.0, 1.0];
        let bytes = encode_wav(&samples, 44100).unwrap();

        let expected: Vec<i16> = samples.iter().map(|&s| sample_to_i16(s)).collect();
        for (i, &value) in expected.iter().enumerate() {
            let offset = 44 + i * 2;
            let actual = i16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
            assert_eq!(actual, value);
        }
    }
}
