//! Wire audio codec
//!
//! Converts between f32 samples in `[-1, 1]` and the 16-bit signed
//! little-endian linear PCM the live transport carries, plus the base64
//! wrapping used on the wire. Pure and stateless.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Pack f32 samples as 16-bit signed LE PCM bytes.
///
/// Each sample is multiplied by 32768 and truncated; out-of-range input
/// saturates rather than wrapping.
#[must_use]
pub fn encode_frame(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        #[allow(clippy::cast_possible_truncation)]
        let value = (sample * 32768.0) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Unpack 16-bit signed LE PCM bytes into f32 samples.
///
/// The exact inverse of [`encode_frame`]. A trailing odd byte is ignored;
/// malformed input yields truncated output, never a panic.
#[must_use]
pub fn decode_frame(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect()
}

/// Base64-encode a PCM byte frame for the wire
#[must_use]
pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Base64-decode a wire payload into PCM bytes
///
/// Invalid base64 yields an empty frame (logged by callers as needed).
#[must_use]
pub fn decode_base64(payload: &str) -> Vec<u8> {
    BASE64.decode(payload).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_is_within_pcm16_precision() {
        let original: Vec<f32> = (0..480)
            .map(|i| ((i as f32) * 0.013).sin() * 0.8)
            .collect();

        let recovered = decode_frame(&encode_frame(&original));

        assert_eq!(recovered.len(), original.len());
        for (a, b) in original.iter().zip(recovered.iter()) {
            assert!((a - b).abs() <= 1.0 / 32768.0, "{a} vs {b}");
        }
    }

    #[test]
    fn out_of_range_samples_saturate() {
        let bytes = encode_frame(&[2.0, -2.0]);
        let recovered = decode_frame(&bytes);
        assert!((recovered[0] - (i16::MAX as f32 / 32768.0)).abs() < 1e-6);
        assert!((recovered[1] - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn odd_trailing_byte_is_ignored() {
        let mut bytes = encode_frame(&[0.5, -0.5]);
        bytes.push(0x7f);
        assert_eq!(decode_frame(&bytes).len(), 2);
    }

    #[test]
    fn base64_roundtrip() {
        let bytes = encode_frame(&[0.1, 0.2, 0.3]);
        assert_eq!(decode_base64(&encode_base64(&bytes)), bytes);
    }

    #[test]
    fn invalid_base64_yields_empty_frame() {
        assert!(decode_base64("!!not base64!!").is_empty());
    }
}
