//! Float to wire-format PCM conversion.

/// Convert float samples to 16-bit little-endian PCM bytes.
///
/// Samples are clamped to [-1.0, 1.0] before scaling. Negative values scale
/// by 32768 and non-negative by 32767 so both range endpoints are exactly
/// representable (-1.0 → -32768, 1.0 → 32767).
pub fn pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = if clamped < 0.0 {
            (clamped * 32768.0) as i16
        } else {
            (clamped * 32767.0) as i16
        };
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}
