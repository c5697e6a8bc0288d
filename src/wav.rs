//! PCM conversion and WAV encoding for rendered membrane audio.
//!
//! Raw membrane output is physical displacement with no fixed range, so
//! quantization always clamps to [-1, 1] first; callers that want the full
//! range should [`normalize`] before converting.

/// Scale `samples` so their absolute peak equals `peak`. Silence stays silent.
pub fn normalize(samples: &[f64], peak: f64) -> Vec<f64> {
    let max = samples.iter().fold(0.0_f64, |m, &s| m.max(s.abs()));
    if max == 0.0 || !max.is_finite() {
        return samples.to_vec();
    }
    let gain = peak / max;
    samples.iter().map(|&s| s * gain).collect()
}

/// Clamp to [-1, 1] and quantize to 16-bit PCM.
pub fn to_pcm_i16(samples: &[f64]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
        .collect()
}

/// Interleave equally long channels frame by frame (L R L R …).
pub fn interleave(channels: &[Vec<f64>]) -> Vec<f64> {
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(frames * channels.len());
    for i in 0..frames {
        for channel in channels {
            out.push(channel[i]);
        }
    }
    out
}

/// Length of the canonical RIFF/WAVE header written by [`encode_wav`].
pub const HEADER_LEN: usize = 44;

/// Most 16-bit samples (across all channels) one data chunk can describe.
pub const MAX_PCM_SAMPLES: usize = (u32::MAX as usize - 36) / 2;

/// Most channels whose frame size still fits the 16-bit block-align field.
pub const MAX_CHANNELS: u16 = u16::MAX / 2;

/// Encode interleaved 16-bit PCM as a canonical WAV file.
///
/// `samples` holds `channels` values per frame. Callers keep the sample count
/// within [`MAX_PCM_SAMPLES`] and the channel count within [`MAX_CHANNELS`] so
/// every size fits its header field.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    const BYTES_PER_SAMPLE: u16 = 2;
    let block_align = channels * BYTES_PER_SAMPLE;
    let byte_rate = sample_rate.saturating_mul(u32::from(block_align));
    let data_len = samples.len() * usize::from(BYTES_PER_SAMPLE);
    let data_size = data_len as u32;

    let mut buf = Vec::with_capacity(HEADER_LEN + data_len);
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&(BYTES_PER_SAMPLE * 8).to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    buf.extend(samples.iter().flat_map(|s| s.to_le_bytes()));
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(buf: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
    }

    fn u16_at(buf: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([buf[at], buf[at + 1]])
    }

    #[test]
    fn wav_header_valid() {
        let wav = encode_wav(&[0, 1, -1], 48000, 1);

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u16_at(&wav, 20), 1);
        assert_eq!(u16_at(&wav, 22), 1);
        assert_eq!(u32_at(&wav, 24), 48000);
        assert_eq!(u32_at(&wav, 28), 96000);
        assert_eq!(u16_at(&wav, 32), 2);
        assert_eq!(u16_at(&wav, 34), 16);
    }

    #[test]
    fn wav_size_correct() {
        let wav = encode_wav(&vec![0; 441], 44100, 1);
        assert_eq!(u32_at(&wav, 40), 882);
        assert_eq!(u32_at(&wav, 4), 36 + 882);
        assert_eq!(wav.len(), 44 + 882);
    }

    #[test]
    fn stereo_header_and_frames() {
        let pcm = to_pcm_i16(&interleave(&[vec![0.5, 0.25], vec![-0.5, -0.25]]));
        let wav = encode_wav(&pcm, 22050, 2);

        assert_eq!(u16_at(&wav, 22), 2);
        assert_eq!(u32_at(&wav, 24), 22050);
        assert_eq!(u32_at(&wav, 28), 22050 * 4);
        assert_eq!(u16_at(&wav, 32), 4);
        assert_eq!(u32_at(&wav, 40), 8);
        assert_eq!(u32_at(&wav, 4), 36 + 8);
        assert_eq!(wav.len(), HEADER_LEN + 8);

        let frame: Vec<i16> = (0..4).map(|k| u16_at(&wav, 44 + 2 * k) as i16).collect();
        assert_eq!(frame, vec![16384, -16384, 8192, -8192]);
    }

    #[test]
    fn samples_are_little_endian() {
        let wav = encode_wav(&[0x1234, -2], 8000, 1);
        assert_eq!(&wav[44..48], &[0x34, 0x12, 0xFE, 0xFF]);
    }

    #[test]
    fn quantization_clamps_instead_of_wrapping() {
        let pcm = to_pcm_i16(&[0.0, 0.5, 1.0, -1.0, 3.7, -250.0]);
        assert_eq!(pcm, vec![0, 16384, 32767, -32767, 32767, -32767]);
    }

    #[test]
    fn normalize_scales_to_peak() {
        let out = normalize(&[0.01, -0.04, 0.02], 0.8);
        assert!((out[1] + 0.8).abs() < 1e-12);
        assert!((out[0] - 0.2).abs() < 1e-12);
        assert_eq!(normalize(&[0.0, 0.0], 0.8), vec![0.0, 0.0]);
    }

    #[test]
    fn interleave_alternates_channels() {
        let out = interleave(&[vec![1.0, 2.0], vec![-1.0, -2.0]]);
        assert_eq!(out, vec![1.0, -1.0, 2.0, -2.0]);
    }
}
