use crate::models::media::AudioChunk;

/// Pure-math conversion of microphone buffers into the audio track's
/// sample format.
///
/// Microphone chunks arrive as interleaved f32 at whatever rate and channel
/// count the capture stack negotiated. The audio track stores interleaved
/// 16-bit PCM at the configured rate and channel count.
#[derive(Debug, Clone)]
pub struct PcmFormatter {
    pub target_sample_rate: f64,
    pub target_channels: u16,
}

impl PcmFormatter {
    pub fn new(target_sample_rate: f64, target_channels: u16) -> Self {
        Self {
            target_sample_rate,
            target_channels,
        }
    }

    /// Conform channels, resample, and encode as little-endian 16-bit PCM.
    pub fn format(&self, samples: &[f32], channels: u16, sample_rate: f64) -> Vec<u8> {
        let conformed = self.conform_channels(samples, channels);
        let resampled = if self.target_channels >= 2 {
            self.resample_stereo(&conformed, sample_rate)
        } else {
            self.resample(&conformed, sample_rate)
        };
        convert_to_int16_pcm(&resampled)
    }

    /// Bring interleaved input to the target channel count.
    ///
    /// Mono is duplicated into both stereo channels; anything wider is
    /// averaged down to mono first.
    pub fn conform_channels(&self, samples: &[f32], channels: u16) -> Vec<f32> {
        let channels = channels.max(1);
        if channels == self.target_channels {
            return samples.to_vec();
        }
        let mono = downmix_to_mono(samples, channels as usize);
        if self.target_channels >= 2 {
            interleave(&mono, &mono)
        } else {
            mono
        }
    }

    /// Stretch a mono mic buffer from its capture rate to the track rate.
    pub fn resample(&self, samples: &[f32], source_sample_rate: f64) -> Vec<f32> {
        self.resample_frames(samples, 1, source_sample_rate)
    }

    /// Stretch an interleaved stereo mic buffer to the track rate. Left and
    /// right are interpolated independently.
    pub fn resample_stereo(&self, samples: &[f32], source_sample_rate: f64) -> Vec<f32> {
        self.resample_frames(samples, 2, source_sample_rate)
    }

    /// Linear interpolation over interleaved frames of `channels` samples.
    ///
    /// Capture rates within 0.01 Hz of the track rate are copied as is. A rate
    /// outside [`AudioChunk::SAMPLE_RATE_RANGE`] yields no samples.
    fn resample_frames(&self, samples: &[f32], channels: usize, source_sample_rate: f64) -> Vec<f32> {
        if (source_sample_rate - self.target_sample_rate).abs() < 0.01 {
            return samples.to_vec();
        }
        if !AudioChunk::SAMPLE_RATE_RANGE.contains(&source_sample_rate) {
            return Vec::new();
        }

        let frames: Vec<&[f32]> = samples.chunks_exact(channels).collect();
        let Some(last) = frames.len().checked_sub(1) else {
            return Vec::new();
        };
        let step = source_sample_rate / self.target_sample_rate;
        let output_frames = (frames.len() as f64 / step) as usize;

        let mut output = Vec::with_capacity(output_frames * channels);
        for i in 0..output_frames {
            let position = i as f64 * step;
            let index = (position as usize).min(last);
            let next = (index + 1).min(last);
            let weight = (position - index as f64) as f32;
            for ch in 0..channels {
                let (a, b) = (frames[index][ch], frames[next][ch]);
                output.push(a + (b - a) * weight);
            }
        }
        output
    }
}

/// Interleave two mono channels into stereo `[L0, R0, L1, R1, ...]`.
pub fn interleave(left: &[f32], right: &[f32]) -> Vec<f32> {
    let frame_count = left.len().max(right.len());
    let mut stereo = vec![0.0f32; frame_count * 2];
    for i in 0..frame_count {
        stereo[i * 2] = left.get(i).copied().unwrap_or(0.0);
        stereo[i * 2 + 1] = right.get(i).copied().unwrap_or(0.0);
    }
    stereo
}

/// Downmix interleaved multi-channel audio to mono by averaging channels per frame.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let scale = 1.0 / channels as f32;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// Encode samples as the audio track's little-endian 16-bit PCM, clamping
/// anything outside `[-1.0, 1.0]`.
pub fn convert_to_int16_pcm(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)
        .flat_map(i16::to_le_bytes)
        .collect()
}
