//! Mono waveform container and channel (de)interleaving

use crate::error::{HpssError, HpssResult};

/// Mono sample sequence at a fixed sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl Waveform {
    /// Create waveform; the sample rate must be positive
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> HpssResult<Self> {
        if sample_rate == 0 {
            return Err(HpssError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Samples
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Take ownership of the samples
    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the waveform holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Split interleaved frames into one waveform per channel.
    ///
    /// A trailing partial frame is dropped.
    pub fn deinterleave(
        interleaved: &[f64],
        channels: usize,
        sample_rate: u32,
    ) -> HpssResult<Vec<Waveform>> {
        if channels == 0 {
            return Err(HpssError::InvalidParameters(
                "channel count must be at least 1".to_string(),
            ));
        }

        let frames = interleaved.len() / channels;
        let mut planes = vec![Vec::with_capacity(frames); channels];
        for frame in interleaved.chunks_exact(channels) {
            for (plane, &sample) in planes.iter_mut().zip(frame) {
                plane.push(sample);
            }
        }

        planes
            .into_iter()
            .map(|samples| Waveform::new(samples, sample_rate))
            .collect()
    }

    /// Interleave channels into one buffer.
    ///
    /// Shorter channels are zero-padded to the longest one.
    pub fn interleave(channels: &[Waveform]) -> Vec<f64> {
        let frames = channels.iter().map(Waveform::len).max().unwrap_or(0);
        let mut out = Vec::with_capacity(frames * channels.len());
        for i in 0..frames {
            for ch in channels {
                out.push(ch.samples.get(i).copied().unwrap_or(0.0));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert_eq!(
            Waveform::new(vec![0.0; 4], 0),
            Err(HpssError::InvalidSampleRate(0))
        );
    }

    #[test]
    fn test_deinterleave_stereo() {
        let interleaved = [1.0, -1.0, 2.0, -2.0, 3.0, -3.0, 4.0];
        let channels = Waveform::deinterleave(&interleaved, 2, 48000).unwrap();

        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].samples(), &[1.0, 2.0, 3.0]);
        assert_eq!(channels[1].samples(), &[-1.0, -2.0, -3.0]);
        assert_eq!(channels[1].sample_rate(), 48000);

        let back = Waveform::interleave(&channels);
        assert_eq!(back, interleaved[..6].to_vec());
    }

    #[test]
    fn test_interleave_pads_short_channel() {
        let a = Waveform::new(vec![1.0, 2.0], 44100).unwrap();
        let b = Waveform::new(vec![5.0], 44100).unwrap();
        assert_eq!(Waveform::interleave(&[a, b]), vec![1.0, 5.0, 2.0, 0.0]);
    }

    #[test]
    fn test_deinterleave_zero_channels() {
        assert!(matches!(
            Waveform::deinterleave(&[0.0; 4], 0, 44100),
            Err(HpssError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_duration() {
        let w = Waveform::new(vec![0.0; 22050], 44100).unwrap();
        assert!((w.duration_secs() - 0.5).abs() < 1e-12);
    }
}
