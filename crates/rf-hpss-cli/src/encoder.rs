//! WAV output via hound

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use rf_hpss::Waveform;

/// Output sample format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BitDepth {
    /// 16-bit integer PCM
    #[value(name = "16")]
    Int16,
    /// 24-bit integer PCM
    #[default]
    #[value(name = "24")]
    Int24,
    /// 32-bit IEEE float
    #[value(name = "32")]
    Float32,
}

impl BitDepth {
    fn spec(self, channels: u16, sample_rate: u32) -> hound::WavSpec {
        let (bits_per_sample, sample_format) = match self {
            BitDepth::Int16 => (16, hound::SampleFormat::Int),
            BitDepth::Int24 => (24, hound::SampleFormat::Int),
            BitDepth::Float32 => (32, hound::SampleFormat::Float),
        };
        hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

/// Write `channels` as one interleaved WAV file.
///
/// Samples outside [-1, 1] are clipped for integer formats.
pub fn write_wav(path: &Path, channels: &[Waveform], bit_depth: BitDepth) -> Result<()> {
    let Some(first) = channels.first() else {
        bail!("Nothing to write to {}", path.display());
    };
    let channel_count = u16::try_from(channels.len()).context("Too many channels for WAV")?;
    let spec = bit_depth.spec(channel_count, first.sample_rate());

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let interleaved = Waveform::interleave(channels);
    let peak = interleaved.iter().fold(0.0f64, |m, s| m.max(s.abs()));
    if peak > 1.0 && bit_depth != BitDepth::Float32 {
        log::warn!(
            "{}: peak {:.2} exceeds full scale and will be clipped",
            path.display(),
            peak
        );
    }

    match bit_depth {
        BitDepth::Int16 => {
            for &sample in &interleaved {
                writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)?;
            }
        }
        BitDepth::Int24 => {
            for &sample in &interleaved {
                writer.write_sample((sample.clamp(-1.0, 1.0) * 8_388_607.0) as i32)?;
            }
        }
        BitDepth::Float32 => {
            for &sample in &interleaved {
                writer.write_sample(sample as f32)?;
            }
        }
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finalize {}", path.display()))?;

    log::debug!(
        "Wrote {} ({} ch, {} Hz, {:?})",
        path.display(),
        channels.len(),
        first.sample_rate(),
        bit_depth
    );
    Ok(())
}
