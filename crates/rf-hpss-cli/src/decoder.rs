//! Audio file decoding
//!
//! Uses symphonia, so anything its default registry handles can be
//! separated: WAV, AIFF, FLAC, MP3, OGG Vorbis, AAC/ALAC in M4A.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rf_hpss::Waveform;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded file contents at the file's native rate
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved samples in [-1, 1]
    pub samples: Vec<f64>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Frames per channel
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    /// Split into one waveform per channel
    pub fn into_channels(self) -> Result<Vec<Waveform>> {
        Waveform::deinterleave(&self.samples, self.channels, self.sample_rate)
            .context("Failed to split channels")
    }
}

/// Decode the first audio track of `path`
pub fn decode(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Unsupported or corrupt audio file: {}", path.display()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found")?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .context("Failed to create decoder")?;

    let mut sample_rate = codec_params.sample_rate;
    let mut channels = codec_params.channels.map(|c| c.count());
    let mut samples: Vec<f64> = Vec::new();
    let mut buffer: Option<SampleBuffer<f64>> = None;
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e).context("Failed to read packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                channels.get_or_insert(spec.channels.count());

                let required = decoded.capacity() * spec.channels.count();
                if buffer.as_ref().is_none_or(|b| b.capacity() < required) {
                    buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buf) = buffer.as_mut() {
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt packet; keep going
                skipped_packets += 1;
                log::debug!("Skipping undecodable packet: {}", e);
            }
            Err(e) => return Err(e).context("Decode error"),
        }
    }

    if skipped_packets > 0 {
        log::warn!("{} packets could not be decoded and were skipped", skipped_packets);
    }

    let (Some(sample_rate), Some(channels)) = (sample_rate, channels) else {
        bail!("{} contains no decodable audio", path.display());
    };
    if channels == 0 {
        bail!("{} has no channels", path.display());
    }

    log::info!(
        "Decoded {}: {} ch, {} Hz, {} frames",
        path.display(),
        channels,
        sample_rate,
        samples.len() / channels
    );

    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
    })
}
