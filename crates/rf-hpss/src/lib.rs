//! ReelForge HPSS - harmonic-percussive source separation
//!
//! Splits a waveform into a sustained/tonal part and a transient/percussive
//! part whose sum approximates the input:
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │ Waveform │ → │ STFT forward │ → │ Median filters   │ → │ 2× STFT      │
//! │          │   │ (window+FFT) │   │ time / frequency │   │ inverse (OLA)│
//! └──────────┘   └──────────────┘   │ → soft masks     │   └──────────────┘
//!                                   └──────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rf_hpss::{separate, HpssConfig, Waveform};
//!
//! let input = Waveform::new(samples, 44100)?;
//! let components = separate(&input, &HpssConfig::default())?;
//! let (harmonic, percussive) = components.into_tuple();
//! ```
//!
//! The core performs no I/O. Long inputs should be separated off any
//! interactive thread; pass a [`CancelToken`] to stop early.

#![warn(missing_docs)]

pub mod mask;
pub mod median;
pub mod stft;
pub mod window;

mod cancel;
mod config;
mod error;
mod waveform;

pub use cancel::CancelToken;
pub use config::HpssConfig;
pub use error::{HpssError, HpssResult};
pub use mask::{MaskPair, MedianMasker};
pub use stft::{MagnitudeGrid, Spectrogram, StftProcessor};
pub use waveform::Waveform;
pub use window::WindowFunction;

use rayon::prelude::*;
use std::time::Instant;

/// Separated components of one waveform
#[derive(Debug, Clone, PartialEq)]
pub struct HpssComponents {
    /// Sustained/tonal component
    pub harmonic: Waveform,
    /// Transient/percussive component
    pub percussive: Waveform,
}

impl HpssComponents {
    /// `(harmonic, percussive)`
    pub fn into_tuple(self) -> (Waveform, Waveform) {
        (self.harmonic, self.percussive)
    }
}

/// Validated, FFT-planned separator.
///
/// Immutable once built; one instance can serve any number of calls from any
/// number of threads.
pub struct HpssSeparator {
    config: HpssConfig,
    stft: StftProcessor,
    masker: MedianMasker,
}

impl HpssSeparator {
    /// Validate the configuration and plan the transforms
    pub fn new(config: HpssConfig) -> HpssResult<Self> {
        config.validate()?;
        let stft = StftProcessor::new(config.window_size, config.hop(), config.window)?;
        let masker = MedianMasker::from_config(&config)?;
        Ok(Self {
            config,
            stft,
            masker,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &HpssConfig {
        &self.config
    }

    /// Separate one waveform
    pub fn separate(&self, waveform: &Waveform) -> HpssResult<HpssComponents> {
        self.separate_with_cancel(waveform, &CancelToken::new())
    }

    /// Separate one waveform, checking `cancel` at every frame.
    ///
    /// The waveform is zero-padded by half a window in front and half a window
    /// plus one hop behind, and both outputs are cropped back, so every input
    /// sample lies near the centre of some frame.
    pub fn separate_with_cancel(
        &self,
        waveform: &Waveform,
        cancel: &CancelToken,
    ) -> HpssResult<HpssComponents> {
        let start = Instant::now();

        let window_size = self.stft.window_size();
        if waveform.len() < window_size {
            return Err(HpssError::InsufficientSamples {
                required: window_size,
                actual: waveform.len(),
            });
        }

        let (lead, trail) = self.edge_padding();
        let mut padded = Vec::with_capacity(lead + waveform.len() + trail);
        padded.resize(lead, 0.0);
        padded.extend_from_slice(waveform.samples());
        padded.resize(padded.len() + trail, 0.0);
        let padded = Waveform::new(padded, waveform.sample_rate())?;

        let spectrogram = self.stft.forward(&padded, cancel)?;
        cancel.check()?;

        let (harmonic_spec, percussive_spec) = self.masker.separate(&spectrogram)?;
        cancel.check()?;

        let padded_len = padded.len();
        let (harmonic, percussive) = rayon::join(
            || self.stft.inverse(&harmonic_spec, padded_len, cancel),
            || self.stft.inverse(&percussive_spec, padded_len, cancel),
        );

        let components = HpssComponents {
            harmonic: crop(harmonic?, lead, waveform.len())?,
            percussive: crop(percussive?, lead, waveform.len())?,
        };

        log::debug!(
            "HPSS: {} samples @ {} Hz, {} bins x {} frames in {:.1} ms",
            waveform.len(),
            waveform.sample_rate(),
            spectrogram.bins(),
            spectrogram.frames(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(components)
    }

    /// `(lead, trail)` zero samples added around the input
    fn edge_padding(&self) -> (usize, usize) {
        let half = self.stft.window_size() / 2;
        (half, half + self.stft.hop_size())
    }

    /// Separate every channel independently.
    ///
    /// Channels must share one sample rate. Results are in channel order.
    pub fn separate_channels(
        &self,
        channels: &[Waveform],
        cancel: &CancelToken,
    ) -> HpssResult<Vec<HpssComponents>> {
        if let Some(first) = channels.first() {
            let sample_rate = first.sample_rate();
            if let Some(other) = channels.iter().find(|c| c.sample_rate() != sample_rate) {
                return Err(HpssError::InvalidParameters(format!(
                    "channel sample rates differ: {} Hz vs {} Hz",
                    sample_rate,
                    other.sample_rate()
                )));
            }
        }

        channels
            .par_iter()
            .map(|channel| self.separate_with_cancel(channel, cancel))
            .collect()
    }
}

/// `len` samples of `padded` starting at `lead`
fn crop(padded: Waveform, lead: usize, len: usize) -> HpssResult<Waveform> {
    let sample_rate = padded.sample_rate();
    let mut samples = padded.into_samples();
    samples.drain(..lead);
    samples.truncate(len);
    Waveform::new(samples, sample_rate)
}

/// Separate `waveform` into harmonic and percussive components
pub fn separate(waveform: &Waveform, config: &HpssConfig) -> HpssResult<HpssComponents> {
    HpssSeparator::new(config.clone())?.separate(waveform)
}

/// [`separate`] with cooperative cancellation
pub fn separate_with_cancel(
    waveform: &Waveform,
    config: &HpssConfig,
    cancel: &CancelToken,
) -> HpssResult<HpssComponents> {
    HpssSeparator::new(config.clone())?.separate_with_cancel(waveform, cancel)
}

/// Separate every channel of a multi-channel signal
pub fn separate_channels(
    channels: &[Waveform],
    config: &HpssConfig,
    cancel: &CancelToken,
) -> HpssResult<Vec<HpssComponents>> {
    HpssSeparator::new(config.clone())?.separate_channels(channels, cancel)
}
