//! Separation configuration

use crate::error::{HpssError, HpssResult};
use crate::window::WindowFunction;
use serde::{Deserialize, Serialize};

/// Harmonic-percussive separation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HpssConfig {
    /// STFT window length (samples)
    pub window_size: usize,
    /// Frame advance (samples); `None` = window_size / 4
    pub hop_size: Option<usize>,
    /// Analysis/synthesis window
    pub window: WindowFunction,
    /// Time-axis median length (frames, odd)
    pub harmonic_median_length: usize,
    /// Frequency-axis median length (bins, odd)
    pub percussive_median_length: usize,
    /// Mask contrast exponent
    pub sharpness: f64,
}

impl Default for HpssConfig {
    fn default() -> Self {
        Self {
            window_size: 2048,
            hop_size: None,
            window: WindowFunction::Hann,
            harmonic_median_length: 17,
            percussive_median_length: 17,
            sharpness: 2.0,
        }
    }
}

impl HpssConfig {
    /// 31-frame / 31-bin kernels: smoother separation, slower
    pub fn wide_kernels() -> Self {
        Self {
            harmonic_median_length: 31,
            percussive_median_length: 31,
            ..Default::default()
        }
    }

    /// Effective hop size
    pub fn hop(&self) -> usize {
        self.hop_size.unwrap_or(self.window_size / 4)
    }

    /// Set window size
    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    /// Set hop size
    pub fn with_hop_size(mut self, hop: usize) -> Self {
        self.hop_size = Some(hop);
        self
    }

    /// Set window function
    pub fn with_window(mut self, window: WindowFunction) -> Self {
        self.window = window;
        self
    }

    /// Set harmonic (time) and percussive (frequency) median lengths
    pub fn with_median_lengths(mut self, harmonic: usize, percussive: usize) -> Self {
        self.harmonic_median_length = harmonic;
        self.percussive_median_length = percussive;
        self
    }

    /// Set mask sharpness
    pub fn with_sharpness(mut self, sharpness: f64) -> Self {
        self.sharpness = sharpness;
        self
    }

    /// Check every precondition before any work is done
    pub fn validate(&self) -> HpssResult<()> {
        validate_frame_params(self.window_size, self.hop())?;
        validate_median_length("harmonic_median_length", self.harmonic_median_length)?;
        validate_median_length("percussive_median_length", self.percussive_median_length)?;
        validate_sharpness(self.sharpness)
    }
}

pub(crate) fn validate_frame_params(window_size: usize, hop_size: usize) -> HpssResult<()> {
    if window_size == 0 {
        return Err(HpssError::InvalidParameters(
            "window_size must be positive".to_string(),
        ));
    }
    if hop_size == 0 || hop_size > window_size {
        return Err(HpssError::InvalidParameters(format!(
            "hop_size must be in 1..={window_size}, got {hop_size}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_median_length(name: &str, length: usize) -> HpssResult<()> {
    if length == 0 || length % 2 == 0 {
        return Err(HpssError::InvalidParameters(format!(
            "{name} must be odd and >= 1, got {length}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_sharpness(sharpness: f64) -> HpssResult<()> {
    if !sharpness.is_finite() || sharpness <= 0.0 {
        return Err(HpssError::InvalidParameters(format!(
            "sharpness must be positive and finite, got {sharpness}"
        )));
    }
    Ok(())
}
