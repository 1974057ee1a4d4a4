//! Error types for harmonic-percussive separation

use thiserror::Error;

/// Separation error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HpssError {
    /// Caller-supplied configuration violates a precondition
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Waveform shorter than one analysis window
    #[error("Insufficient samples: need at least {required}, got {actual}")]
    InsufficientSamples {
        /// Window size
        required: usize,
        /// Waveform length
        actual: usize,
    },

    /// Grid dimensions disagree (bins, frames)
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Shape the operation requires
        expected: (usize, usize),
        /// Shape it was given
        got: (usize, usize),
    },

    /// Invalid sample rate
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// Cancelled through a [`crate::CancelToken`]
    #[error("Separation cancelled")]
    Cancelled,

    /// FFT backend failure
    #[error("Transform error: {0}")]
    Transform(String),
}

/// Result type for separation operations
pub type HpssResult<T> = Result<T, HpssError>;

impl From<realfft::FftError> for HpssError {
    fn from(e: realfft::FftError) -> Self {
        HpssError::Transform(e.to_string())
    }
}
