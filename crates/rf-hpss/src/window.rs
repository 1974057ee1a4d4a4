//! Analysis/synthesis window functions
//!
//! All windows are generated in their periodic (DFT-even) form, which is the
//! form that overlap-adds cleanly at hop sizes dividing the window length.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Window function applied to every STFT frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowFunction {
    /// Hann window (default)
    #[default]
    Hann,
    /// Hamming window
    Hamming,
    /// Blackman window
    Blackman,
    /// 4-term Blackman-Harris window
    BlackmanHarris,
}

impl WindowFunction {
    /// Generate `size` window coefficients
    pub fn generate(&self, size: usize) -> Vec<f64> {
        let n = size as f64;
        (0..size)
            .map(|i| {
                let x = 2.0 * PI * i as f64 / n;
                let w = match self {
                    WindowFunction::Hann => 0.5 * (1.0 - x.cos()),
                    WindowFunction::Hamming => 0.54 - 0.46 * x.cos(),
                    WindowFunction::Blackman => {
                        0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
                    }
                    WindowFunction::BlackmanHarris => {
                        0.35875 - 0.48829 * x.cos() + 0.14128 * (2.0 * x).cos()
                            - 0.01168 * (3.0 * x).cos()
                    }
                };
                // Blackman evaluates to -1e-17 at the edges
                w.max(0.0)
            })
            .collect()
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            WindowFunction::Hann => "Hann",
            WindowFunction::Hamming => "Hamming",
            WindowFunction::Blackman => "Blackman",
            WindowFunction::BlackmanHarris => "Blackman-Harris",
        }
    }
}
