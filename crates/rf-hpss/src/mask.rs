//! Median-filter soft masking
//!
//! Harmonic content is steady across time at a fixed frequency, percussive
//! content is steady across frequency at a fixed instant. Each magnitude cell
//! is median-filtered along both axes and the two enhanced values are blended
//! into a complementary soft mask pair:
//!
//! ```text
//! harmonic   = H^p / (H^p + P^p)
//! percussive = 1 - harmonic
//! ```

use crate::config::{HpssConfig, validate_median_length, validate_sharpness};
use crate::error::{HpssError, HpssResult};
use crate::median::{FilterAxis, median_filter};
use crate::stft::{MagnitudeGrid, Spectrogram};
use ndarray::{Array2, Zip};

/// Complementary soft masks, indexed `[bin, frame]`
#[derive(Debug, Clone, PartialEq)]
pub struct MaskPair {
    harmonic: MagnitudeGrid,
    percussive: MagnitudeGrid,
}

impl MaskPair {
    /// Harmonic mask
    pub fn harmonic(&self) -> &MagnitudeGrid {
        &self.harmonic
    }

    /// Percussive mask (`1 - harmonic`)
    pub fn percussive(&self) -> &MagnitudeGrid {
        &self.percussive
    }

    /// `(bins, frames)`
    pub fn shape(&self) -> (usize, usize) {
        self.harmonic.dim()
    }
}

/// Median-filter mask generator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MedianMasker {
    harmonic_length: usize,
    percussive_length: usize,
    sharpness: f64,
}

impl MedianMasker {
    /// Create masker; lengths must be odd, sharpness positive
    pub fn new(harmonic_length: usize, percussive_length: usize, sharpness: f64) -> HpssResult<Self> {
        validate_median_length("harmonic_median_length", harmonic_length)?;
        validate_median_length("percussive_median_length", percussive_length)?;
        validate_sharpness(sharpness)?;
        Ok(Self {
            harmonic_length,
            percussive_length,
            sharpness,
        })
    }

    /// Create from separation config
    pub fn from_config(config: &HpssConfig) -> HpssResult<Self> {
        Self::new(
            config.harmonic_median_length,
            config.percussive_median_length,
            config.sharpness,
        )
    }

    /// Compute the mask pair for a magnitude grid
    pub fn compute_masks(&self, magnitude: &MagnitudeGrid) -> HpssResult<MaskPair> {
        let harmonic_enhanced = median_filter(magnitude, self.harmonic_length, FilterAxis::Time)?;
        let percussive_enhanced =
            median_filter(magnitude, self.percussive_length, FilterAxis::Frequency)?;

        let mut harmonic = Array2::zeros(magnitude.raw_dim());
        Zip::from(&mut harmonic)
            .and(&harmonic_enhanced)
            .and(&percussive_enhanced)
            .for_each(|m, &h, &p| *m = soft_mask(h, p, self.sharpness));

        let percussive = harmonic.mapv(|m| 1.0 - m);

        Ok(MaskPair {
            harmonic,
            percussive,
        })
    }

    /// Magnitude → masks → `(harmonic, percussive)` spectrograms
    pub fn separate(&self, spectrogram: &Spectrogram) -> HpssResult<(Spectrogram, Spectrogram)> {
        let masks = self.compute_masks(&spectrogram.magnitude())?;
        apply_masks(spectrogram, &masks)
    }
}

/// Scale every complex cell by its harmonic and percussive mask value
pub fn apply_masks(
    spectrogram: &Spectrogram,
    masks: &MaskPair,
) -> HpssResult<(Spectrogram, Spectrogram)> {
    if masks.shape() != spectrogram.shape() {
        return Err(HpssError::ShapeMismatch {
            expected: spectrogram.shape(),
            got: masks.shape(),
        });
    }

    let harmonic = Zip::from(spectrogram.data())
        .and(masks.harmonic())
        .map_collect(|&c, &m| c * m);
    let percussive = Zip::from(spectrogram.data())
        .and(masks.percussive())
        .map_collect(|&c, &m| c * m);

    if log::log_enabled!(log::Level::Debug) {
        let total: f64 = spectrogram.data().iter().map(|c| c.norm_sqr()).sum();
        let harmonic_energy: f64 = harmonic.iter().map(|c| c.norm_sqr()).sum();
        let percussive_energy: f64 = percussive.iter().map(|c| c.norm_sqr()).sum();
        if total > 0.0 {
            log::debug!(
                "HPSS masks applied: harmonic {:.1}%, percussive {:.1}% of spectral energy",
                100.0 * harmonic_energy / total,
                100.0 * percussive_energy / total
            );
        }
    }

    let sample_rate = spectrogram.sample_rate();
    Ok((
        Spectrogram::from_data(harmonic, sample_rate),
        Spectrogram::from_data(percussive, sample_rate),
    ))
}

/// `h^p / (h^p + p^p)`, evaluated on the ratio of the smaller to the larger
/// value so large exponents cannot overflow and tiny magnitudes cannot
/// underflow. 0.5 where the ratio is undefined (silent cell).
#[inline]
fn soft_mask(harmonic: f64, percussive: f64, power: f64) -> f64 {
    let harmonic_dominant = harmonic >= percussive;
    let r = if harmonic_dominant {
        (percussive / harmonic).powf(power)
    } else {
        (harmonic / percussive).powf(power)
    };

    if !r.is_finite() {
        0.5
    } else if harmonic_dominant {
        1.0 / (1.0 + r)
    } else {
        r / (1.0 + r)
    }
}
