//! Sliding median filters over magnitude grids
//!
//! The window is centred on each cell and clamped to the grid at the edges
//! (no wrap, no reflection). A clamped window holding an even number of
//! values yields the mean of its two middle values.

use crate::config::validate_median_length;
use crate::error::HpssResult;
use crate::stft::MagnitudeGrid;
use ndarray::{Array2, Axis, Zip, s};

/// Grid axis a median filter slides along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAxis {
    /// Across frames at a fixed bin (enhances harmonic content)
    Time,
    /// Across bins at a fixed frame (enhances percussive content)
    Frequency,
}

impl FilterAxis {
    fn axis(self) -> Axis {
        match self {
            FilterAxis::Time => Axis(1),
            FilterAxis::Frequency => Axis(0),
        }
    }
}

/// Median-filter every lane of `grid` along `axis`.
///
/// `length` must be odd; a length of 1 returns the grid unchanged.
pub fn median_filter(
    grid: &MagnitudeGrid,
    length: usize,
    axis: FilterAxis,
) -> HpssResult<MagnitudeGrid> {
    validate_median_length("median filter length", length)?;
    if length == 1 {
        return Ok(grid.clone());
    }

    let half = length / 2;
    let axis = axis.axis();
    let mut filtered = Array2::zeros(grid.raw_dim());
    // A clamped window never holds more than one lane
    let mut window: Vec<f64> = Vec::with_capacity(length.min(grid.len_of(axis)));

    Zip::from(filtered.lanes_mut(axis))
        .and(grid.lanes(axis))
        .for_each(|mut out, lane| {
            let n = lane.len();
            for i in 0..n {
                let lo = i.saturating_sub(half);
                let hi = i.saturating_add(half + 1).min(n);
                window.clear();
                window.extend(lane.slice(s![lo..hi]).iter().copied());
                out[i] = median(&mut window);
            }
        });

    Ok(filtered)
}

/// Median of a slice (reorders the input)
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_unstable_by(f64::total_cmp);

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
