//! Short-time Fourier transform and weighted overlap-add resynthesis
//!
//! Frames are taken without centre padding: frame `t` covers samples
//! `[t * hop, t * hop + window_size)` and the frame count is
//! `(len - window_size) / hop + 1`. Only the `window_size / 2 + 1`
//! non-redundant bins of each real FFT are stored.
//!
//! The inverse applies the analysis window a second time (synthesis) and
//! divides every output sample by the accumulated squared window, so every
//! sample with a non-zero window-sum is reconstructed exactly. Only samples
//! no window reaches (or reaches with a weight below [`WINDOW_SUM_FLOOR`])
//! come out as zero.

use crate::cancel::CancelToken;
use crate::config::validate_frame_params;
use crate::error::{HpssError, HpssResult};
use crate::waveform::Waveform;
use crate::window::WindowFunction;
use ndarray::Array2;
use rayon::prelude::*;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex64;
use std::sync::Arc;

/// Accumulated squared-window weight treated as zero
pub const WINDOW_SUM_FLOOR: f64 = 1e-10;

/// Real magnitude grid, indexed `[bin, frame]`
pub type MagnitudeGrid = Array2<f64>;

/// Complex STFT, indexed `[bin, frame]`
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    data: Array2<Complex64>,
    sample_rate: u32,
}

impl Spectrogram {
    /// Wrap a `[bin, frame]` grid
    pub fn from_data(data: Array2<Complex64>, sample_rate: u32) -> Self {
        Self { data, sample_rate }
    }

    /// Number of frequency bins
    pub fn bins(&self) -> usize {
        self.data.nrows()
    }

    /// Number of time frames
    pub fn frames(&self) -> usize {
        self.data.ncols()
    }

    /// `(bins, frames)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Sample rate of the analysed waveform
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Complex value at `(bin, frame)`
    pub fn get(&self, bin: usize, frame: usize) -> Option<Complex64> {
        self.data.get((bin, frame)).copied()
    }

    /// Underlying grid
    pub fn data(&self) -> &Array2<Complex64> {
        &self.data
    }

    /// Modulus of every cell
    pub fn magnitude(&self) -> MagnitudeGrid {
        self.data.mapv(|c| c.norm())
    }
}

/// Planned forward/inverse STFT for one window size, hop and window
pub struct StftProcessor {
    window_size: usize,
    hop_size: usize,
    window_function: WindowFunction,
    /// Analysis and synthesis window
    window: Vec<f64>,
    fft_forward: Arc<dyn RealToComplex<f64>>,
    fft_inverse: Arc<dyn ComplexToReal<f64>>,
}

impl StftProcessor {
    /// Validate frame parameters and plan both FFTs
    pub fn new(
        window_size: usize,
        hop_size: usize,
        window_function: WindowFunction,
    ) -> HpssResult<Self> {
        validate_frame_params(window_size, hop_size)?;

        let mut planner = RealFftPlanner::<f64>::new();
        let fft_forward = planner.plan_fft_forward(window_size);
        let fft_inverse = planner.plan_fft_inverse(window_size);

        Ok(Self {
            window_size,
            hop_size,
            window_function,
            window: window_function.generate(window_size),
            fft_forward,
            fft_inverse,
        })
    }

    /// Window size in samples
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Hop size in samples
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Window function
    pub fn window_function(&self) -> WindowFunction {
        self.window_function
    }

    /// Bins per frame
    pub fn num_bins(&self) -> usize {
        self.window_size / 2 + 1
    }

    /// Frames produced for `len` samples
    pub fn num_frames(&self, len: usize) -> usize {
        if len < self.window_size {
            0
        } else {
            (len - self.window_size) / self.hop_size + 1
        }
    }

    /// Samples reached by `frames` frames
    pub fn covered_len(&self, frames: usize) -> usize {
        if frames == 0 {
            0
        } else {
            (frames - 1) * self.hop_size + self.window_size
        }
    }

    /// Forward transform.
    ///
    /// Frames are independent and computed in parallel.
    pub fn forward(&self, waveform: &Waveform, cancel: &CancelToken) -> HpssResult<Spectrogram> {
        let samples = waveform.samples();
        if samples.len() < self.window_size {
            return Err(HpssError::InsufficientSamples {
                required: self.window_size,
                actual: samples.len(),
            });
        }

        let bins = self.num_bins();
        let frames = self.num_frames(samples.len());

        let columns = (0..frames)
            .into_par_iter()
            .map_init(
                || {
                    (
                        self.fft_forward.make_input_vec(),
                        self.fft_forward.make_scratch_vec(),
                    )
                },
                |(input, scratch), t| -> HpssResult<Vec<Complex64>> {
                    cancel.check()?;

                    let start = t * self.hop_size;
                    let end = (start + self.window_size).min(samples.len());
                    let frame = &samples[start..end];

                    // Zero-pad past the end of the waveform
                    for (i, (slot, &w)) in input.iter_mut().zip(&self.window).enumerate() {
                        *slot = frame.get(i).map_or(0.0, |&s| s * w);
                    }

                    let mut spectrum = self.fft_forward.make_output_vec();
                    self.fft_forward
                        .process_with_scratch(input, &mut spectrum, scratch)?;
                    Ok(spectrum)
                },
            )
            .collect::<HpssResult<Vec<Vec<Complex64>>>>()?;

        log::debug!(
            "STFT forward: {} samples -> {} bins x {} frames (window {}, hop {})",
            samples.len(),
            bins,
            frames,
            self.window_size,
            self.hop_size
        );

        let data = Array2::from_shape_fn((bins, frames), |(f, t)| columns[t][f]);
        Ok(Spectrogram::from_data(data, waveform.sample_rate()))
    }

    /// Inverse transform by weighted overlap-add, truncated or zero-padded to
    /// `output_len`.
    ///
    /// Samples whose accumulated window-sum is at or below
    /// [`WINDOW_SUM_FLOOR`] are set to zero.
    pub fn inverse(
        &self,
        spectrogram: &Spectrogram,
        output_len: usize,
        cancel: &CancelToken,
    ) -> HpssResult<Waveform> {
        let bins = self.num_bins();
        if spectrogram.bins() != bins {
            return Err(HpssError::ShapeMismatch {
                expected: (bins, spectrogram.frames()),
                got: spectrogram.shape(),
            });
        }

        let covered = self.covered_len(spectrogram.frames());
        let mut output = vec![0.0; covered];
        let mut window_sum = vec![0.0; covered];

        let mut spectrum = self.fft_inverse.make_input_vec();
        let mut frame = self.fft_inverse.make_output_vec();
        let mut scratch = self.fft_inverse.make_scratch_vec();
        let norm = 1.0 / self.window_size as f64;

        for (t, column) in spectrogram.data().columns().into_iter().enumerate() {
            cancel.check()?;

            for (dst, &src) in spectrum.iter_mut().zip(column.iter()) {
                *dst = src;
            }
            // DC (and Nyquist for even sizes) must be real for a real output
            spectrum[0].im = 0.0;
            if self.window_size % 2 == 0 {
                spectrum[bins - 1].im = 0.0;
            }

            self.fft_inverse
                .process_with_scratch(&mut spectrum, &mut frame, &mut scratch)?;

            let start = t * self.hop_size;
            let end = start + self.window_size;
            for (((out, sum), &sample), &w) in output[start..end]
                .iter_mut()
                .zip(&mut window_sum[start..end])
                .zip(&frame)
                .zip(&self.window)
            {
                *out += sample * norm * w;
                *sum += w * w;
            }
        }

        for (out, &sum) in output.iter_mut().zip(&window_sum) {
            if sum > WINDOW_SUM_FLOOR {
                *out /= sum;
            } else {
                *out = 0.0;
            }
        }

        log::debug!(
            "STFT inverse: {} frames -> {} samples ({} covered)",
            spectrogram.frames(),
            output_len,
            covered
        );

        output.resize(output_len, 0.0);
        Waveform::new(output, spectrogram.sample_rate())
    }
}

/// One-shot forward transform
pub fn forward(
    waveform: &Waveform,
    window_size: usize,
    hop_size: usize,
    window: WindowFunction,
) -> HpssResult<Spectrogram> {
    StftProcessor::new(window_size, hop_size, window)?.forward(waveform, &CancelToken::new())
}

/// One-shot inverse transform
pub fn inverse(
    spectrogram: &Spectrogram,
    window_size: usize,
    hop_size: usize,
    window: WindowFunction,
    output_len: usize,
) -> HpssResult<Waveform> {
    StftProcessor::new(window_size, hop_size, window)?.inverse(
        spectrogram,
        output_len,
        &CancelToken::new(),
    )
}
