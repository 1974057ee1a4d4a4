//! HPSS Integration Tests
//!
//! End-to-end checks of the public separation API:
//! - STFT round trip without masking
//! - Degenerate (length 1) median filters
//! - Tone + impulse separation
//! - Multi-channel separation
//! - Boundary and configuration failures

use approx::assert_abs_diff_eq;
use rf_hpss::stft::{self, StftProcessor};
use rf_hpss::{
    CancelToken, HpssConfig, HpssError, HpssSeparator, MedianMasker, Waveform, WindowFunction,
    separate, separate_channels,
};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

const SAMPLE_RATE: u32 = 44100;

/// Generate test sine wave
fn generate_sine(samples: usize, freq: f64, amplitude: f64) -> Vec<f64> {
    (0..samples)
        .map(|i| amplitude * (2.0 * PI * freq * i as f64 / SAMPLE_RATE as f64).sin())
        .collect()
}

/// Generate deterministic white noise
fn generate_noise(samples: usize) -> Vec<f64> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    (0..samples)
        .map(|i| {
            let mut hasher = DefaultHasher::new();
            i.hash(&mut hasher);
            let h = hasher.finish();
            (h as f64 / u64::MAX as f64) * 2.0 - 1.0
        })
        .collect()
}

/// Index of the largest absolute sample
fn peak_index(signal: &[f64]) -> usize {
    signal
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Dominant positive-frequency bin of a full-length complex FFT
fn dominant_bin(signal: &[f64]) -> usize {
    let mut buffer: Vec<Complex64> = signal.iter().map(|&s| Complex64::new(s, 0.0)).collect();
    let fft = FftPlanner::<f64>::new().plan_fft_forward(buffer.len());
    fft.process(&mut buffer);

    buffer[1..buffer.len() / 2]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
        .map(|(k, _)| k + 1)
        .unwrap_or(0)
}

fn energy(signal: &[f64]) -> f64 {
    signal.iter().map(|x| x * x).sum()
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORM
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_stft_round_trip_identity() {
    let input = Waveform::new(generate_noise(30_000), SAMPLE_RATE).unwrap();

    for (window_size, hop) in [(2048, 512), (1024, 256), (1024, 512), (512, 128)] {
        let spec = stft::forward(&input, window_size, hop, WindowFunction::Hann).unwrap();
        let output =
            stft::inverse(&spec, window_size, hop, WindowFunction::Hann, input.len()).unwrap();

        // Skip only the samples whose squared window weight is ~0
        let lead = WindowFunction::Hann
            .generate(window_size)
            .iter()
            .position(|w| w * w > stft::WINDOW_SUM_FLOOR)
            .unwrap();
        let covered = (spec.frames() - 1) * hop + window_size;
        for i in lead..=covered - lead {
            assert_abs_diff_eq!(output.samples()[i], input.samples()[i], epsilon = 1e-5);
        }
        for i in covered..input.len() {
            assert_eq!(output.samples()[i], 0.0);
        }
    }
}

#[test]
fn test_masked_spectrograms_are_exact_split() {
    let mut samples = generate_sine(20_000, 880.0, 0.4);
    samples[10_000] += 0.8;
    let input = Waveform::new(samples, SAMPLE_RATE).unwrap();

    let spec = stft::forward(&input, 1024, 256, WindowFunction::Hann).unwrap();
    let masker = MedianMasker::new(17, 17, 2.0).unwrap();
    let masks = masker.compute_masks(&spec.magnitude()).unwrap();

    for (&h, &p) in masks.harmonic().iter().zip(masks.percussive().iter()) {
        assert_abs_diff_eq!(h + p, 1.0, epsilon = f64::EPSILON);
    }

    let (harmonic, percussive) = rf_hpss::mask::apply_masks(&spec, &masks).unwrap();
    for ((x, h), p) in spec
        .data()
        .iter()
        .zip(harmonic.data().iter())
        .zip(percussive.data().iter())
    {
        let tolerance = 1e-12 * x.norm().max(1.0);
        assert_abs_diff_eq!((h + p).re, x.re, epsilon = tolerance);
        assert_abs_diff_eq!((h + p).im, x.im, epsilon = tolerance);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SEPARATION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_tone_and_impulse_separation() {
    // 1 s of a 440 Hz tone with a single-sample impulse at 0.5 s
    let mut samples = generate_sine(SAMPLE_RATE as usize, 440.0, 0.5);
    samples[22050] += 1.0;
    let input = Waveform::new(samples, SAMPLE_RATE).unwrap();

    let config = HpssConfig::default();
    let (harmonic, percussive) = separate(&input, &config).unwrap().into_tuple();

    // Percussive peak sits on the impulse
    let peak = peak_index(percussive.samples());
    let distance = peak.abs_diff(22050);
    assert!(
        distance <= config.hop(),
        "percussive peak at {} is {} samples from the impulse",
        peak,
        distance
    );

    // Away from the tone's own onset and cut-off, percussive energy sits on
    // the impulse
    let near = energy(&percussive.samples()[22050 - 2048..22050 + 2048]);
    let inner = energy(&percussive.samples()[4096..percussive.len() - 4096]);
    assert!(
        near / inner > 0.5,
        "only {:.1}% of percussive energy near the impulse",
        100.0 * near / inner
    );

    // Harmonic spectrum peaks at 440 Hz (1 Hz bins over one second)
    let bin_width = SAMPLE_RATE as f64 / harmonic.len() as f64;
    let dominant_hz = dominant_bin(harmonic.samples()) as f64 * bin_width;
    assert!(
        (dominant_hz - 440.0).abs() <= bin_width,
        "harmonic dominant frequency {} Hz",
        dominant_hz
    );
}

#[test]
fn test_unit_filters_halve_the_signal() {
    let input = Waveform::new(generate_noise(20_000), SAMPLE_RATE).unwrap();
    let config = HpssConfig::default()
        .with_window_size(1024)
        .with_median_lengths(1, 1);

    let components = separate(&input, &config).unwrap();

    for i in 0..input.len() {
        let half = 0.5 * input.samples()[i];
        assert_abs_diff_eq!(components.harmonic.samples()[i], half, epsilon = 1e-5);
        assert_abs_diff_eq!(components.percussive.samples()[i], half, epsilon = 1e-5);
    }
}

#[test]
fn test_multichannel_matches_mono() {
    let left = generate_sine(12_000, 330.0, 0.5);
    let right = generate_noise(12_000);
    let interleaved: Vec<f64> = left
        .iter()
        .zip(&right)
        .flat_map(|(&l, &r)| [l, r])
        .collect();

    let channels = Waveform::deinterleave(&interleaved, 2, SAMPLE_RATE).unwrap();
    let config = HpssConfig::default().with_window_size(1024);
    let results = separate_channels(&channels, &config, &CancelToken::new()).unwrap();

    assert_eq!(results.len(), 2);
    for (channel, result) in channels.iter().zip(&results) {
        assert_eq!(&separate(channel, &config).unwrap(), result);
    }
}

#[test]
fn test_processor_shared_across_threads() {
    let separator = HpssSeparator::new(HpssConfig::default().with_window_size(512)).unwrap();
    let input = Waveform::new(generate_noise(8_000), SAMPLE_RATE).unwrap();
    let expected = separator.separate(&input).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| separator.separate(&input).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn test_cancel_from_another_thread() {
    let separator = HpssSeparator::new(HpssConfig::default()).unwrap();
    let input = Waveform::new(generate_noise(SAMPLE_RATE as usize * 4), SAMPLE_RATE).unwrap();
    let cancel = CancelToken::new();
    cancel.clone().cancel();

    let result = std::thread::scope(|scope| {
        scope
            .spawn(|| separator.separate_with_cancel(&input, &cancel))
            .join()
            .unwrap()
    });
    assert_eq!(result, Err(HpssError::Cancelled));
}

// ═══════════════════════════════════════════════════════════════════════════════
// BOUNDARIES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_short_input_rejected() {
    let input = Waveform::new(generate_noise(1000), SAMPLE_RATE).unwrap();
    let result = separate(&input, &HpssConfig::default());
    assert!(matches!(result, Err(HpssError::InsufficientSamples { .. })));
}

#[test]
fn test_even_median_length_rejected() {
    let input = Waveform::new(generate_noise(10_000), SAMPLE_RATE).unwrap();
    let config = HpssConfig::default().with_median_lengths(4, 17);
    assert!(matches!(
        separate(&input, &config),
        Err(HpssError::InvalidParameters(_))
    ));
}

#[test]
fn test_exactly_one_window() {
    let input = Waveform::new(generate_noise(2048), SAMPLE_RATE).unwrap();
    let components = separate(&input, &HpssConfig::default()).unwrap();
    assert_eq!(components.harmonic.len(), 2048);
    assert!(components.harmonic.samples().iter().all(|s| s.is_finite()));
    assert!(components.percussive.samples().iter().all(|s| s.is_finite()));
}

#[test]
fn test_processor_rejects_bad_hop() {
    assert!(StftProcessor::new(1024, 2048, WindowFunction::Hann).is_err());
}
