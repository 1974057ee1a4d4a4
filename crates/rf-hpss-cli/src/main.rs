//! rf-hpss: split an audio file into harmonic and percussive WAV files
//!
//! Usage:
//!   rf-hpss song.flac                        - writes separation_output/{harmonic,percussive}.wav
//!   rf-hpss song.wav -o stems --sharpness 4  - custom output dir and mask sharpness
//!   rf-hpss song.wav --config hpss.json      - parameters from a JSON file
//!   rf-hpss song.wav --dump-config           - print the effective parameters and exit

mod decoder;
mod encoder;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rf_hpss::{CancelToken, HpssConfig, HpssSeparator, Waveform, WindowFunction};

use crate::encoder::BitDepth;

#[derive(Parser, Debug)]
#[command(name = "rf-hpss", version, about = "Harmonic-percussive source separation")]
struct Cli {
    /// Input audio file (WAV, FLAC, MP3, OGG, AIFF, M4A)
    input: PathBuf,

    /// Output directory, created if missing
    #[arg(short, long, default_value = "separation_output")]
    output_dir: PathBuf,

    /// File name of the harmonic component
    #[arg(long, default_value = "harmonic.wav")]
    harmonic_name: String,

    /// File name of the percussive component
    #[arg(long, default_value = "percussive.wav")]
    percussive_name: String,

    /// JSON file with separation parameters; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// STFT window size in samples
    #[arg(short, long)]
    window_size: Option<usize>,

    /// STFT hop size in samples [default: window size / 4]
    #[arg(long)]
    hop_size: Option<usize>,

    /// Analysis/synthesis window
    #[arg(long, value_enum)]
    window: Option<WindowArg>,

    /// Harmonic (time axis) median length, odd
    #[arg(long)]
    harmonic_median: Option<usize>,

    /// Percussive (frequency axis) median length, odd
    #[arg(long)]
    percussive_median: Option<usize>,

    /// Soft mask exponent
    #[arg(short, long)]
    sharpness: Option<f64>,

    /// Output sample format
    #[arg(short, long, value_enum, default_value = "24")]
    bit_depth: BitDepth,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum WindowArg {
    Hann,
    Hamming,
    Blackman,
    BlackmanHarris,
}

impl From<WindowArg> for WindowFunction {
    fn from(arg: WindowArg) -> Self {
        match arg {
            WindowArg::Hann => WindowFunction::Hann,
            WindowArg::Hamming => WindowFunction::Hamming,
            WindowArg::Blackman => WindowFunction::Blackman,
            WindowArg::BlackmanHarris => WindowFunction::BlackmanHarris,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = build_config(&cli)?;
    if cli.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let (harmonic_path, percussive_path) = run(&cli, config)?;
    println!("Harmonic:   {}", harmonic_path.display());
    println!("Percussive: {}", percussive_path.display());
    Ok(())
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

/// Config file (or defaults) with command-line overrides applied
fn build_config(cli: &Cli) -> Result<HpssConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => HpssConfig::default(),
    };

    if let Some(size) = cli.window_size {
        config = config.with_window_size(size);
    }
    if let Some(hop) = cli.hop_size {
        config = config.with_hop_size(hop);
    }
    if let Some(window) = cli.window {
        config = config.with_window(window.into());
    }
    if let Some(length) = cli.harmonic_median {
        config.harmonic_median_length = length;
    }
    if let Some(length) = cli.percussive_median {
        config.percussive_median_length = length;
    }
    if let Some(sharpness) = cli.sharpness {
        config = config.with_sharpness(sharpness);
    }

    config.validate().context("Invalid separation parameters")?;
    Ok(config)
}

fn load_config(path: &Path) -> Result<HpssConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse config {}", path.display()))
}

/// Decode, separate every channel, write both components
fn run(cli: &Cli, config: HpssConfig) -> Result<(PathBuf, PathBuf)> {
    let start = Instant::now();
    let separator = HpssSeparator::new(config)?;

    let audio = decoder::decode(&cli.input)?;
    let seconds = audio.frames() as f64 / audio.sample_rate as f64;
    let channels = audio.into_channels()?;

    log::info!(
        "Separating {:.2} s x {} channel(s), window {} hop {}",
        seconds,
        channels.len(),
        separator.config().window_size,
        separator.config().hop()
    );

    let results = separator
        .separate_channels(&channels, &CancelToken::new())
        .with_context(|| format!("Separation of {} failed", cli.input.display()))?;

    let (harmonic, percussive): (Vec<Waveform>, Vec<Waveform>) =
        results.into_iter().map(|c| c.into_tuple()).unzip();

    fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("Failed to create {}", cli.output_dir.display()))?;

    let harmonic_path = cli.output_dir.join(&cli.harmonic_name);
    let percussive_path = cli.output_dir.join(&cli.percussive_name);
    encoder::write_wav(&harmonic_path, &harmonic, cli.bit_depth)?;
    encoder::write_wav(&percussive_path, &percussive, cli.bit_depth)?;

    log::info!("Done in {:.2} s", start.elapsed().as_secs_f64());
    Ok((harmonic_path, percussive_path))
}
