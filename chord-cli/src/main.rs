//! # chord-cli — Polyphonic Chord Detection Front End
//!
//! Terminal front end for the chord-core pipeline. Two modes:
//!
//! - **Live** (default): a dedicated worker thread owns the CPAL stream
//!   and the pipeline, running one analysis cycle per captured block and
//!   sending frames to the main thread over a crossbeam channel. The main
//!   thread prints the frequency-sorted voices whenever they change.
//! - **File** (`--input`): a WAV file is mixed down to mono, framed into
//!   pipeline-sized blocks, and analyzed offline with timestamps.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, select};
use log::{info, warn};

use chord_core::pipeline::AnalysisFrame;
use chord_core::{DetectorConfig, Pipeline, Tuning, audio};

#[derive(Parser, Debug)]
#[command(
    name = "chord-cli",
    about = "Real-time polyphonic chord detection from a microphone or WAV file"
)]
struct Cli {
    /// Analyze a WAV file instead of the microphone
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Load detector configuration from a JSON file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the effective configuration to a JSON file and exit
    #[arg(long, value_name = "PATH")]
    save_config: Option<PathBuf>,

    /// Override the maximum number of voices
    #[arg(long)]
    voices: Option<usize>,

    /// Override the normalized amplitude threshold (0 to 1)
    #[arg(long)]
    threshold: Option<f32>,

    /// Stop live analysis after this many seconds
    #[arg(long, value_name = "SECONDS")]
    duration: Option<u64>,

    /// List audio input devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DetectorConfig::load(path)?,
        None => DetectorConfig::default(),
    };
    if let Some(voices) = cli.voices {
        config.max_voices = voices;
    }
    if let Some(threshold) = cli.threshold {
        config.amplitude_threshold = threshold;
    }

    if let Some(path) = &cli.save_config {
        config.save(path)?;
        println!("wrote configuration to {}", path.display());
        return Ok(());
    }

    if cli.list_devices {
        for name in audio::input_device_names()? {
            println!("{name}");
        }
        return Ok(());
    }

    match &cli.input {
        Some(path) => run_file(config, path),
        None => run_live(config, cli.duration),
    }
}

/// Offline mode: frame a WAV file into blocks and print detections.
fn run_file(mut config: DetectorConfig, path: &PathBuf) -> Result<()> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    info!(
        "{}: {} Hz, {} channel(s), {}-bit",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample
    );

    // The file dictates the original rate; everything derived (Nyquist,
    // bin width, tolerance) follows from it.
    config.sample_rate = spec.sample_rate;
    let pipeline = Pipeline::new(config.clone())?;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample > 32 {
                bail!("unsupported bit depth: {}", spec.bits_per_sample);
            }
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    let block_len = config.fft_size;
    for (i, block) in mono.chunks(block_len).enumerate() {
        let frame = pipeline.process_block(block);
        if !frame.voices.is_empty() {
            let t = (i * block_len) as f32 / spec.sample_rate as f32;
            println!("{t:7.2}s  {}", format_voices(pipeline.tuning(), &frame));
        }
    }
    Ok(())
}

/// Live mode: worker thread drives the pipeline, main thread prints.
fn run_live(config: DetectorConfig, duration: Option<u64>) -> Result<()> {
    let (frame_tx, frame_rx) = crossbeam_channel::unbounded();
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

    let tuning = Tuning::new(config.reference_a4, config.tolerance());
    let worker = thread::spawn(move || {
        if let Err(e) = live_worker(config, frame_tx, shutdown_rx) {
            warn!("audio worker stopped: {e:#}");
        }
    });

    let deadline = duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut last_line = String::new();
    loop {
        match frame_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(frame) => {
                let line = format_voices(&tuning, &frame);
                if line != last_line {
                    println!("{}", if line.is_empty() { "-" } else { &line });
                    last_line = line;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
    }

    let _ = shutdown_tx.send(());
    let _ = worker.join();
    Ok(())
}

/// Owns the stream and the pipeline for the lifetime of the capture.
fn live_worker(
    mut config: DetectorConfig,
    frame_tx: Sender<AnalysisFrame>,
    shutdown_rx: Receiver<()>,
) -> Result<()> {
    // Small bound: the capture side drops blocks when analysis lags, so a
    // deep queue would only add latency.
    let (raw_tx, raw_rx) = crossbeam_channel::bounded::<Vec<f32>>(4);

    let (stream, actual_rate) = audio::start_capture(raw_tx, config.sample_rate, config.fft_size)?;
    if actual_rate != config.sample_rate {
        warn!(
            "device negotiated {actual_rate} Hz instead of {} Hz",
            config.sample_rate
        );
        config.sample_rate = actual_rate;
    }
    let pipeline = Pipeline::new(config)?;

    loop {
        select! {
            recv(raw_rx) -> msg => match msg {
                Ok(block) => {
                    let frame = pipeline.process_block(&block);
                    if frame_tx.send(frame).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            recv(shutdown_rx) -> _ => break,
        }
    }

    stream.pause()?;
    Ok(())
}

/// Renders a frame's voices as note labels with octaves, low to high,
/// e.g. "C4 E4 G4".
fn format_voices(tuning: &Tuning, frame: &AnalysisFrame) -> String {
    frame
        .voices
        .iter()
        .map(|v| format!("{}{}", v.pitch_class, tuning.octave_of(v.frequency, v.pitch_class)))
        .collect::<Vec<_>>()
        .join(" ")
}
