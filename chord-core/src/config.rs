//! # Detector Configuration
//!
//! Process-lifetime configuration for the pipeline, set once at startup.
//! Defaults reproduce the classic layout: 44.1 kHz input decimated by 10
//! (2205 Hz Nyquist), a 2048-point FFT (2.15 Hz bins), a five-octave scan
//! range reaching down from C7, up to seven voices, and a 0.5 normalized
//! amplitude threshold at standard A4 = 440 tuning.
//!
//! Configurations round-trip through pretty-printed JSON so a host can keep
//! its tuning setup between sessions.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use crate::error::PipelineError;

/// The octave the scan range reaches down from. C7 is a reasonable ceiling
/// for chord tones; with the default decimation it sits just under the
/// 2205 Hz Nyquist.
pub const TOP_OCTAVE: i32 = 7;

/// All knobs of the signal-to-note pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Original capture sample rate in Hz.
    pub sample_rate: u32,
    /// Integer decimation factor; the analysis Nyquist becomes
    /// `sample_rate / (2 * factor)`.
    pub decimation_factor: usize,
    /// FFT length; also the fixed sample-block length handed to the
    /// decimator.
    pub fft_size: usize,
    /// How many octaves below C7 to scan.
    pub octaves: i32,
    /// Maximum number of simultaneous voices to extract.
    pub max_voices: usize,
    /// Normalized amplitude threshold in `[0, 1]` a peak must exceed.
    pub amplitude_threshold: f32,
    /// A4 reference frequency in Hz.
    pub reference_a4: f32,
    /// Classification tolerance in Hz. `None` uses half the bin width,
    /// the smallest tolerance that still captures every bin center.
    pub tolerance_hz: Option<f32>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            decimation_factor: 10,
            fft_size: 2048,
            octaves: 5,
            max_voices: 7,
            amplitude_threshold: 0.5,
            reference_a4: 440.0,
            tolerance_hz: None,
        }
    }
}

impl DetectorConfig {
    /// Checks the preconditions the pipeline stages rely on.
    ///
    /// # Errors
    /// `InvalidFactor` for a zero decimation factor, `InvalidVoiceCount`
    /// for a zero voice limit, `SizeMismatch` for an FFT size too small
    /// or odd to yield usable spectrum bins.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.decimation_factor == 0 {
            return Err(PipelineError::InvalidFactor(self.decimation_factor));
        }
        if self.max_voices == 0 {
            return Err(PipelineError::InvalidVoiceCount);
        }
        if self.fft_size < 2 || self.fft_size % 2 != 0 {
            return Err(PipelineError::SizeMismatch {
                expected: self.fft_size.max(2).next_multiple_of(2),
                actual: self.fft_size,
            });
        }
        Ok(())
    }

    /// Sample rate after decimation.
    pub fn decimated_rate(&self) -> f32 {
        self.sample_rate as f32 / self.decimation_factor as f32
    }

    /// Highest representable frequency after decimation.
    pub fn new_nyquist(&self) -> f32 {
        self.decimated_rate() / 2.0
    }

    /// Number of usable spectrum bins (`fft_size / 2`).
    pub fn spectrum_len(&self) -> usize {
        self.fft_size / 2
    }

    /// Frequency span of one spectrum bin.
    pub fn bin_width(&self) -> f32 {
        self.decimated_rate() / self.fft_size as f32
    }

    /// Effective classification tolerance: the configured override, or
    /// half the bin width.
    pub fn tolerance(&self) -> f32 {
        self.tolerance_hz.unwrap_or(self.bin_width() / 2.0)
    }

    /// Wall-clock duration of one sample block; the natural period of the
    /// analysis loop.
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.fft_size as f64 / self.sample_rate as f64)
    }

    /// The octave of the lowest note scanned (C of this octave).
    pub fn lowest_octave(&self) -> i32 {
        TOP_OCTAVE - self.octaves
    }

    /// Loads a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).with_context(|| format!("opening config {}", path.display()))?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        let config: DetectorConfig =
            serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file =
            File::create(path).with_context(|| format!("creating config {}", path.display()))?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_layout_matches_the_classic_numbers() {
        let config = DetectorConfig::default();
        assert_relative_eq!(config.decimated_rate(), 4410.0);
        assert_relative_eq!(config.new_nyquist(), 2205.0);
        assert_eq!(config.spectrum_len(), 1024);
        assert_relative_eq!(config.bin_width(), 2.1533203);
        assert_relative_eq!(config.tolerance(), 1.0766602);
        assert_eq!(config.lowest_octave(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tolerance_override_wins() {
        let config = DetectorConfig {
            tolerance_hz: Some(3.0),
            ..Default::default()
        };
        assert_relative_eq!(config.tolerance(), 3.0);
    }

    #[test]
    fn validation_catches_bad_knobs() {
        let config = DetectorConfig {
            decimation_factor: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidFactor(0))
        ));

        let config = DetectorConfig {
            max_voices: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidVoiceCount)
        ));

        let config = DetectorConfig {
            fft_size: 2047,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn json_round_trip() {
        let config = DetectorConfig {
            max_voices: 4,
            amplitude_threshold: 0.25,
            tolerance_hz: Some(1.5),
            ..Default::default()
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: DetectorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_voices, 4);
        assert_relative_eq!(back.amplitude_threshold, 0.25);
        assert_eq!(back.tolerance_hz, Some(1.5));
        assert_eq!(back.sample_rate, 44_100);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let back: DetectorConfig = serde_json::from_str(r#"{"max_voices": 3}"#).unwrap();
        assert_eq!(back.max_voices, 3);
        assert_eq!(back.fft_size, 2048);
        assert_eq!(back.decimation_factor, 10);
    }

    #[test]
    fn block_duration_matches_the_buffer() {
        let config = DetectorConfig::default();
        // 2048 samples at 44.1 kHz is ~46.4 ms.
        let ms = config.block_duration().as_secs_f64() * 1000.0;
        assert!((46.0..47.0).contains(&ms));
    }
}
