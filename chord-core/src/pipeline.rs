//! # Pipeline Driver
//!
//! Ties the stages together into the one synchronous cycle the host loops
//! on: decimate → window → magnitude spectrum → normalize → scan → extract.
//! Each invocation must finish before the next sample block arrives; the
//! driver never suspends, never blocks, and keeps no state across cycles
//! beyond the planned FFT and the configuration-derived constants.
//!
//! A malformed block degrades that cycle to an empty voice list and a
//! warning; the loop itself is never aborted.

use anyhow::{Result, anyhow};
use log::warn;

use crate::config::DetectorConfig;
use crate::dsp::{self, Decimator};
use crate::error::PipelineError;
use crate::fft::{self, SpectrumAnalyzer};
use crate::tuning::{PitchClass, Tuning};
use crate::voices::{self, Voice};

/// The result of one analysis cycle.
///
/// Voices are sorted ascending by frequency. The normalized spectrum is
/// carried along for hosts that want to display it; like the voices, it is
/// a fresh value every cycle, so nothing aliases across frames.
#[derive(Debug, Clone)]
pub struct AnalysisFrame {
    pub voices: Vec<Voice>,
    pub spectrum: Vec<f32>,
}

impl AnalysisFrame {
    fn empty(spectrum_len: usize) -> Self {
        Self {
            voices: Vec::new(),
            spectrum: vec![0.0; spectrum_len],
        }
    }
}

/// The assembled signal-to-note pipeline.
///
/// Construction validates the configuration and precomputes everything a
/// cycle needs: the decimator, the FFT plan, the tuning context, and the
/// lowest scanned bin (the bin nearest the lowest note of interest).
pub struct Pipeline {
    config: DetectorConfig,
    decimator: Decimator,
    analyzer: SpectrumAnalyzer,
    tuning: Tuning,
    lowest_bin: usize,
}

impl Pipeline {
    /// Builds a pipeline from a validated configuration.
    ///
    /// Fails if the configuration violates a stage precondition or if the
    /// lowest note of the scan range has no bin within half a bin width
    /// (i.e. the octave range does not fit the decimated bandwidth).
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;

        let tuning = Tuning::new(config.reference_a4, config.tolerance());
        let lowest_frequency = tuning.frequency_of(PitchClass::C, config.lowest_octave());
        let lowest_bin = dsp::closest_bin(
            lowest_frequency,
            config.spectrum_len(),
            config.new_nyquist(),
        )
        .ok_or_else(|| {
            anyhow!(
                "lowest scanned note ({:.1} Hz) has no bin under the {:.1} Hz Nyquist",
                lowest_frequency,
                config.new_nyquist()
            )
        })?;

        let decimator = Decimator::new(config.decimation_factor, config.fft_size)?;
        let analyzer = SpectrumAnalyzer::new(config.fft_size);

        Ok(Self {
            config,
            decimator,
            analyzer,
            tuning,
            lowest_bin,
        })
    }

    /// The configuration this pipeline was built with.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// The tuning context shared by all note math.
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Index of the first scanned spectrum bin.
    pub fn lowest_bin(&self) -> usize {
        self.lowest_bin
    }

    /// Runs one full analysis cycle on a sample block at the original rate.
    ///
    /// The block should already be low-passed at the decimated Nyquist
    /// (see [`Decimator`]). A block of any length is accepted: short blocks
    /// zero-pad, oversized blocks are truncated by the decimation itself.
    /// Any per-cycle precondition violation is logged and yields an empty
    /// frame; an empty voice list from a quiet or unclassifiable spectrum
    /// is an ordinary success.
    pub fn process_block(&self, block: &[f32]) -> AnalysisFrame {
        match self.run_cycle(block) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("analysis cycle skipped: {e}");
                AnalysisFrame::empty(self.config.spectrum_len())
            }
        }
    }

    fn run_cycle(&self, block: &[f32]) -> Result<AnalysisFrame, PipelineError> {
        // Time domain: reduce the rate, then taper the live samples so the
        // zero-padded tail stays zero.
        let mut frame = self.decimator.decimate(block);
        dsp::apply_window(&mut frame, self.decimator.live_len(block.len()))?;

        // Frequency domain: magnitudes scaled so the threshold reads as a
        // fraction of the strongest bin.
        let mut spectrum = self.analyzer.magnitudes(&frame)?;
        fft::normalize(&mut spectrum);

        let candidates = voices::scan_spectrum(
            &spectrum,
            self.lowest_bin,
            self.config.new_nyquist(),
            &self.tuning,
        );
        let mut voices = voices::extract_top_voices(
            &candidates,
            self.config.max_voices,
            self.config.amplitude_threshold,
        )?;
        voices.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));

        Ok(AnalysisFrame { voices, spectrum })
    }
}
