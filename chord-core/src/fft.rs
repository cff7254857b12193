//! # Spectrum Computation Module
//!
//! Magnitude-spectrum computation for the decimated, windowed frame: it
//! consumes a fixed-size time-domain block and produces the `fft_size / 2`
//! usable magnitude bins the scanner walks. Hosts with their own analysis
//! engine can skip this module and feed the scanner directly.
//!
//! ## Features
//! - Forward FFT via RustFFT, planned once and reused every cycle
//! - Magnitude extraction up to the Nyquist bin
//! - Peak normalization into `[0, 1]` for threshold-based extraction

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

use crate::error::PipelineError;

/// A planned forward FFT of a fixed size.
///
/// Planning is the expensive part of RustFFT, so the plan is built once at
/// pipeline construction and shared across cycles.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
}

impl SpectrumAnalyzer {
    /// Plans a forward FFT of `fft_size` points.
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self { fft, fft_size }
    }

    /// The planned FFT size.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of usable spectrum bins (`fft_size / 2`, up to Nyquist).
    pub fn spectrum_len(&self) -> usize {
        self.fft_size / 2
    }

    /// Transforms a time-domain frame into its magnitude spectrum.
    ///
    /// Only the first half of the complex spectrum is returned; the upper
    /// half mirrors it for real input. All magnitudes are non-negative.
    ///
    /// # Errors
    /// `PipelineError::SizeMismatch` if the frame is not exactly
    /// `fft_size` samples long.
    pub fn magnitudes(&self, frame: &[f32]) -> Result<Vec<f32>, PipelineError> {
        if frame.len() != self.fft_size {
            return Err(PipelineError::SizeMismatch {
                expected: self.fft_size,
                actual: frame.len(),
            });
        }

        let mut buffer: Vec<Complex<f32>> = frame
            .iter()
            .map(|&sample| Complex { re: sample, im: 0.0 })
            .collect();
        self.fft.process(&mut buffer);

        Ok(buffer
            .iter()
            .take(self.spectrum_len())
            .map(|c| c.norm())
            .collect())
    }
}

/// Scales a spectrum in place so its largest magnitude becomes 1.0.
///
/// Makes the extractor's amplitude threshold meaningful as a fraction of
/// the strongest bin. A silent (all-zero) spectrum is left untouched.
pub fn normalize(spectrum: &mut [f32]) {
    let max = spectrum.iter().cloned().fold(0.0_f32, f32::max);
    if max > 0.0 {
        for value in spectrum.iter_mut() {
            *value /= max;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn impulse_has_a_flat_spectrum() {
        let analyzer = SpectrumAnalyzer::new(8);
        let mut frame = vec![0.0; 8];
        frame[0] = 1.0;
        let spectrum = analyzer.magnitudes(&frame).unwrap();
        assert_eq!(spectrum.len(), 4);
        for magnitude in spectrum {
            assert_relative_eq!(magnitude, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn sine_peaks_at_its_own_bin() {
        let n = 64;
        let analyzer = SpectrumAnalyzer::new(n);
        let frame: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 8.0 * i as f32 / n as f32).sin())
            .collect();
        let spectrum = analyzer.magnitudes(&frame).unwrap();
        let peak = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 8);
        // A full-scale sine over n samples concentrates n/2 in its bin.
        assert_relative_eq!(spectrum[8], n as f32 / 2.0, epsilon = 1e-2);
    }

    #[test]
    fn wrong_frame_size_is_rejected() {
        let analyzer = SpectrumAnalyzer::new(8);
        assert!(matches!(
            analyzer.magnitudes(&[0.0; 7]),
            Err(PipelineError::SizeMismatch {
                expected: 8,
                actual: 7
            })
        ));
    }

    #[test]
    fn normalize_scales_to_unit_peak() {
        let mut spectrum = vec![0.0, 2.0, 4.0, 1.0];
        normalize(&mut spectrum);
        assert_eq!(spectrum, vec![0.0, 0.5, 1.0, 0.25]);
    }

    #[test]
    fn normalize_leaves_silence_alone() {
        let mut spectrum = vec![0.0; 4];
        normalize(&mut spectrum);
        assert_eq!(spectrum, vec![0.0; 4]);
    }
}
