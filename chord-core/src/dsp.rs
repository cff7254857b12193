//! # DSP Primitives
//!
//! The time-domain half of the pipeline: integer-factor decimation and the
//! pre-FFT smoothing window, plus the bin/frequency lookup used to derive
//! the lowest scanned bin from the lowest note of interest.
//!
//! ## Features
//! - Fixed-output-length decimation with zero-padding on underrun
//! - In-place raised-cosine windowing over a chosen prefix of a buffer
//! - Nearest-bin lookup for a target frequency

use crate::error::PipelineError;

/// Integer-factor downsampler with a fixed output length.
///
/// Retains every `factor`-th input sample and zero-fills the rest, so the
/// output is always exactly `target_len` samples long and the fixed-size
/// spectral stages downstream never see a partial buffer.
///
/// Decimation lowers the Nyquist frequency to `original_rate / (2*factor)`.
/// This stage performs no filtering of its own: the caller must have
/// low-passed the input at the new Nyquist beforehand, or energy above it
/// aliases into the output. With that precondition met, decimation
/// introduces no new aliasing.
#[derive(Debug, Clone)]
pub struct Decimator {
    factor: usize,
    target_len: usize,
}

impl Decimator {
    /// Creates a decimator.
    ///
    /// # Errors
    /// `PipelineError::InvalidFactor` if `factor` is zero.
    pub fn new(factor: usize, target_len: usize) -> Result<Self, PipelineError> {
        if factor == 0 {
            return Err(PipelineError::InvalidFactor(factor));
        }
        Ok(Self { factor, target_len })
    }

    /// The decimation factor.
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// The fixed output length.
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// Number of live (non-padded) output samples for an input of `input_len`.
    pub fn live_len(&self, input_len: usize) -> usize {
        (input_len / self.factor).min(self.target_len)
    }

    /// Decimates `input` into a freshly allocated buffer of `target_len`
    /// samples: `out[i] = input[i * factor]` while in range, zero beyond.
    pub fn decimate(&self, input: &[f32]) -> Vec<f32> {
        let mut output = vec![0.0; self.target_len];
        // decimate_into only fails on a length mismatch, which cannot
        // happen for a buffer we just sized.
        let _ = self.decimate_into(input, &mut output);
        output
    }

    /// Decimates `input` into a caller-provided buffer.
    ///
    /// # Errors
    /// `PipelineError::SizeMismatch` if `output` is not exactly
    /// `target_len` samples long.
    pub fn decimate_into(&self, input: &[f32], output: &mut [f32]) -> Result<(), PipelineError> {
        if output.len() != self.target_len {
            return Err(PipelineError::SizeMismatch {
                expected: self.target_len,
                actual: output.len(),
            });
        }
        for (i, out) in output.iter_mut().enumerate() {
            let src = i * self.factor;
            *out = if src < input.len() { input[src] } else { 0.0 };
        }
        Ok(())
    }
}

/// Applies a raised-cosine taper in place over the first `len` samples:
/// `buffer[n] *= 0.54 - 0.46 * cos(2π n / len)`.
///
/// Tapering the frame edges reduces spectral leakage in the FFT stage.
/// Only the first `len` samples are touched, so the zero-padded tail of a
/// decimated block stays zero.
///
/// # Errors
/// `PipelineError::LengthOutOfRange` if `len` exceeds the buffer size.
pub fn apply_window(buffer: &mut [f32], len: usize) -> Result<(), PipelineError> {
    if len > buffer.len() {
        return Err(PipelineError::LengthOutOfRange {
            len,
            buffer: buffer.len(),
        });
    }
    let n = len as f32;
    for (i, sample) in buffer.iter_mut().take(len).enumerate() {
        *sample *= 0.54 - 0.46 * (2.0 * std::f32::consts::PI * i as f32 / n).cos();
    }
    Ok(())
}

/// Returns the spectrum bin whose center frequency is nearest to `frequency`,
/// or `None` if no bin center is within half a bin width.
///
/// Bin `i` of an `nspc`-bin spectrum is centered at `i / nspc * nyquist`;
/// the mapping is linear and monotonic.
pub fn closest_bin(frequency: f32, nspc: usize, nyquist: f32) -> Option<usize> {
    let bin_width = nyquist / nspc as f32;
    (0..nspc).find(|&i| (frequency - i as f32 / nspc as f32 * nyquist).abs() < bin_width / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn decimate_keeps_every_factorth_sample() {
        let input: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let decimator = Decimator::new(10, 10).unwrap();
        let output = decimator.decimate(&input);
        let expected: Vec<f32> = (0..10).map(|i| (i * 10) as f32).collect();
        assert_eq!(output, expected);
    }

    #[test]
    fn decimate_zero_pads_short_input() {
        let decimator = Decimator::new(2, 8).unwrap();
        let output = decimator.decimate(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(output, vec![1.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn decimate_output_length_is_always_target_len() {
        let decimator = Decimator::new(3, 16).unwrap();
        for input_len in [0, 1, 15, 16, 47, 48, 1000] {
            let input = vec![0.5; input_len];
            assert_eq!(decimator.decimate(&input).len(), 16);
        }
    }

    #[test]
    fn zero_factor_is_rejected() {
        assert!(matches!(
            Decimator::new(0, 16),
            Err(PipelineError::InvalidFactor(0))
        ));
    }

    #[test]
    fn decimate_into_checks_output_length() {
        let decimator = Decimator::new(2, 8).unwrap();
        let mut wrong = vec![0.0; 4];
        assert!(matches!(
            decimator.decimate_into(&[0.0; 16], &mut wrong),
            Err(PipelineError::SizeMismatch {
                expected: 8,
                actual: 4
            })
        ));
    }

    #[test]
    fn live_len_counts_real_samples() {
        let decimator = Decimator::new(10, 2048).unwrap();
        assert_eq!(decimator.live_len(2048), 204);
        assert_eq!(decimator.live_len(100), 10);
        assert_eq!(decimator.live_len(0), 0);
        // Never more than the output can hold.
        assert_eq!(decimator.live_len(1_000_000), 2048);
    }

    #[test]
    fn window_tapers_the_edges() {
        let mut buffer = vec![1.0; 8];
        apply_window(&mut buffer, 8).unwrap();
        assert_relative_eq!(buffer[0], 0.08, epsilon = 1e-6);
        // cos(π) at n = len/2 gives the window maximum.
        assert_relative_eq!(buffer[4], 1.0, epsilon = 1e-6);
        assert!(buffer.iter().all(|&s| s > 0.0 && s <= 1.0));
    }

    #[test]
    fn window_leaves_the_tail_alone() {
        let mut buffer = vec![1.0; 8];
        apply_window(&mut buffer, 4).unwrap();
        assert_eq!(&buffer[4..], &[1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn window_length_must_fit() {
        let mut buffer = vec![1.0; 8];
        assert!(matches!(
            apply_window(&mut buffer, 9),
            Err(PipelineError::LengthOutOfRange { len: 9, buffer: 8 })
        ));
    }

    #[test]
    fn closest_bin_finds_c2_in_the_default_layout() {
        // 44.1 kHz decimated by 10: 1024 bins up to a 2205 Hz Nyquist.
        let bin = closest_bin(65.406, 1024, 2205.0);
        assert_eq!(bin, Some(30));
    }

    #[test]
    fn closest_bin_rejects_frequencies_above_nyquist() {
        assert_eq!(closest_bin(5000.0, 1024, 2205.0), None);
    }
}
