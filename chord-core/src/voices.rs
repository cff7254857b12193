//! # Voice Extraction Module
//!
//! The frequency-domain half of the pipeline: walking the magnitude
//! spectrum for bins that land on equal-tempered notes, then greedily
//! selecting the strongest local peaks as the frame's sounding voices.
//!
//! ## Features
//! - Bin-by-bin note classification preserving ascending frequency order
//! - Greedy top-K local-maximum selection over a fixed-size buffer
//! - Strict-inequality peak test, so scan-order ties resolve to the first
//!   peak encountered

use std::cmp::Ordering;

use crate::error::PipelineError;
use crate::tuning::{PitchClass, Tuning};

/// A spectrum bin that classified as a note. Created fresh each analysis
/// frame and discarded after extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteCandidate {
    /// Center frequency of the bin in Hz.
    pub frequency: f32,
    /// Magnitude of the bin (normalized by the caller if thresholds are
    /// meant as fractions of the strongest bin).
    pub amplitude: f32,
    /// Index of the bin in the source spectrum.
    pub bin_index: usize,
    /// The pitch class the bin classified as.
    pub pitch_class: PitchClass,
}

/// One detected, named pitch. The output unit of the whole pipeline; each
/// frame's voices are fresh values, never updated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub pitch_class: PitchClass,
    pub frequency: f32,
    pub amplitude: f32,
}

/// Walks the spectrum from `lowest_bin` upward and keeps every bin whose
/// center frequency classifies as a note under the given tuning.
///
/// Bin `i` of an `N`-bin spectrum is centered at `i / N * new_nyquist`.
/// The result preserves ascending bin (hence frequency) order. This is a
/// filter, not a peak picker: adjacent bins mapping to the same note all
/// come through, and peak selection happens in [`extract_top_voices`].
pub fn scan_spectrum(
    spectrum: &[f32],
    lowest_bin: usize,
    new_nyquist: f32,
    tuning: &Tuning,
) -> Vec<NoteCandidate> {
    let nspc = spectrum.len();
    let mut candidates = Vec::new();
    for (i, &amplitude) in spectrum.iter().enumerate().skip(lowest_bin) {
        let frequency = i as f32 / nspc as f32 * new_nyquist;
        if let Some(pitch_class) = tuning.classify(frequency) {
            candidates.push(NoteCandidate {
                frequency,
                amplitude,
                bin_index: i,
                pitch_class,
            });
        }
    }
    candidates
}

/// Selects up to `max_voices` local-maximum candidates above the amplitude
/// threshold.
///
/// A selection buffer of `max_voices` empty slots is maintained sorted
/// ascending by amplitude, so the weakest selection is always at index 0.
/// Each interior candidate that is a strict local peak (greater than the
/// threshold and than both neighbors) and stronger than the weakest slot
/// replaces it, and the buffer is re-sorted. Re-sorting a buffer this small
/// on every replacement is a deliberate simplicity-over-asymptotics choice;
/// a priority queue would behave identically as long as it kept the strict
/// `>` comparison (ties at equal amplitude keep the earlier peak).
///
/// The first and last candidates are never peaks by construction, so a
/// global maximum sitting at either edge is never selected. Callers that
/// cannot accept that asymmetry must pad the candidate sequence with a
/// zero-amplitude sentinel on each side.
///
/// The returned voices are unordered; sort by frequency if display order
/// matters. Fewer qualifying peaks than `max_voices` yields a shorter list,
/// and no peaks at all yields an empty one. Both are successes.
///
/// # Errors
/// `PipelineError::InvalidVoiceCount` if `max_voices` is zero.
pub fn extract_top_voices(
    candidates: &[NoteCandidate],
    max_voices: usize,
    threshold: f32,
) -> Result<Vec<Voice>, PipelineError> {
    if max_voices == 0 {
        return Err(PipelineError::InvalidVoiceCount);
    }

    // Empty slots count as amplitude 0, matching the "no voice" sentinel.
    let slot_amplitude = |slot: &Option<&NoteCandidate>| slot.map_or(0.0, |c| c.amplitude);

    let mut selection: Vec<Option<&NoteCandidate>> = vec![None; max_voices];
    for i in 1..candidates.len().saturating_sub(1) {
        let candidate = &candidates[i];
        let is_peak = candidate.amplitude > threshold
            && candidate.amplitude > candidates[i - 1].amplitude
            && candidate.amplitude > candidates[i + 1].amplitude;
        if is_peak && candidate.amplitude > slot_amplitude(&selection[0]) {
            selection[0] = Some(candidate);
            selection.sort_by(|a, b| {
                slot_amplitude(a)
                    .partial_cmp(&slot_amplitude(b))
                    .unwrap_or(Ordering::Equal)
            });
        }
    }

    Ok(selection
        .into_iter()
        .flatten()
        .map(|c| Voice {
            pitch_class: c.pitch_class,
            frequency: c.frequency,
            amplitude: c.amplitude,
        })
        .collect())
}
