//! # Musical Tuning Module
//!
//! Equal-temperament note math: pitch-class names, note frequencies, octave
//! recovery, and tolerance-based frequency classification. All calculations
//! are base-2 exponentials anchored to a configurable A4 reference; no other
//! tuning system is supported.
//!
//! ## Features
//! - Fixed 12-variant pitch-class table with sharp/flat alias parsing
//! - Note-name-and-octave to frequency conversion
//! - Frequency to pitch-class classification with a tolerance in Hz
//! - Octave recovery for an already-classified frequency

use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// The 12 pitch classes of the equal-tempered octave.
///
/// Declaration order doubles as the classification order: when a frequency
/// sits exactly on the tolerance boundary between two classes, the earlier
/// variant in this list wins. That order is part of the public contract and
/// must not be rearranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl PitchClass {
    /// All pitch classes in classification order.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// 1-based semitone index within the octave (C = 1 .. B = 12).
    pub fn semitone_index(self) -> i32 {
        match self {
            PitchClass::C => 1,
            PitchClass::Cs => 2,
            PitchClass::D => 3,
            PitchClass::Ds => 4,
            PitchClass::E => 5,
            PitchClass::F => 6,
            PitchClass::Fs => 7,
            PitchClass::G => 8,
            PitchClass::Gs => 9,
            PitchClass::A => 10,
            PitchClass::As => 11,
            PitchClass::B => 12,
        }
    }

    /// The canonical (sharp-spelled) name of this pitch class.
    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }

    /// Parses a note name into a pitch class.
    ///
    /// Sharp spellings are canonical; the usual flat aliases are accepted
    /// too ("Db" ≡ "C#", "Eb" ≡ "D#", "Gb" ≡ "F#", "Ab" ≡ "G#",
    /// "Bb" ≡ "A#").
    ///
    /// # Errors
    /// `PipelineError::UnknownNoteName` if the name is not one of the 12
    /// equal-tempered pitch classes or their aliases.
    pub fn from_name(name: &str) -> Result<PitchClass, PipelineError> {
        match name {
            "C" => Ok(PitchClass::C),
            "C#" | "Db" => Ok(PitchClass::Cs),
            "D" => Ok(PitchClass::D),
            "D#" | "Eb" => Ok(PitchClass::Ds),
            "E" => Ok(PitchClass::E),
            "F" => Ok(PitchClass::F),
            "F#" | "Gb" => Ok(PitchClass::Fs),
            "G" => Ok(PitchClass::G),
            "G#" | "Ab" => Ok(PitchClass::Gs),
            "A" => Ok(PitchClass::A),
            "A#" | "Bb" => Ok(PitchClass::As),
            "B" => Ok(PitchClass::B),
            other => Err(PipelineError::UnknownNoteName(other.to_string())),
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PitchClass::from_name(s)
    }
}

/// Rounds `log2(x)` to the nearest integer.
///
/// Used to find the octave (power of two) that brings a pitch class's base
/// frequency closest to a measured frequency.
fn closest_pow2(x: f32) -> i32 {
    (x.log2() + 0.5).floor() as i32
}

/// Process-wide tuning context: the A4 reference frequency and the
/// classification tolerance in Hz.
///
/// Built once at startup and read by all note math. The tolerance should be
/// at least half the analysis bin width so that every spectrum bin is
/// classifiable to at most one semitone.
#[derive(Debug, Clone)]
pub struct Tuning {
    reference_a4: f32,
    tolerance_hz: f32,
    /// Octave-zero frequency of each pitch class, in classification order.
    base: [f32; 12],
}

impl Tuning {
    /// Creates a tuning context anchored to the given A4 reference.
    ///
    /// The octave-zero frequency of every pitch class is precomputed here;
    /// A0 is `reference_a4 / 2^4` (27.5 Hz at standard 440 tuning).
    pub fn new(reference_a4: f32, tolerance_hz: f32) -> Self {
        let a0 = reference_a4 / 2.0_f32.powi(4);
        let a_index = PitchClass::A.semitone_index();
        let mut base = [0.0_f32; 12];
        for (i, pc) in PitchClass::ALL.iter().enumerate() {
            let semis = (pc.semitone_index() - a_index) as f32;
            base[i] = a0 * (semis / 12.0).exp2();
        }
        Self {
            reference_a4,
            tolerance_hz,
            base,
        }
    }

    /// The A4 reference frequency this context was built with.
    pub fn reference_a4(&self) -> f32 {
        self.reference_a4
    }

    /// The classification tolerance in Hz.
    pub fn tolerance_hz(&self) -> f32 {
        self.tolerance_hz
    }

    /// Returns the frequency of a pitch class at a given octave.
    ///
    /// `frequency_of(PitchClass::A, 4)` is the reference frequency itself;
    /// octave numbering follows scientific pitch notation (C4 ≈ 261.63 Hz).
    pub fn frequency_of(&self, pc: PitchClass, octave: i32) -> f32 {
        self.base[pc as usize] * (octave as f32).exp2()
    }

    /// Recovers the octave of a frequency already known to be `pc`.
    ///
    /// Rounds `log2(frequency / frequency_of(pc, 0))` to the nearest
    /// integer. The result is meaningless if `frequency` is not actually an
    /// octave of `pc`; callers must classify first.
    pub fn octave_of(&self, frequency: f32, pc: PitchClass) -> i32 {
        closest_pow2(frequency / self.base[pc as usize])
    }

    /// Tests whether `frequency` lies within `tolerance_hz` of some octave
    /// of the given pitch class.
    pub fn is_pitch_class(&self, frequency: f32, pc: PitchClass, tolerance_hz: f32) -> bool {
        let f0 = self.base[pc as usize];
        let octave = closest_pow2(frequency / f0);
        (frequency - f0 * (octave as f32).exp2()).abs() <= tolerance_hz
    }

    /// Classifies a frequency as a pitch class, or `None` if no class's
    /// nearest octave is within the context tolerance.
    ///
    /// Classes are tried in `PitchClass::ALL` order, so a frequency exactly
    /// on the boundary between two classes resolves to the earlier one.
    /// `None` is the "no note" answer, not a failure.
    pub fn classify(&self, frequency: f32) -> Option<PitchClass> {
        PitchClass::ALL
            .iter()
            .copied()
            .find(|&pc| self.is_pitch_class(frequency, pc, self.tolerance_hz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn standard() -> Tuning {
        Tuning::new(440.0, 1.0)
    }

    #[test]
    fn a4_is_the_reference() {
        let tuning = standard();
        assert_relative_eq!(tuning.frequency_of(PitchClass::A, 4), 440.0, epsilon = 1e-3);
    }

    #[test]
    fn known_frequencies() {
        let tuning = standard();
        assert_relative_eq!(
            tuning.frequency_of(PitchClass::C, 4),
            261.626,
            epsilon = 1e-2
        );
        assert_relative_eq!(tuning.frequency_of(PitchClass::A, 0), 27.5, epsilon = 1e-3);
        assert_relative_eq!(
            tuning.frequency_of(PitchClass::E, 5),
            659.255,
            epsilon = 1e-2
        );
    }

    #[test]
    fn classify_reference_and_middle_c() {
        let tuning = standard();
        assert_eq!(tuning.classify(440.0), Some(PitchClass::A));
        assert_eq!(tuning.classify(261.63), Some(PitchClass::C));
    }

    #[test]
    fn classify_rejects_quarter_tones() {
        // Halfway between A4 and A#4 is ~12 Hz from either note.
        let tuning = standard();
        assert_eq!(tuning.classify(453.0), None);
    }

    #[test]
    fn classify_round_trips_every_note() {
        // With a 0.3 Hz tolerance no two classes are ever that close
        // (the smallest gap, at octave 0, is just under 1 Hz).
        let tuning = Tuning::new(440.0, 0.3);
        for pc in PitchClass::ALL {
            for octave in 0..=6 {
                let f = tuning.frequency_of(pc, octave);
                assert_eq!(tuning.classify(f), Some(pc), "{pc}{octave} at {f} Hz");
            }
        }
    }

    #[test]
    fn octave_recovery() {
        let tuning = standard();
        assert_eq!(tuning.octave_of(440.0, PitchClass::A), 4);
        assert_eq!(tuning.octave_of(27.5, PitchClass::A), 0);
        assert_eq!(tuning.octave_of(261.63, PitchClass::C), 4);
        // Slightly detuned input still rounds to the right octave.
        assert_eq!(tuning.octave_of(442.5, PitchClass::A), 4);
    }

    #[test]
    fn name_parsing_and_aliases() {
        assert_eq!(PitchClass::from_name("C#").unwrap(), PitchClass::Cs);
        assert_eq!(PitchClass::from_name("Db").unwrap(), PitchClass::Cs);
        assert_eq!(PitchClass::from_name("Bb").unwrap(), PitchClass::As);
        assert_eq!("F#".parse::<PitchClass>().unwrap(), PitchClass::Fs);
        assert!(matches!(
            PitchClass::from_name("H"),
            Err(PipelineError::UnknownNoteName(_))
        ));
    }

    #[test]
    fn display_uses_sharp_spellings() {
        assert_eq!(PitchClass::Cs.to_string(), "C#");
        assert_eq!(PitchClass::B.to_string(), "B");
    }

    #[test]
    fn alternate_reference_shifts_everything() {
        let baroque = Tuning::new(415.0, 1.0);
        assert_relative_eq!(baroque.frequency_of(PitchClass::A, 4), 415.0, epsilon = 1e-3);
        assert_eq!(baroque.classify(415.0), Some(PitchClass::A));
        // 440 Hz is a semitone above the shifted A, within a third of a
        // hertz of the shifted A#4 (~439.68 Hz).
        assert_eq!(baroque.classify(440.0), Some(PitchClass::As));
    }
}
