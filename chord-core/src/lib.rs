// chord-core/src/lib.rs

//! The core logic for real-time polyphonic chord detection.
//! This crate turns a time-domain audio signal into a short list of
//! currently-sounding musical notes: anti-alias-aware decimation,
//! windowing, spectrum computation, equal-tempered note classification,
//! and greedy top-K voice extraction. It is completely headless and
//! contains no UI code.

pub mod audio;
pub mod config;
pub mod dsp;
pub mod error;
pub mod fft;
pub mod pipeline;
pub mod tuning;
pub mod voices;

pub use config::DetectorConfig;
pub use error::PipelineError;
pub use pipeline::{AnalysisFrame, Pipeline};
pub use tuning::{PitchClass, Tuning};
pub use voices::{NoteCandidate, Voice};
