//! # Error Types
//!
//! Typed precondition failures for the detection pipeline. Every variant is
//! a local, synchronous failure raised at the call that violated a contract;
//! none of them is retried automatically. The pipeline driver treats any of
//! these as "no voices this cycle" and carries on with the next frame.

use thiserror::Error;

/// Errors raised by the signal-to-note pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A decimation factor of zero was supplied. The factor must be a
    /// positive integer for the new Nyquist frequency to be well defined.
    #[error("decimation factor must be a positive integer, got {0}")]
    InvalidFactor(usize),

    /// A window length larger than the buffer it should taper.
    #[error("window length {len} exceeds buffer size {buffer}")]
    LengthOutOfRange { len: usize, buffer: usize },

    /// A note name that is not one of the 12 equal-tempered pitch classes
    /// (sharp spellings and their flat aliases are both accepted).
    #[error("unknown note name: {0:?}")]
    UnknownNoteName(String),

    /// A maximum voice count of zero was requested from the extractor.
    #[error("max voice count must be positive")]
    InvalidVoiceCount,

    /// An input/output buffer pair whose lengths disagree with the
    /// configured frame size.
    #[error("buffer size mismatch: expected {expected} samples, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}
