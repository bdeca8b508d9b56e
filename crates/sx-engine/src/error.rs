use thiserror::Error;

/// Errors originating from the analysis engine.
///
/// Only malformed input shapes fail; every numeric hazard is guarded instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Magnitude spectrum length differs from the configured bin count.
    #[error("Spectre de {actual} bins, {expected} attendus")]
    MagnitudeLength {
        /// Configured bin count.
        expected: usize,
        /// Length received.
        actual: usize,
    },

    /// Waveform length differs from the one fixed by the session's first frame.
    #[error("Waveform de {actual} échantillons, {expected} attendus")]
    WaveformLength {
        /// Latched waveform length.
        expected: usize,
        /// Length received.
        actual: usize,
    },

    /// Sample rate is not a positive finite number.
    #[error("Sample rate invalide : {0}")]
    InvalidSampleRate(f32),

    /// Frame sample rate differs from the session's.
    #[error("Sample rate {actual} Hz, session à {expected} Hz")]
    SampleRateMismatch {
        /// Session sample rate.
        expected: f32,
        /// Frame sample rate.
        actual: f32,
    },
}
