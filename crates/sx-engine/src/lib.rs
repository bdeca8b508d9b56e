// Spectral statistics, history, and beat detection for spectrascope.

pub mod bands;
pub mod beat;
pub mod engine;
pub mod error;
pub mod history;
pub mod smoothing;
pub mod spectral;
pub mod time_domain;

pub use engine::{AnalysisEngine, EngineState, ValidFrame, advance};
pub use error::EngineError;
