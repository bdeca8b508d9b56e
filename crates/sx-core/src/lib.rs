//! Shared types and configuration for spectrascope.
//!
//! This crate holds the frame and snapshot types exchanged between the
//! analysis engine and its hosts, the static frequency-band table, and the
//! TOML configuration layer.

pub mod band;
pub mod config;
pub mod error;
pub mod frame;

pub use band::{BAND_COUNT, BandEnergies, FREQUENCY_BANDS, FrequencyBand};
pub use config::EngineConfig;
pub use error::CoreError;
pub use frame::{AnalysisSnapshot, BeatState, FrameSample, SpectralSnapshot, TimeDomainSnapshot};
