use serde::Serialize;

use crate::band::BandEnergies;

/// Raw input for one analysis tick, supplied by the capture side.
///
/// Borrowed for the duration of a single `update`; the engine copies what it
/// keeps.
///
/// # Example
/// ```
/// use sx_core::frame::FrameSample;
/// let magnitude = vec![0u8; 1024];
/// let waveform = vec![128u8; 2048];
/// let frame = FrameSample::new(&magnitude, &waveform, 44100.0);
/// assert_eq!(frame.bin_count(), 1024);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FrameSample<'a> {
    /// Spectre de magnitude, un octet par bin (0–255).
    pub magnitude: &'a [u8],
    /// Waveform temporelle encodée en octets, 128 = zéro.
    pub waveform: &'a [u8],
    /// Sample rate in Hz.
    pub sample_rate: f32,
}

impl<'a> FrameSample<'a> {
    #[must_use]
    pub fn new(magnitude: &'a [u8], waveform: &'a [u8], sample_rate: f32) -> Self {
        Self {
            magnitude,
            waveform,
            sample_rate,
        }
    }

    /// Number of frequency bins.
    #[inline]
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.magnitude.len()
    }

    /// Width of one bin in Hz (`nyquist / bin_count`). 0 for an empty spectrum.
    #[inline]
    #[must_use]
    pub fn bin_width(&self) -> f32 {
        if self.magnitude.is_empty() {
            return 0.0;
        }
        self.sample_rate * 0.5 / self.magnitude.len() as f32
    }
}

/// Statistiques de forme spectrale, recalculées entièrement à chaque frame.
///
/// # Example
/// ```
/// use sx_core::frame::SpectralSnapshot;
/// let s = SpectralSnapshot::default();
/// assert_eq!(s.spectral_flux, 0.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SpectralSnapshot {
    /// Mean normalized magnitude [0.0, 1.0].
    pub total_energy: f32,
    /// Frequency (Hz) of the strongest bin, first one on ties.
    pub peak_frequency: f32,
    /// Magnitude-weighted mean frequency (Hz).
    pub spectral_centroid: f32,
    /// Magnitude-weighted standard deviation around the centroid (Hz).
    pub spectral_spread: f32,
    /// RMS difference against the previous frame's normalized spectrum.
    pub spectral_flux: f32,
}

/// Time-domain statistics plus spectral entropy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TimeDomainSnapshot {
    /// Variance of the waveform normalized to [-1, 1].
    pub variance: f32,
    /// Fraction of adjacent sample pairs crossing zero.
    pub zero_crossing_rate: f32,
    /// Shannon entropy (bits) of the magnitude distribution.
    pub entropy: f32,
}

/// Beat detector output and configuration for one frame.
///
/// # Example
/// ```
/// use sx_core::frame::BeatState;
/// let b = BeatState::default();
/// assert!(!b.is_beat);
/// assert!((b.threshold - 0.6).abs() < f32::EPSILON);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BeatState {
    /// True si un beat est détecté dans cette frame.
    pub is_beat: bool,
    /// Current energy, amplified by `sensitivity` on a beat.
    pub beat_energy: f32,
    /// Energy of the previous frame.
    pub prev_energy: f32,
    /// Multiplier on the history baseline [0.0, 1.0].
    pub threshold: f32,
    /// Beat-energy amplification [0.5, 2.0].
    pub sensitivity: f32,
}

impl Default for BeatState {
    fn default() -> Self {
        Self {
            is_beat: false,
            beat_energy: 0.0,
            prev_energy: 0.0,
            threshold: crate::config::DEFAULT_BEAT_THRESHOLD,
            sensitivity: crate::config::DEFAULT_BEAT_SENSITIVITY,
        }
    }
}

/// Everything the engine publishes for one frame.
///
/// Écrit par le moteur, lu par les consommateurs (rendu, UI).
/// Taille fixe, Copy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    /// Per-band average energies.
    pub bands: BandEnergies,
    /// Spectral shape statistics.
    pub spectral: SpectralSnapshot,
    /// Time-domain statistics.
    pub time_domain: TimeDomainSnapshot,
    /// Beat detector state after this frame.
    pub beat: BeatState,
}
