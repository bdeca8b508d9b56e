use sx_core::band::BandEnergies;
use sx_core::config::EngineConfig;
use sx_core::frame::{AnalysisSnapshot, BeatState, FrameSample};

use crate::bands::aggregate_bands;
use crate::beat::BeatDetector;
use crate::error::EngineError;
use crate::history::HistoryBuffer;
use crate::smoothing::{BandSmoother, ValueSmoother};
use crate::spectral::{compute_spectral, normalize_bytes};
use crate::time_domain::{compute_time_domain, normalize_waveform};

/// Sample rate used by `EngineState::default()`.
const FALLBACK_SAMPLE_RATE: f32 = 44100.0;

/// Complete analysis state for one session.
///
/// Owns the rolling history, the beat detector, smoothers, the normalized
/// buffers of the last frame and the last published snapshot. Advanced one
/// frame at a time by [`advance`].
#[derive(Clone, Debug)]
pub struct EngineState {
    config: EngineConfig,
    sample_rate: f32,
    history: HistoryBuffer,
    beat: BeatDetector,
    band_smoother: BandSmoother,
    energy_smoother: ValueSmoother,
    smoothed_energy: f32,
    /// Normalized magnitude spectrum of the last frame [0.0, 1.0].
    frequency_data: Vec<f32>,
    /// Normalized waveform of the last frame [-1.0, 1.0].
    time_domain_data: Vec<f32>,
    /// Waveform length fixed by the first frame of the session.
    waveform_len: Option<usize>,
    snapshot: AnalysisSnapshot,
    frames: u64,
}

/// A frame whose shape has been checked against an [`EngineState`].
///
/// Only [`EngineState::validate`] builds one, so [`advance`] never has to fail.
#[derive(Clone, Copy, Debug)]
pub struct ValidFrame<'a> {
    frame: FrameSample<'a>,
}

impl EngineState {
    /// Create the state for a session. The config is clamped, never rejected.
    ///
    /// # Errors
    /// Returns `InvalidSampleRate` if `sample_rate` is not positive and finite.
    pub fn new(mut config: EngineConfig, sample_rate: f32) -> Result<Self, EngineError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        config.clamp_all();
        Ok(Self::build(config, sample_rate))
    }

    fn build(config: EngineConfig, sample_rate: f32) -> Self {
        let beat = BeatDetector::new(config.beat_threshold, config.beat_sensitivity);
        Self {
            history: HistoryBuffer::with_capacity(config.max_history_length),
            band_smoother: BandSmoother::new(config.smoothing),
            energy_smoother: ValueSmoother::new(config.smoothing),
            smoothed_energy: 0.0,
            frequency_data: Vec::new(),
            time_domain_data: Vec::new(),
            waveform_len: None,
            snapshot: AnalysisSnapshot {
                beat: beat.state(),
                ..AnalysisSnapshot::default()
            },
            beat,
            config,
            sample_rate,
            frames: 0,
        }
    }

    /// Check a frame's shape against the session.
    ///
    /// # Errors
    /// Fails on a magnitude length other than the bin count, a waveform length
    /// other than the one latched by the session's first frame, or a sample
    /// rate that is invalid or differs from the session's.
    // Session rate is stored as given, so the exact compare is intended.
    #[allow(clippy::float_cmp)]
    pub fn validate<'a>(&self, frame: &FrameSample<'a>) -> Result<ValidFrame<'a>, EngineError> {
        let expected_bins = self.config.bin_count();
        if frame.magnitude.len() != expected_bins {
            return Err(EngineError::MagnitudeLength {
                expected: expected_bins,
                actual: frame.magnitude.len(),
            });
        }
        if let Some(expected) = self.waveform_len
            && frame.waveform.len() != expected
        {
            return Err(EngineError::WaveformLength {
                expected,
                actual: frame.waveform.len(),
            });
        }
        if !frame.sample_rate.is_finite() || frame.sample_rate <= 0.0 {
            return Err(EngineError::InvalidSampleRate(frame.sample_rate));
        }
        if frame.sample_rate != self.sample_rate {
            return Err(EngineError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: frame.sample_rate,
            });
        }
        Ok(ValidFrame { frame: *frame })
    }

    /// Clear history, beat memory and smoothers. Configuration is kept.
    ///
    /// The normalized buffers are emptied and the waveform length is
    /// released, as before the first frame.
    pub fn reset(&mut self) {
        self.history.clear();
        self.beat.reset();
        self.band_smoother.reset();
        self.energy_smoother.reset();
        self.smoothed_energy = 0.0;
        self.frequency_data.clear();
        self.time_domain_data.clear();
        self.waveform_len = None;
        self.snapshot = AnalysisSnapshot {
            beat: self.beat.state(),
            ..AnalysisSnapshot::default()
        };
        self.frames = 0;
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    #[inline]
    #[must_use]
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Last published snapshot.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> &AnalysisSnapshot {
        &self.snapshot
    }

    /// Waveform length accepted by this session, once a frame has fixed it.
    #[inline]
    #[must_use]
    pub fn waveform_len(&self) -> Option<usize> {
        self.waveform_len
    }

    /// Frames processed since construction or the last reset.
    #[inline]
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::build(EngineConfig::default(), FALLBACK_SAMPLE_RATE)
    }
}

/// Advance the state by one frame.
///
/// Bands, spectral and time-domain statistics are computed from the frame
/// and the latest history entry, then the beat detector runs against the
/// history baseline, and only then is the frame appended to history.
///
/// # Example
/// ```
/// use sx_core::config::EngineConfig;
/// use sx_core::frame::FrameSample;
/// use sx_engine::engine::{EngineState, advance};
///
/// let state = EngineState::new(EngineConfig::default(), 44100.0).unwrap();
/// let magnitude = vec![255u8; 1024];
/// let waveform = vec![128u8; 2048];
/// let frame = FrameSample::new(&magnitude, &waveform, 44100.0);
/// let valid = state.validate(&frame).unwrap();
/// let (state, snapshot) = advance(state, valid);
/// assert!((snapshot.spectral.total_energy - 1.0).abs() < 1e-6);
/// assert_eq!(state.history().len(), 1);
/// ```
#[must_use]
pub fn advance(mut state: EngineState, frame: ValidFrame<'_>) -> (EngineState, AnalysisSnapshot) {
    let frame = frame.frame;

    normalize_bytes(frame.magnitude, &mut state.frequency_data);
    normalize_waveform(frame.waveform, &mut state.time_domain_data);
    state.waveform_len.get_or_insert(frame.waveform.len());

    let bands = aggregate_bands(frame.magnitude, frame.sample_rate);
    let previous = state.history.latest().map(|e| e.spectrum.as_slice());
    let spectral = compute_spectral(&state.frequency_data, frame.bin_width(), previous);
    let time_domain = compute_time_domain(&state.time_domain_data, &state.frequency_data);

    let beat = state
        .beat
        .process(spectral.total_energy, state.history.mean_energy());
    state
        .history
        .append(&state.frequency_data, spectral.total_energy);

    state.band_smoother.smooth(&bands);
    state.smoothed_energy = state.energy_smoother.smooth(spectral.total_energy);

    let snapshot = AnalysisSnapshot {
        bands,
        spectral,
        time_domain,
        beat,
    };
    state.snapshot = snapshot;
    state.frames += 1;
    (state, snapshot)
}

/// Spectral analysis engine for one audio session.
///
/// Call [`update`](Self::update) once per tick, then read the accessors.
/// Not meant for concurrent use: callers serialize `update`.
///
/// # Example
/// ```
/// use sx_core::config::EngineConfig;
/// use sx_core::frame::FrameSample;
/// use sx_engine::AnalysisEngine;
///
/// let mut engine = AnalysisEngine::new(EngineConfig::default(), 44100.0).unwrap();
/// let magnitude = vec![0u8; 1024];
/// let waveform = vec![128u8; 2048];
/// engine.update(&FrameSample::new(&magnitude, &waveform, 44100.0)).unwrap();
/// assert!(!engine.is_beat_detected());
/// assert_eq!(engine.band_energy("nonexistent"), 0.0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct AnalysisEngine {
    state: EngineState,
}

impl AnalysisEngine {
    /// Create an engine for a session.
    ///
    /// # Errors
    /// Returns `InvalidSampleRate` if `sample_rate` is not positive and finite.
    pub fn new(config: EngineConfig, sample_rate: f32) -> Result<Self, EngineError> {
        let state = EngineState::new(config, sample_rate)?;
        log::info!(
            "Moteur d'analyse : {} bins @ {sample_rate}Hz, historique {} frames",
            state.config.bin_count(),
            state.config.max_history_length
        );
        Ok(Self { state })
    }

    /// Wrap an existing state.
    #[must_use]
    pub fn from_state(state: EngineState) -> Self {
        Self { state }
    }

    /// Analyse one frame.
    ///
    /// # Errors
    /// Returns an error for a malformed frame; the state is left untouched.
    pub fn update(&mut self, frame: &FrameSample<'_>) -> Result<&AnalysisSnapshot, EngineError> {
        let valid = self.state.validate(frame).inspect_err(|e| {
            log::warn!("Frame rejetée : {e}");
        })?;
        let state = std::mem::take(&mut self.state);
        let (state, _) = advance(state, valid);
        self.state = state;
        Ok(&self.state.snapshot)
    }

    /// Normalized magnitude spectrum of the last frame. Empty before the
    /// first frame and after [`reset`](Self::reset).
    #[must_use]
    pub fn frequency_data(&self) -> &[f32] {
        &self.state.frequency_data
    }

    /// Normalized waveform of the last frame.
    #[must_use]
    pub fn time_domain_data(&self) -> &[f32] {
        &self.state.time_domain_data
    }

    /// Energy of the named band; 0.0 for an unknown name.
    #[must_use]
    pub fn band_energy(&self, name: &str) -> f32 {
        self.state.snapshot.bands.get(name)
    }

    #[must_use]
    pub fn all_band_energies(&self) -> BandEnergies {
        self.state.snapshot.bands
    }

    /// Band energies after exponential smoothing.
    #[must_use]
    pub fn smoothed_band_energies(&self) -> BandEnergies {
        self.state.band_smoother.current()
    }

    /// Total energy after exponential smoothing.
    #[must_use]
    pub fn smoothed_energy(&self) -> f32 {
        self.state.smoothed_energy
    }

    /// Spectral, time-domain, band and beat statistics of the last frame.
    #[must_use]
    pub fn stats(&self) -> &AnalysisSnapshot {
        &self.state.snapshot
    }

    #[must_use]
    pub fn is_beat_detected(&self) -> bool {
        self.state.snapshot.beat.is_beat
    }

    #[must_use]
    pub fn beat_energy(&self) -> f32 {
        self.state.snapshot.beat.beat_energy
    }

    #[must_use]
    pub fn beat_state(&self) -> BeatState {
        self.state.snapshot.beat
    }

    /// Set the beat threshold, clamped to [0, 1].
    pub fn set_beat_threshold(&mut self, value: f32) {
        self.state.beat.set_threshold(value);
        self.state.config.beat_threshold = self.state.beat.threshold();
        self.state.snapshot.beat.threshold = self.state.beat.threshold();
    }

    /// Set the beat sensitivity, clamped to [0.5, 2].
    pub fn set_beat_sensitivity(&mut self, value: f32) {
        self.state.beat.set_sensitivity(value);
        self.state.config.beat_sensitivity = self.state.beat.sensitivity();
        self.state.snapshot.beat.sensitivity = self.state.beat.sensitivity();
    }

    /// Number of frames currently held in history.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.state.history.len()
    }

    /// `(mean, stddev)` of total energy over history.
    #[must_use]
    pub fn energy_baseline(&self) -> (f32, f32) {
        (
            self.state.history.mean_energy(),
            self.state.history.energy_stddev(),
        )
    }

    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.state.config.bin_count()
    }

    #[must_use]
    pub fn sample_rate(&self) -> f32 {
        self.state.sample_rate
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.state.config
    }

    #[must_use]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Discard history, beat memory and smoothing.
    pub fn reset(&mut self) {
        log::debug!("Reset du moteur après {} frames", self.state.frames);
        self.state.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;
    const BINS: usize = 1024;
    const WAVE: usize = 2048;

    fn engine() -> AnalysisEngine {
        AnalysisEngine::new(EngineConfig::default(), SR).unwrap_or_else(|e| panic!("{e}"))
    }

    fn run(engine: &mut AnalysisEngine, magnitude: &[u8], waveform: &[u8]) -> AnalysisSnapshot {
        *engine
            .update(&FrameSample::new(magnitude, waveform, SR))
            .unwrap_or_else(|e| panic!("{e}"))
    }

    fn silent_wave() -> Vec<u8> {
        vec![128u8; WAVE]
    }

    #[test]
    fn end_to_end_single_tone_near_100hz() {
        let mut e = engine();
        let bin_width = SR * 0.5 / BINS as f32;
        let idx = (100.0 / bin_width).round() as usize;
        let mut magnitude = vec![0u8; BINS];
        magnitude[idx] = 255;

        let snap = run(&mut e, &magnitude, &silent_wave());
        assert!((snap.spectral.peak_frequency - 100.0).abs() <= bin_width);
        assert!((snap.spectral.spectral_centroid - 100.0).abs() <= bin_width);
        assert!(snap.time_domain.entropy.abs() < 1e-6);
        assert!((snap.spectral.total_energy - 1.0 / 1024.0).abs() < 1e-7);
        assert!(snap.bands.get("bass") > 0.0);
    }

    #[test]
    fn flux_zero_on_first_update_then_positive() {
        let mut e = engine();
        let first = run(&mut e, &vec![100u8; BINS], &silent_wave());
        assert_eq!(first.spectral.spectral_flux, 0.0);
        let second = run(&mut e, &vec![200u8; BINS], &silent_wave());
        assert!(second.spectral.spectral_flux > 0.0);
    }

    #[test]
    fn history_capped_at_max_length() {
        let mut e = engine();
        for i in 0..75u8 {
            run(&mut e, &vec![i; BINS], &silent_wave());
        }
        assert_eq!(e.history_len(), 60);
        assert_eq!(e.state().frames(), 75);
    }

    #[test]
    fn full_scale_spectrum_stats() {
        let mut e = engine();
        let snap = run(&mut e, &vec![255u8; BINS], &silent_wave());
        assert!((snap.spectral.total_energy - 1.0).abs() < 1e-6);
        assert!((snap.time_domain.entropy - 10.0).abs() < 1e-3);
        assert!(snap.bands.values().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn alternating_waveform_zero_crossing() {
        let mut e = engine();
        let wave: Vec<u8> = (0..WAVE).map(|i| if i % 2 == 0 { 255 } else { 1 }).collect();
        let snap = run(&mut e, &vec![0u8; BINS], &wave);
        assert!(snap.time_domain.zero_crossing_rate > 0.99);
        assert!(snap.time_domain.variance > 0.9);
    }

    #[test]
    fn first_energized_frame_is_a_beat() {
        let mut e = engine();
        run(&mut e, &vec![0u8; BINS], &silent_wave());
        assert!(!e.is_beat_detected());
        run(&mut e, &vec![10u8; BINS], &silent_wave());
        assert!(e.is_beat_detected());
        let energy = 10.0 / 255.0;
        assert!((e.beat_energy() - energy * 1.2).abs() < 1e-5);
    }

    #[test]
    fn steady_energy_is_not_a_beat() {
        let mut e = engine();
        for _ in 0..5 {
            run(&mut e, &vec![80u8; BINS], &silent_wave());
        }
        assert!(!e.is_beat_detected());
        assert!((e.beat_state().prev_energy - 80.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn loud_frame_after_quiet_history_is_a_beat() {
        let mut e = engine();
        for _ in 0..10 {
            run(&mut e, &vec![40u8; BINS], &silent_wave());
        }
        run(&mut e, &vec![200u8; BINS], &silent_wave());
        assert!(e.is_beat_detected());
        let (mean, stddev) = e.energy_baseline();
        assert!(mean > 40.0 / 255.0);
        assert!(stddev > 0.0);
    }

    #[test]
    fn setters_clamp_through_engine() {
        let mut e = engine();
        e.set_beat_threshold(-1.0);
        assert_eq!(e.beat_state().threshold, 0.0);
        e.set_beat_threshold(5.0);
        assert_eq!(e.config().beat_threshold, 1.0);
        e.set_beat_sensitivity(0.0);
        assert_eq!(e.beat_state().sensitivity, 0.5);
        e.set_beat_sensitivity(10.0);
        assert_eq!(e.config().beat_sensitivity, 2.0);
    }

    #[test]
    fn unknown_band_is_zero() {
        let mut e = engine();
        run(&mut e, &vec![255u8; BINS], &silent_wave());
        assert_eq!(e.band_energy("nonexistent"), 0.0);
        assert!(e.band_energy("mid") > 0.0);
        assert_eq!(e.all_band_energies().to_map().len(), 7);
    }

    #[test]
    fn malformed_frames_fail_without_touching_state() {
        let mut e = engine();
        run(&mut e, &vec![50u8; BINS], &silent_wave());
        let before = *e.stats();

        let short = vec![0u8; BINS - 1];
        let wave = silent_wave();
        let err = e.update(&FrameSample::new(&short, &wave, SR)).err();
        assert_eq!(
            err,
            Some(EngineError::MagnitudeLength {
                expected: BINS,
                actual: BINS - 1
            })
        );

        let magnitude = vec![0u8; BINS];
        let err = e.update(&FrameSample::new(&magnitude, &wave[..10], SR)).err();
        assert_eq!(
            err,
            Some(EngineError::WaveformLength {
                expected: WAVE,
                actual: 10
            })
        );

        let err = e.update(&FrameSample::new(&magnitude, &wave, 48000.0)).err();
        assert!(matches!(err, Some(EngineError::SampleRateMismatch { .. })));

        let err = e.update(&FrameSample::new(&magnitude, &wave, f32::NAN)).err();
        assert!(matches!(err, Some(EngineError::InvalidSampleRate(_))));

        assert_eq!(e.history_len(), 1);
        assert_eq!(*e.stats(), before);
    }

    #[test]
    fn invalid_session_sample_rate_rejected() {
        let err = AnalysisEngine::new(EngineConfig::default(), 0.0).err();
        assert_eq!(err, Some(EngineError::InvalidSampleRate(0.0)));
    }

    #[test]
    fn construction_clamps_config() {
        let config = EngineConfig {
            transform_size: 100,
            beat_threshold: 3.0,
            max_history_length: 0,
            ..EngineConfig::default()
        };
        let e = AnalysisEngine::new(config, SR).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(e.bin_count(), 64);
        assert_eq!(e.beat_state().threshold, 1.0);
        assert_eq!(e.state().history().capacity(), 1);
    }

    #[test]
    fn reset_restores_first_frame_semantics() {
        let mut e = engine();
        run(&mut e, &vec![90u8; BINS], &silent_wave());
        run(&mut e, &vec![120u8; BINS], &silent_wave());
        e.set_beat_threshold(0.9);
        e.reset();

        assert_eq!(e.history_len(), 0);
        assert_eq!(e.beat_state().prev_energy, 0.0);
        assert!((e.beat_state().threshold - 0.9).abs() < f32::EPSILON);
        assert!(e.frequency_data().is_empty());
        assert!(e.time_domain_data().is_empty());
        assert_eq!(e.state().waveform_len(), None);

        let snap = run(&mut e, &vec![200u8; BINS], &silent_wave());
        assert_eq!(snap.spectral.spectral_flux, 0.0);
        assert!(snap.beat.is_beat);
    }

    #[test]
    fn smoothing_passes_first_frame_through() {
        let mut e = engine();
        run(&mut e, &vec![255u8; BINS], &silent_wave());
        assert_eq!(e.smoothed_band_energies(), e.all_band_energies());
        assert!((e.smoothed_energy() - 1.0).abs() < 1e-6);

        run(&mut e, &vec![0u8; BINS], &silent_wave());
        // 0.7 × 1.0 + 0.3 × 0.0
        assert!((e.smoothed_energy() - 0.7).abs() < 1e-6);
        assert!(e.smoothed_band_energies().get("mid") > e.band_energy("mid"));
    }

    #[test]
    fn normalized_buffers_exposed() {
        let mut e = engine();
        let mut wave = silent_wave();
        wave[0] = 0;
        run(&mut e, &vec![51u8; BINS], &wave);
        assert_eq!(e.frequency_data().len(), BINS);
        assert!((e.frequency_data()[0] - 0.2).abs() < 1e-6);
        assert_eq!(e.time_domain_data()[0], -1.0);
    }

    #[test]
    fn buffers_empty_before_first_frame() {
        let e = engine();
        assert!(e.frequency_data().is_empty());
        assert!(e.time_domain_data().is_empty());
        assert_eq!(e.state().waveform_len(), None);
    }

    #[test]
    fn waveform_of_bin_count_length_is_accepted() {
        let mut e = engine();
        let half = vec![128u8; BINS];
        let snap = run(&mut e, &vec![10u8; BINS], &half);
        assert_eq!(snap.time_domain.variance, 0.0);
        assert_eq!(e.time_domain_data().len(), BINS);
        assert_eq!(e.state().waveform_len(), Some(BINS));

        // Latched for the session until reset.
        let err = e.update(&FrameSample::new(&vec![10u8; BINS], &silent_wave(), SR)).err();
        assert_eq!(
            err,
            Some(EngineError::WaveformLength {
                expected: BINS,
                actual: WAVE
            })
        );
        e.reset();
        run(&mut e, &vec![10u8; BINS], &silent_wave());
        assert_eq!(e.state().waveform_len(), Some(WAVE));
    }

    #[test]
    fn largest_transform_statistics_are_exact() {
        let config = EngineConfig {
            transform_size: 32768,
            ..EngineConfig::default()
        };
        let mut e = AnalysisEngine::new(config, SR).unwrap_or_else(|e| panic!("{e}"));
        let bins = e.bin_count();
        assert_eq!(bins, 16384);
        let snap = run(&mut e, &vec![80u8; bins], &vec![128u8; 32768]);
        assert!((snap.time_domain.entropy - (bins as f32).log2()).abs() < 1e-6);
        assert!((snap.spectral.total_energy - 80.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn advance_is_a_pure_transform_of_state() {
        let state = EngineState::new(EngineConfig::default(), SR).unwrap_or_else(|e| panic!("{e}"));
        let magnitude = vec![30u8; BINS];
        let wave = silent_wave();
        let frame = FrameSample::new(&magnitude, &wave, SR);

        let valid = state.validate(&frame).unwrap_or_else(|e| panic!("{e}"));
        let (a, snap_a) = advance(state.clone(), valid);
        let (b, snap_b) = advance(state, valid);
        assert_eq!(snap_a, snap_b);
        assert_eq!(a.history().len(), b.history().len());
    }

    #[test]
    fn engine_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AnalysisEngine>();
    }
}
