use sx_core::config::{BEAT_SENSITIVITY_RANGE, BEAT_THRESHOLD_RANGE};
use sx_core::frame::BeatState;

/// Energy-based beat detection with an adaptive threshold.
///
/// A frame is a beat when its total energy exceeds `threshold × baseline`
/// (the mean energy held in history) and rose since the previous frame.
/// Re-evaluated from scratch every frame; only `prev_energy` carries over.
///
/// With an empty history the baseline is 0, so the first frame carrying any
/// energy after silence is flagged as a beat.
///
/// # Example
/// ```
/// use sx_engine::beat::BeatDetector;
/// let mut detector = BeatDetector::new(0.6, 1.2);
/// let state = detector.process(0.4, 0.0);
/// assert!(state.is_beat);
/// assert!((state.beat_energy - 0.48).abs() < 1e-6);
/// ```
#[derive(Clone, Debug)]
pub struct BeatDetector {
    /// Energy of the previous frame.
    prev_energy: f32,
    /// Multiplier on the baseline [0.0, 1.0].
    threshold: f32,
    /// Beat-energy amplification [0.5, 2.0].
    sensitivity: f32,
    /// Result of the last `process` call.
    last: BeatState,
}

impl BeatDetector {
    /// Create a detector; out-of-range parameters are clamped.
    #[must_use]
    pub fn new(threshold: f32, sensitivity: f32) -> Self {
        let mut detector = Self {
            prev_energy: 0.0,
            threshold: sx_core::config::DEFAULT_BEAT_THRESHOLD,
            sensitivity: sx_core::config::DEFAULT_BEAT_SENSITIVITY,
            last: BeatState::default(),
        };
        detector.set_threshold(threshold);
        detector.set_sensitivity(sensitivity);
        detector
    }

    /// Evaluate one frame.
    ///
    /// `baseline` is the mean total energy of the frames in history, 0.0 when
    /// history is empty.
    pub fn process(&mut self, current_energy: f32, baseline: f32) -> BeatState {
        let energy_threshold = self.threshold * baseline;
        let delta = current_energy - self.prev_energy;
        let is_beat = current_energy > energy_threshold && delta > 0.0;

        let beat_energy = if is_beat {
            current_energy * self.sensitivity
        } else {
            current_energy
        };

        if is_beat {
            log::trace!(
                "beat: energy {current_energy:.4} > seuil {energy_threshold:.4}, delta {delta:.4}"
            );
        }

        self.prev_energy = current_energy;
        self.last = BeatState {
            is_beat,
            beat_energy,
            prev_energy: self.prev_energy,
            threshold: self.threshold,
            sensitivity: self.sensitivity,
        };
        self.last
    }

    /// Set the threshold multiplier, clamped to [0, 1]. NaN is ignored.
    pub fn set_threshold(&mut self, value: f32) {
        if let Some(v) = clamp_param("threshold", value, BEAT_THRESHOLD_RANGE) {
            self.threshold = v;
            self.last.threshold = v;
        }
    }

    /// Set the beat amplification, clamped to [0.5, 2]. NaN is ignored.
    pub fn set_sensitivity(&mut self, value: f32) {
        if let Some(v) = clamp_param("sensitivity", value, BEAT_SENSITIVITY_RANGE) {
            self.sensitivity = v;
            self.last.sensitivity = v;
        }
    }

    #[inline]
    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[inline]
    #[must_use]
    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    #[inline]
    #[must_use]
    pub fn prev_energy(&self) -> f32 {
        self.prev_energy
    }

    /// Last evaluated state (default before the first frame).
    #[inline]
    #[must_use]
    pub fn state(&self) -> BeatState {
        self.last
    }

    /// Forget the previous energy and last result; keeps threshold and sensitivity.
    pub fn reset(&mut self) {
        self.prev_energy = 0.0;
        self.last = BeatState {
            threshold: self.threshold,
            sensitivity: self.sensitivity,
            ..BeatState::default()
        };
    }
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new(
            sx_core::config::DEFAULT_BEAT_THRESHOLD,
            sx_core::config::DEFAULT_BEAT_SENSITIVITY,
        )
    }
}

fn clamp_param(name: &str, value: f32, (lo, hi): (f32, f32)) -> Option<f32> {
    if value.is_nan() {
        log::warn!("{name} NaN ignoré");
        return None;
    }
    Some(value.clamp(lo, hi))
}
