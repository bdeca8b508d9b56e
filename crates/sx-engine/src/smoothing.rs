use sx_core::band::{BAND_COUNT, BandEnergies};

/// Exponential smoothing of a single value.
///
/// `y = factor * previous + (1 - factor) * current`. The previous value starts
/// unset, so the first call returns its input unchanged.
///
/// # Example
/// ```
/// use sx_engine::smoothing::ValueSmoother;
/// let mut s = ValueSmoother::new(0.5);
/// assert_eq!(s.smooth(1.0), 1.0);
/// assert_eq!(s.smooth(0.0), 0.5);
/// ```
#[derive(Clone, Debug)]
pub struct ValueSmoother {
    factor: f32,
    prev: f32,
    initialized: bool,
}

impl ValueSmoother {
    /// Create a smoother. `factor` is clamped to [0.0, 1.0]; 0 = raw input.
    #[must_use]
    pub fn new(factor: f32) -> Self {
        Self {
            factor: if factor.is_nan() {
                0.0
            } else {
                factor.clamp(0.0, 1.0)
            },
            prev: 0.0,
            initialized: false,
        }
    }

    /// Smooth `current` against the previous output.
    pub fn smooth(&mut self, current: f32) -> f32 {
        if !self.initialized {
            self.prev = current;
            self.initialized = true;
            return current;
        }
        let smoothed = blend(self.factor, current, self.prev);
        self.prev = smoothed;
        smoothed
    }

    /// Forget the previous value; the next call passes through again.
    pub fn reset(&mut self) {
        self.prev = 0.0;
        self.initialized = false;
    }
}

/// Per-band exponential smoothing of `BandEnergies`.
#[derive(Clone, Debug)]
pub struct BandSmoother {
    factor: f32,
    prev: BandEnergies,
    initialized: bool,
}

impl BandSmoother {
    #[must_use]
    pub fn new(factor: f32) -> Self {
        Self {
            factor: ValueSmoother::new(factor).factor,
            prev: BandEnergies::default(),
            initialized: false,
        }
    }

    /// Smooth every band; the first call returns `current` as is.
    pub fn smooth(&mut self, current: &BandEnergies) -> BandEnergies {
        if !self.initialized {
            self.prev = *current;
            self.initialized = true;
            return *current;
        }

        let mut values = [0.0f32; BAND_COUNT];
        for ((out, &cur), &prev) in values
            .iter_mut()
            .zip(current.values())
            .zip(self.prev.values())
        {
            *out = blend(self.factor, cur, prev);
        }
        self.prev = BandEnergies::from_values(values);
        self.prev
    }

    /// Last smoothed output (default before the first call).
    #[inline]
    #[must_use]
    pub fn current(&self) -> BandEnergies {
        self.prev
    }

    pub fn reset(&mut self) {
        self.prev = BandEnergies::default();
        self.initialized = false;
    }
}

#[inline(always)]
fn blend(factor: f32, current: f32, previous: f32) -> f32 {
    factor * previous + (1.0 - factor) * current
}
