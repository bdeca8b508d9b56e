use sx_core::frame::TimeDomainSnapshot;

/// Normalize byte waveform samples to `(b - 128) / 128` into `out`.
///
/// # Example
/// ```
/// use sx_engine::time_domain::normalize_waveform;
/// let mut out = Vec::new();
/// normalize_waveform(&[0, 128, 255], &mut out);
/// assert_eq!(out[0], -1.0);
/// assert_eq!(out[1], 0.0);
/// ```
pub fn normalize_waveform(bytes: &[u8], out: &mut Vec<f32>) {
    if out.len() != bytes.len() {
        out.resize(bytes.len(), 0.0);
    }
    for (slot, &b) in out.iter_mut().zip(bytes) {
        *slot = (f32::from(b) - 128.0) / 128.0;
    }
}

/// Waveform variance, zero-crossing rate, and spectral entropy.
///
/// `waveform` is normalized to [-1, 1]; `spectrum` is the normalized
/// magnitude spectrum used for entropy.
#[must_use]
pub fn compute_time_domain(waveform: &[f32], spectrum: &[f32]) -> TimeDomainSnapshot {
    TimeDomainSnapshot {
        variance: variance(waveform),
        zero_crossing_rate: zero_crossing_rate(waveform),
        entropy: spectral_entropy(spectrum),
    }
}

/// Population variance. 0.0 for an empty slice.
#[must_use]
pub fn variance(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&s| f64::from(s)).sum::<f64>() / n;
    let var = samples
        .iter()
        .map(|&s| {
            let d = f64::from(s) - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    var as f32
}

/// Fraction of adjacent pairs whose signs differ, zero counting as
/// non-negative. Divided by the sample count, not the pair count.
///
/// # Example
/// ```
/// use sx_engine::time_domain::zero_crossing_rate;
/// assert_eq!(zero_crossing_rate(&[1.0, -1.0, 1.0, -1.0]), 0.75);
/// assert_eq!(zero_crossing_rate(&[0.0, 0.5]), 0.0);
/// ```
#[must_use]
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[1] >= 0.0) != (w[0] >= 0.0))
        .count();
    crossings as f32 / samples.len() as f32
}

/// Shannon entropy in bits of the normalized magnitude distribution.
///
/// 0.0 when the spectrum carries no energy.
///
/// # Example
/// ```
/// use sx_engine::time_domain::spectral_entropy;
/// let flat = vec![0.5f32; 1024];
/// assert!((spectral_entropy(&flat) - 10.0).abs() < 1e-4);
/// ```
#[must_use]
pub fn spectral_entropy(spectrum: &[f32]) -> f32 {
    let total: f64 = spectrum.iter().map(|&m| f64::from(m)).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let bits = -spectrum
        .iter()
        .map(|&m| f64::from(m) / total)
        .filter(|&p| p > 0.0)
        .map(|p| p * p.log2())
        .sum::<f64>();
    bits as f32
}
