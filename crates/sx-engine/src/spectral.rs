use sx_core::frame::SpectralSnapshot;

/// Normalize a byte spectrum to [0, 1] into `out`.
///
/// `out` is resized only when the bin count changes, then overwritten in place.
///
/// # Example
/// ```
/// use sx_engine::spectral::normalize_bytes;
/// let mut out = Vec::new();
/// normalize_bytes(&[0, 255], &mut out);
/// assert_eq!(out, vec![0.0, 1.0]);
/// ```
pub fn normalize_bytes(bytes: &[u8], out: &mut Vec<f32>) {
    if out.len() != bytes.len() {
        out.resize(bytes.len(), 0.0);
    }
    for (slot, &b) in out.iter_mut().zip(bytes) {
        *slot = f32::from(b) / 255.0;
    }
}

/// Compute spectral shape statistics for one normalized spectrum.
///
/// `bin_width` is `nyquist / bin_count`. `previous` is the most recent
/// spectrum stored in history; flux is 0.0 when it is absent.
///
/// # Example
/// ```
/// use sx_engine::spectral::compute_spectral;
/// let spectrum = vec![1.0f32; 1024];
/// let stats = compute_spectral(&spectrum, 22050.0 / 1024.0, None);
/// assert!((stats.total_energy - 1.0).abs() < 1e-6);
/// assert_eq!(stats.spectral_flux, 0.0);
/// ```
#[must_use]
pub fn compute_spectral(
    spectrum: &[f32],
    bin_width: f32,
    previous: Option<&[f32]>,
) -> SpectralSnapshot {
    if spectrum.is_empty() {
        return SpectralSnapshot::default();
    }
    let n = spectrum.len() as f64;
    let bin_width = f64::from(bin_width);

    // Sommes en f64, un seul arrondi vers f32 à la publication.
    let mut sum = 0.0f64;
    let mut weighted = 0.0f64;
    let mut peak_idx = 0usize;
    let mut peak_val = spectrum[0];
    for (i, &m) in spectrum.iter().enumerate() {
        let m64 = f64::from(m);
        sum += m64;
        weighted += m64 * i as f64 * bin_width;
        // Strict comparison: first maximal bin wins.
        if m > peak_val {
            peak_val = m;
            peak_idx = i;
        }
    }

    let centroid = if sum > 0.0 { weighted / sum } else { 0.0 };

    let spread_acc: f64 = spectrum
        .iter()
        .enumerate()
        .map(|(i, &m)| {
            let d = i as f64 * bin_width - centroid;
            f64::from(m) * d * d
        })
        .sum();

    SpectralSnapshot {
        total_energy: (sum / n) as f32,
        peak_frequency: (peak_idx as f64 * bin_width) as f32,
        spectral_centroid: centroid as f32,
        spectral_spread: (spread_acc / sum.max(1.0)).sqrt() as f32,
        spectral_flux: previous.map_or(0.0, |prev| spectral_flux(spectrum, prev)),
    }
}

/// Root-mean-square difference between two spectra of equal length.
///
/// Returns 0.0 for empty or mismatched inputs.
#[must_use]
pub fn spectral_flux(current: &[f32], previous: &[f32]) -> f32 {
    if current.is_empty() || current.len() != previous.len() {
        return 0.0;
    }
    let sum_sq: f64 = current
        .iter()
        .zip(previous)
        .map(|(&c, &p)| {
            let d = f64::from(c) - f64::from(p);
            d * d
        })
        .sum();
    (sum_sq / current.len() as f64).sqrt() as f32
}
