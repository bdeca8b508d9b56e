use sx_core::band::{BAND_COUNT, BandEnergies, FREQUENCY_BANDS, FrequencyBand};

/// Map a byte magnitude spectrum onto the predefined band table.
///
/// Each band's energy is the sum of `value / 255` over bins whose center
/// frequency `i * bin_width` lies in `[low_hz, high_hz)`, divided by the
/// band's expected bin count `ceil((high - low) / bin_width)` (at least 1).
/// Values are nominally in [0, 1] but not strictly bounded.
///
/// # Example
/// ```
/// use sx_engine::bands::aggregate_bands;
/// let magnitude = vec![255u8; 1024];
/// let bands = aggregate_bands(&magnitude, 44100.0);
/// assert!(bands.get("mid") > 0.9);
/// assert_eq!(bands.get("nonexistent"), 0.0);
/// ```
#[must_use]
pub fn aggregate_bands(magnitude: &[u8], sample_rate: f32) -> BandEnergies {
    if magnitude.is_empty() {
        return BandEnergies::default();
    }
    let bin_width = sample_rate * 0.5 / magnitude.len() as f32;
    if bin_width <= 0.0 || !bin_width.is_finite() {
        return BandEnergies::default();
    }

    let mut values = [0.0f32; BAND_COUNT];
    for (slot, band) in values.iter_mut().zip(FREQUENCY_BANDS.iter()) {
        *slot = band_energy(magnitude, band, bin_width);
    }
    BandEnergies::from_values(values)
}

/// Average normalized magnitude of one band.
fn band_energy(magnitude: &[u8], band: &FrequencyBand, bin_width: f32) -> f32 {
    // Start one bin early so float rounding on the lower edge never skips a bin;
    // membership is decided by `contains` alone.
    let first = ((band.low_hz / bin_width) as usize).saturating_sub(1);
    let sum: f32 = magnitude
        .iter()
        .enumerate()
        .skip(first)
        .map(|(i, &v)| (i as f32 * bin_width, v))
        .take_while(|&(freq, _)| freq < band.high_hz)
        .filter(|&(freq, _)| band.contains(freq))
        .map(|(_, v)| f32::from(v) / 255.0)
        .sum();

    let expected = ((band.high_hz - band.low_hz) / bin_width).ceil().max(1.0);
    sum / expected
}
