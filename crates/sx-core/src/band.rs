use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Fixed frequency-band descriptor. Immutable configuration.
///
/// # Example
/// ```
/// use sx_core::band::FREQUENCY_BANDS;
/// let bass = &FREQUENCY_BANDS[1];
/// assert_eq!(bass.name, "bass");
/// assert!(bass.contains(100.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrequencyBand {
    /// Nom canonique, utilisé pour les lookups.
    pub name: &'static str,
    /// Lower edge in Hz (inclusive).
    pub low_hz: f32,
    /// Upper edge in Hz (exclusive).
    pub high_hz: f32,
}

impl FrequencyBand {
    /// `true` if `freq` falls in `[low_hz, high_hz)`.
    #[inline(always)]
    #[must_use]
    pub fn contains(&self, freq: f32) -> bool {
        freq >= self.low_hz && freq < self.high_hz
    }
}

const fn band(name: &'static str, low_hz: f32, high_hz: f32) -> FrequencyBand {
    FrequencyBand {
        name,
        low_hz,
        high_hz,
    }
}

/// Number of predefined bands.
pub const BAND_COUNT: usize = 7;

/// The seven predefined bands, low to high.
pub const FREQUENCY_BANDS: [FrequencyBand; BAND_COUNT] = [
    band("subBass", 20.0, 60.0),
    band("bass", 60.0, 250.0),
    band("lowMid", 250.0, 500.0),
    band("mid", 500.0, 2000.0),
    band("highMid", 2000.0, 4000.0),
    band("treble", 4000.0, 6000.0),
    band("brilliance", 6000.0, 20000.0),
];

/// Énergie moyenne par bande pour une frame.
///
/// Produit à neuf à chaque frame, indexé dans l'ordre de `FREQUENCY_BANDS`.
/// Taille fixe, Copy.
///
/// # Example
/// ```
/// use sx_core::band::BandEnergies;
/// let energies = BandEnergies::default();
/// assert_eq!(energies.get("bass"), 0.0);
/// assert_eq!(energies.get("nonexistent"), 0.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandEnergies {
    values: [f32; BAND_COUNT],
}

impl BandEnergies {
    /// Wrap raw per-band values (ordered as `FREQUENCY_BANDS`).
    #[must_use]
    pub fn from_values(values: [f32; BAND_COUNT]) -> Self {
        Self { values }
    }

    /// Energy of the named band, or 0.0 for an unknown name.
    #[must_use]
    pub fn get(&self, name: &str) -> f32 {
        FREQUENCY_BANDS
            .iter()
            .position(|b| b.name == name)
            .map_or(0.0, |i| self.values[i])
    }

    /// Raw values in band order.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[f32; BAND_COUNT] {
        &self.values
    }

    /// Iterate `(name, energy)` pairs in band order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        FREQUENCY_BANDS
            .iter()
            .zip(self.values.iter())
            .map(|(b, &v)| (b.name, v))
    }

    /// Owned name → energy map for consumers that want keyed access.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<&'static str, f32> {
        self.iter().collect()
    }
}

// Serialized as a name-keyed map rather than a bare array.
impl Serialize for BandEnergies {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(BAND_COUNT))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}
