use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const DEFAULT_TRANSFORM_SIZE: usize = 2048;
pub const MIN_TRANSFORM_SIZE: usize = 32;
pub const MAX_TRANSFORM_SIZE: usize = 32768;
pub const DEFAULT_BEAT_THRESHOLD: f32 = 0.6;
pub const DEFAULT_BEAT_SENSITIVITY: f32 = 1.2;
pub const DEFAULT_MAX_HISTORY_LENGTH: usize = 60;
pub const DEFAULT_SMOOTHING: f32 = 0.7;

/// Beat threshold range.
pub const BEAT_THRESHOLD_RANGE: (f32, f32) = (0.0, 1.0);
/// Beat sensitivity range.
pub const BEAT_SENSITIVITY_RANGE: (f32, f32) = (0.5, 2.0);

/// Configuration de session du moteur d'analyse.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine et les
/// valeurs hors plage sont ramenées dans leur plage, jamais rejetées.
///
/// # Example
/// ```
/// use sx_core::config::EngineConfig;
/// let config = EngineConfig::default();
/// assert_eq!(config.transform_size, 2048);
/// assert_eq!(config.bin_count(), 1024);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct EngineConfig {
    /// Transform size (power of two). Bin count = size / 2.
    pub transform_size: usize,
    /// Beat energy-threshold multiplier [0.0, 1.0].
    pub beat_threshold: f32,
    /// Beat-energy amplification on detection [0.5, 2.0].
    pub beat_sensitivity: f32,
    /// Rolling history capacity in frames (≥ 1).
    pub max_history_length: usize,
    /// Lissage des énergies de bande publiées [0.0, 1.0]. 0 = brut.
    pub smoothing: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transform_size: DEFAULT_TRANSFORM_SIZE,
            beat_threshold: DEFAULT_BEAT_THRESHOLD,
            beat_sensitivity: DEFAULT_BEAT_SENSITIVITY,
            max_history_length: DEFAULT_MAX_HISTORY_LENGTH,
            smoothing: DEFAULT_SMOOTHING,
        }
    }
}

impl EngineConfig {
    /// Number of magnitude bins expected per frame.
    #[inline]
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.transform_size / 2
    }

    /// Clamp all fields to their valid ranges.
    /// Called after TOML deserialization and at engine construction.
    ///
    /// # Example
    /// ```
    /// use sx_core::config::EngineConfig;
    /// let mut config = EngineConfig {
    ///     transform_size: 1000,
    ///     beat_threshold: 4.0,
    ///     max_history_length: 0,
    ///     ..EngineConfig::default()
    /// };
    /// config.clamp_all();
    /// assert_eq!(config.transform_size, 1024);
    /// assert_eq!(config.beat_threshold, 1.0);
    /// assert_eq!(config.max_history_length, 1);
    /// ```
    pub fn clamp_all(&mut self) {
        let size = self
            .transform_size
            .clamp(MIN_TRANSFORM_SIZE, MAX_TRANSFORM_SIZE)
            .next_power_of_two();
        if size != self.transform_size {
            log::warn!(
                "transform_size {} ramené à {size} (puissance de deux dans [{MIN_TRANSFORM_SIZE}, {MAX_TRANSFORM_SIZE}])",
                self.transform_size
            );
            self.transform_size = size;
        }

        if self.max_history_length == 0 {
            log::warn!("max_history_length 0 ramené à 1");
            self.max_history_length = 1;
        }

        self.beat_threshold = clamp_field(
            "beat_threshold",
            self.beat_threshold,
            BEAT_THRESHOLD_RANGE,
            DEFAULT_BEAT_THRESHOLD,
        );
        self.beat_sensitivity = clamp_field(
            "beat_sensitivity",
            self.beat_sensitivity,
            BEAT_SENSITIVITY_RANGE,
            DEFAULT_BEAT_SENSITIVITY,
        );
        self.smoothing = clamp_field("smoothing", self.smoothing, (0.0, 1.0), DEFAULT_SMOOTHING);
    }
}

/// Clamp `value` into `range`, falling back to `default` for NaN.
#[allow(clippy::float_cmp)]
fn clamp_field(name: &str, value: f32, range: (f32, f32), default: f32) -> f32 {
    if value.is_nan() {
        log::warn!("{name} NaN remplacé par la valeur par défaut {default}");
        return default;
    }
    let clamped = value.clamp(range.0, range.1);
    if clamped != value {
        log::warn!("{name} {value} ramené à {clamped}");
    }
    clamped
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    engine: Option<EngineSection>,
}

/// Engine section of the TOML config, all fields optional for partial override.
#[derive(Deserialize)]
struct EngineSection {
    transform_size: Option<usize>,
    beat_threshold: Option<f32>,
    beat_sensitivity: Option<f32>,
    max_history_length: Option<usize>,
    smoothing: Option<f32>,
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file is missing, cannot be read or parsed, or has
/// no `[engine]` section.
///
/// # Example
/// ```no_run
/// use sx_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;

    let file: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Erreur de parsing TOML dans {}", path.display()))?;

    let Some(e) = file.engine else {
        return Err(CoreError::Config(format!(
            "section [engine] manquante dans {}",
            path.display()
        ))
        .into());
    };

    let mut config = EngineConfig::default();
    if let Some(v) = e.transform_size {
        config.transform_size = v;
    }
    if let Some(v) = e.beat_threshold {
        config.beat_threshold = v;
    }
    if let Some(v) = e.beat_sensitivity {
        config.beat_sensitivity = v;
    }
    if let Some(v) = e.max_history_length {
        config.max_history_length = v;
    }
    if let Some(v) = e.smoothing {
        config.smoothing = v;
    }

    config.clamp_all();
    log::debug!("Config chargée depuis {} : {config:?}", path.display());
    Ok(config)
}
