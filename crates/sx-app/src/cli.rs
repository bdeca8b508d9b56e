use std::path::PathBuf;

use clap::Parser;

/// spectrascope: spectral statistics and beat flags, one JSON line per frame.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Frame dump : enregistrements bruts `transform_size/2` octets de magnitude
    /// suivis de `--waveform-len` octets de waveform.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Générateur synthétique : fréquence de la tonalité en Hz.
    #[arg(long)]
    pub tone: Option<f32>,

    /// Synthetic mode: loud frame every N frames (0 = steady tone).
    #[arg(long, default_value_t = 8)]
    pub pulse_every: u32,

    /// Maximum number of frames to analyse. Défaut synthétique : 256.
    #[arg(long)]
    pub frames: Option<u64>,

    /// Waveform samples per frame. Défaut : transform_size.
    #[arg(long)]
    pub waveform_len: Option<usize>,

    /// Sample rate de la session en Hz.
    #[arg(long, default_value_t = 44100.0)]
    pub sample_rate: f32,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Override beat threshold (clamped to [0, 1]).
    #[arg(long, allow_negative_numbers = true)]
    pub threshold: Option<f32>,

    /// Override beat sensitivity (clamped to [0.5, 2]).
    #[arg(long, allow_negative_numbers = true)]
    pub sensitivity: Option<f32>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Validate that exactly one frame source is provided.
    ///
    /// # Errors
    /// Returns an error if zero or both sources are specified.
    pub fn validate_source(&self) -> anyhow::Result<()> {
        match (self.input.is_some(), self.tone.is_some()) {
            (false, false) => anyhow::bail!(
                "Aucune source de frames spécifiée. Utilisez --input ou --tone."
            ),
            (true, true) => {
                anyhow::bail!("Une seule source à la fois. Spécifiez --input OU --tone.")
            }
            _ => Ok(()),
        }
    }
}
