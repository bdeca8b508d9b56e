use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use clap::Parser;
use sx_core::config::EngineConfig;
use sx_engine::AnalysisEngine;

pub mod cli;
pub mod report;
pub mod source;

use source::{FrameDumpSource, FrameSource, ToneSource};

/// Frames generated by `--tone` when `--frames` is not given.
const DEFAULT_SYNTHETIC_FRAMES: u64 = 256;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Valider la source
    cli.validate_source()?;

    // 4. Charger la config et construire le moteur
    let config = resolve_config(&cli)?;
    let bins = config.bin_count();
    let waveform_len = cli.waveform_len.unwrap_or(config.transform_size);
    let mut engine = AnalysisEngine::new(config, cli.sample_rate)?;

    if let Some(t) = cli.threshold {
        engine.set_beat_threshold(t);
    }
    if let Some(s) = cli.sensitivity {
        engine.set_beat_sensitivity(s);
    }

    // 5. Ouvrir la source de frames
    let mut source: Box<dyn FrameSource> = if let Some(ref path) = cli.input {
        let file =
            File::open(path).with_context(|| format!("Impossible d'ouvrir {}", path.display()))?;
        Box::new(FrameDumpSource::new(
            BufReader::new(file),
            bins,
            waveform_len,
            cli.sample_rate,
        ))
    } else {
        let tone = cli.tone.unwrap_or_default();
        Box::new(ToneSource::new(
            tone,
            cli.pulse_every,
            cli.frames.unwrap_or(DEFAULT_SYNTHETIC_FRAMES),
            bins,
            waveform_len,
            cli.sample_rate,
        ))
    };

    // 6. Boucle principale
    let stdout = std::io::stdout();
    let summary = report::run(&mut engine, source.as_mut(), cli.frames, &mut stdout.lock())?;

    let (mean, stddev) = engine.energy_baseline();
    log::info!(
        "{} frames analysées, {} beats, énergie moyenne {mean:.4} ± {stddev:.4}",
        summary.frames,
        summary.beats
    );
    Ok(())
}

/// Resolve config: file if present, defaults otherwise.
fn resolve_config(cli: &cli::Cli) -> Result<EngineConfig> {
    if cli.config.exists() {
        sx_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(EngineConfig::default())
    }
}
