use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use sx_core::band::BandEnergies;
use sx_core::frame::AnalysisSnapshot;
use sx_engine::AnalysisEngine;

use crate::source::FrameSource;

/// One JSON line of output.
#[derive(Serialize)]
struct FrameReport<'a> {
    frame: u64,
    #[serde(flatten)]
    stats: &'a AnalysisSnapshot,
    smoothed_bands: BandEnergies,
    smoothed_energy: f32,
}

/// Totals printed to the log once the source is exhausted.
#[derive(Debug, Default, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub beats: u64,
}

/// Feed every frame of `source` through `engine`, writing one JSON object
/// per frame to `out`. Stops after `limit` frames when given.
///
/// # Errors
/// Fails on a malformed or truncated frame, or when writing fails.
pub fn run(
    engine: &mut AnalysisEngine,
    source: &mut dyn FrameSource,
    limit: Option<u64>,
    out: &mut dyn Write,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    while limit.is_none_or(|max| summary.frames < max) {
        let Some(frame) = source.next_frame()? else {
            break;
        };
        let stats = *engine
            .update(&frame)
            .with_context(|| format!("frame {}", summary.frames))?;

        let report = FrameReport {
            frame: summary.frames,
            stats: &stats,
            smoothed_bands: engine.smoothed_band_energies(),
            smoothed_energy: engine.smoothed_energy(),
        };
        serde_json::to_writer(&mut *out, &report)?;
        out.write_all(b"\n")?;

        summary.frames += 1;
        if stats.beat.is_beat {
            summary.beats += 1;
        }
    }

    out.flush()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use sx_core::config::EngineConfig;

    use super::*;
    use crate::source::ToneSource;

    fn engine(transform_size: usize) -> AnalysisEngine {
        let config = EngineConfig {
            transform_size,
            ..EngineConfig::default()
        };
        AnalysisEngine::new(config, 44100.0).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn writes_one_json_line_per_frame() {
        let mut engine = engine(256);
        let mut source = ToneSource::new(440.0, 4, 12, 128, 256, 44100.0);
        let mut out = Vec::new();
        let summary = run(&mut engine, &mut source, None, &mut out).unwrap_or_else(|e| panic!("{e:#}"));

        assert_eq!(summary.frames, 12);
        // Pulses at frames 0, 4, 8.
        assert_eq!(summary.beats, 3);

        let text = String::from_utf8(out).unwrap_or_default();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 12);
        let first: serde_json::Value =
            serde_json::from_str(lines[0]).unwrap_or(serde_json::Value::Null);
        assert_eq!(first["frame"], 0);
        assert_eq!(first["spectral"]["spectral_flux"], 0.0);
        assert!(first["bands"]["bass"].is_number());
        assert_eq!(first["beat"]["is_beat"], true);
    }

    #[test]
    fn limit_stops_early() {
        let mut engine = engine(256);
        let mut source = ToneSource::new(440.0, 0, 100, 128, 256, 44100.0);
        let mut out = Vec::new();
        let summary = run(&mut engine, &mut source, Some(5), &mut out).unwrap_or_else(|e| panic!("{e:#}"));
        assert_eq!(summary.frames, 5);
    }

    #[test]
    fn mismatched_source_shape_is_an_error() {
        let mut engine = engine(256);
        let mut source = ToneSource::new(440.0, 0, 3, 64, 256, 44100.0);
        let mut out = Vec::new();
        assert!(run(&mut engine, &mut source, None, &mut out).is_err());
    }
}
