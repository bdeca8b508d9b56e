use std::f64::consts::TAU;
use std::io::{ErrorKind, Read};

use anyhow::{Result, bail};
use sx_core::frame::FrameSample;

/// Fournit des frames d'analyse au moteur.
///
/// Implémenté par : `FrameDumpSource`, `ToneSource`.
pub trait FrameSource {
    /// Retourne la prochaine frame, `None` quand la source est épuisée.
    ///
    /// # Errors
    /// Returns an error if the underlying data is truncated or unreadable.
    fn next_frame(&mut self) -> Result<Option<FrameSample<'_>>>;
}

/// Reads fixed-size records from a raw frame dump.
///
/// Each record is `bins` magnitude bytes followed by `waveform_len` waveform
/// bytes. A trailing partial record is an error.
pub struct FrameDumpSource<R: Read> {
    reader: R,
    sample_rate: f32,
    magnitude: Vec<u8>,
    waveform: Vec<u8>,
    records: u64,
}

impl<R: Read> FrameDumpSource<R> {
    #[must_use]
    pub fn new(reader: R, bins: usize, waveform_len: usize, sample_rate: f32) -> Self {
        Self {
            reader,
            sample_rate,
            magnitude: vec![0; bins],
            waveform: vec![0; waveform_len],
            records: 0,
        }
    }
}

impl<R: Read> FrameSource for FrameDumpSource<R> {
    fn next_frame(&mut self) -> Result<Option<FrameSample<'_>>> {
        let got = fill(&mut self.reader, &mut self.magnitude)?;
        if got == 0 {
            return Ok(None);
        }
        let got_wave = if got == self.magnitude.len() {
            fill(&mut self.reader, &mut self.waveform)?
        } else {
            0
        };
        if got < self.magnitude.len() || got_wave < self.waveform.len() {
            bail!(
                "Enregistrement {} tronqué : {} octets sur {}",
                self.records,
                got + got_wave,
                self.magnitude.len() + self.waveform.len()
            );
        }
        self.records += 1;
        Ok(Some(FrameSample::new(
            &self.magnitude,
            &self.waveform,
            self.sample_rate,
        )))
    }
}

/// Read until `buf` is full or EOF. Returns the number of bytes read.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Synthetic single-tone generator.
///
/// Puts the tone in its nearest bin (with some leakage into the neighbours)
/// and writes a matching sine waveform. Every `pulse_every` frames the level
/// jumps, which the beat detector should flag.
pub struct ToneSource {
    tone_hz: f32,
    pulse_every: u32,
    sample_rate: f32,
    remaining: u64,
    frame: u64,
    /// Sine phase in radians, kept in [0, TAU).
    phase: f64,
    magnitude: Vec<u8>,
    waveform: Vec<u8>,
}

impl ToneSource {
    #[must_use]
    pub fn new(
        tone_hz: f32,
        pulse_every: u32,
        frames: u64,
        bins: usize,
        waveform_len: usize,
        sample_rate: f32,
    ) -> Self {
        Self {
            tone_hz,
            pulse_every,
            sample_rate,
            remaining: frames,
            frame: 0,
            phase: 0.0,
            magnitude: vec![0; bins],
            waveform: vec![128; waveform_len],
        }
    }

    fn level(&self) -> f32 {
        let pulse = self.pulse_every > 0 && self.frame % u64::from(self.pulse_every) == 0;
        if pulse { 1.0 } else { 0.3 }
    }
}

impl FrameSource for ToneSource {
    fn next_frame(&mut self) -> Result<Option<FrameSample<'_>>> {
        if self.remaining == 0 || self.magnitude.is_empty() {
            return Ok(None);
        }
        let level = self.level();

        let bin_width = self.sample_rate * 0.5 / self.magnitude.len() as f32;
        let last = self.magnitude.len() - 1;
        let center = ((self.tone_hz / bin_width).round() as usize).min(last);
        self.magnitude.fill(0);
        self.magnitude[center] = (255.0 * level) as u8;
        if center > 0 {
            self.magnitude[center - 1] = (64.0 * level) as u8;
        }
        if center < last {
            self.magnitude[center + 1] = (64.0 * level) as u8;
        }

        let step = TAU * f64::from(self.tone_hz) / f64::from(self.sample_rate);
        let amplitude = f64::from(level);
        for slot in &mut self.waveform {
            let s = self.phase.sin() * amplitude;
            *slot = (128.0 + 127.0 * s).round().clamp(0.0, 255.0) as u8;
            self.phase = (self.phase + step).rem_euclid(TAU);
        }

        self.remaining -= 1;
        self.frame += 1;
        Ok(Some(FrameSample::new(
            &self.magnitude,
            &self.waveform,
            self.sample_rate,
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn dump_splits_records() {
        let mut bytes = vec![1u8; 4];
        bytes.extend_from_slice(&[2u8; 8]);
        bytes.extend_from_slice(&[3u8; 4]);
        bytes.extend_from_slice(&[4u8; 8]);
        let mut src = FrameDumpSource::new(Cursor::new(bytes), 4, 8, 8000.0);

        let first = src.next_frame().ok().flatten().map(|f| (f.magnitude[0], f.waveform[7]));
        assert_eq!(first, Some((1, 2)));
        let second = src.next_frame().ok().flatten().map(|f| (f.magnitude[0], f.waveform[0]));
        assert_eq!(second, Some((3, 4)));
        assert!(matches!(src.next_frame(), Ok(None)));
    }

    #[test]
    fn dump_rejects_trailing_partial_record() {
        let mut bytes = vec![0u8; 12];
        bytes.extend_from_slice(&[9u8; 5]);
        let mut src = FrameDumpSource::new(Cursor::new(bytes), 4, 8, 8000.0);
        assert!(matches!(src.next_frame(), Ok(Some(_))));
        assert!(src.next_frame().is_err());
    }

    #[test]
    fn tone_lands_in_nearest_bin_and_pulses() {
        let mut src = ToneSource::new(1000.0, 4, 5, 512, 1024, 44100.0);
        let bin_width = 22050.0 / 512.0;
        let center = (1000.0f32 / bin_width).round() as usize;

        let loud = src.next_frame().ok().flatten().map(|f| f.magnitude[center]);
        assert_eq!(loud, Some(255));
        let quiet = src.next_frame().ok().flatten().map(|f| f.magnitude[center]);
        assert_eq!(quiet, Some(76));

        for _ in 0..3 {
            assert!(matches!(src.next_frame(), Ok(Some(_))));
        }
        assert!(matches!(src.next_frame(), Ok(None)));
    }

    #[test]
    fn tone_phase_stays_continuous_over_long_runs() {
        // 1000 Hz at 48 kHz: exactly 6 periods per 288 samples, so every
        // frame starts back at phase 0 and should repeat.
        let mut src = ToneSource::new(1000.0, 0, 20_000, 144, 288, 48000.0);
        let first = src
            .next_frame()
            .ok()
            .flatten()
            .map(|f| f.waveform.to_vec())
            .unwrap_or_default();
        for _ in 0..19_998 {
            assert!(matches!(src.next_frame(), Ok(Some(_))));
        }
        let last = src
            .next_frame()
            .ok()
            .flatten()
            .map(|f| f.waveform.to_vec())
            .unwrap_or_default();
        assert_eq!(first.len(), 288);
        assert_eq!(last.len(), 288);
        // A byte of rounding slack at most, not a drifting phase.
        assert!(first.iter().zip(&last).all(|(a, b)| a.abs_diff(*b) <= 1));
        assert!((0.0..TAU).contains(&src.phase));
    }

    #[test]
    fn tone_waveform_stays_in_byte_range_and_crosses_zero() {
        let mut src = ToneSource::new(440.0, 0, 1, 1024, 2048, 44100.0);
        let crossings = src.next_frame().ok().flatten().map(|f| {
            f.waveform
                .windows(2)
                .filter(|w| (w[0] >= 128) != (w[1] >= 128))
                .count()
        });
        // ~20 cycles of 440 Hz in 2048 samples.
        assert!(crossings.is_some_and(|c| c > 30));
    }
}
