// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Offline rendering of a simple note script to a WAV file.

use std::{path::Path, time::Duration};

use thiserror::Error;
use tracing::{info, span, Level};

use crate::sampler::{NoteEvent, Sampler, SamplerEngine, TimedNoteEvent};

/// The notes played when no script is given: a C major triad.
pub const DEFAULT_NOTES: &str = "60,64,67";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid note {0:?}: expected a MIDI note number from 0 to 127")]
    InvalidNote(String),

    #[error("nothing to render: {0}")]
    Empty(&'static str),

    #[error(transparent)]
    Wav(#[from] hound::Error),
}

/// Describes an offline render.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Notes to play, one after another.
    pub notes: Vec<u8>,
    /// The velocity every note is played with.
    pub velocity: u8,
    /// The time between successive note ons.
    pub spacing: Duration,
    /// How long each note is held before its note off.
    pub hold: Duration,
    /// The length of the file. When unset, the file ends once the last note
    /// has had `tail` to release.
    pub length: Option<Duration>,
    /// Extra time rendered after the last note off when `length` is unset.
    pub tail: Duration,
    pub sample_rate: u32,
    pub block_size: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            notes: vec![60, 64, 67],
            velocity: 100,
            spacing: Duration::from_millis(500),
            hold: Duration::from_millis(400),
            length: None,
            tail: Duration::from_millis(500),
            sample_rate: 48000,
            block_size: 512,
        }
    }
}

/// Summary of a finished render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderStats {
    pub frames: u64,
    pub peak: f32,
    pub events: usize,
}

/// Parses a comma separated list of MIDI note numbers such as "60,64,67".
pub fn parse_notes(notes: &str) -> Result<Vec<u8>, RenderError> {
    notes
        .split(',')
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .map(|note| match note.parse::<u8>() {
            Ok(value) if value <= 127 => Ok(value),
            _ => Err(RenderError::InvalidNote(note.to_string())),
        })
        .collect()
}

fn to_frames(duration: Duration, sample_rate: u32) -> u64 {
    (duration.as_secs_f64() * f64::from(sample_rate)).round() as u64
}

/// Turns the options into absolutely timed events, sorted by frame.
fn schedule(options: &RenderOptions) -> Vec<(u64, NoteEvent)> {
    let spacing = to_frames(options.spacing, options.sample_rate);
    let hold = to_frames(options.hold, options.sample_rate);

    let mut events = Vec::with_capacity(options.notes.len() * 2);
    for (i, note) in options.notes.iter().enumerate() {
        let on = spacing * i as u64;
        events.push((
            on,
            NoteEvent::NoteOn {
                note: *note,
                velocity: options.velocity,
            },
        ));
        events.push((on + hold, NoteEvent::NoteOff { note: *note }));
    }
    // Stable, so a note off and a note on at the same frame keep script order.
    events.sort_by_key(|(frame, _)| *frame);
    events
}

/// Renders the script through `engine` block by block, handing each finished
/// block to `sink`. Returns the render statistics.
pub fn bounce(
    engine: &mut SamplerEngine,
    options: &RenderOptions,
    mut sink: impl FnMut(&[f32]) -> Result<(), RenderError>,
) -> Result<RenderStats, RenderError> {
    let events = schedule(options);
    let total_frames = match options.length {
        Some(length) => to_frames(length, options.sample_rate),
        None => {
            let last = events.last().map(|(frame, _)| *frame).unwrap_or(0);
            last + to_frames(options.tail, options.sample_rate)
        }
    };
    if total_frames == 0 {
        return Err(RenderError::Empty("the render length is zero"));
    }

    let block_size = options.block_size.max(1);
    let mut output = vec![0.0f32; block_size];
    let mut block_events: Vec<TimedNoteEvent> = Vec::with_capacity(events.len());
    let mut pending = events.iter().peekable();
    let mut peak = 0.0f32;
    let mut applied = 0;

    let mut block_start = 0u64;
    while block_start < total_frames {
        let num_frames = (total_frames - block_start).min(block_size as u64);
        let block_end = block_start + num_frames;

        block_events.clear();
        while let Some((frame, event)) = pending.next_if(|(frame, _)| *frame < block_end) {
            block_events.push(TimedNoteEvent::new((frame - block_start) as u32, *event));
        }
        applied += block_events.len();

        let block = &mut output[..num_frames as usize];
        block.fill(0.0);
        engine.render_block(&block_events, block, num_frames as usize, options.sample_rate);
        peak = block.iter().fold(peak, |acc, sample| acc.max(sample.abs()));
        sink(block)?;

        block_start = block_end;
    }

    Ok(RenderStats {
        frames: total_frames,
        peak,
        events: applied,
    })
}

/// Renders the script with the sampler's current sample and writes a mono
/// 32-bit float WAV file.
pub fn render_to_file(
    sampler: &Sampler,
    voices: usize,
    options: &RenderOptions,
    path: &Path,
) -> Result<RenderStats, RenderError> {
    let span = span!(Level::INFO, "render");
    let _enter = span.enter();

    if options.notes.is_empty() {
        return Err(RenderError::Empty("no notes given"));
    }
    if sampler.current_bank().is_none() {
        return Err(RenderError::Empty("no sample loaded"));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: options.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let mut engine = sampler.engine(voices);
    let stats = bounce(&mut engine, options, |block| {
        for sample in block {
            writer.write_sample(*sample)?;
        }
        Ok(())
    })?;
    writer.finalize()?;

    info!(
        path = ?path,
        frames = stats.frames,
        peak = stats.peak,
        events = stats.events,
        "Rendered file"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sampler::AdsrParameters;

    fn sampler(value: f32, len: usize) -> Sampler {
        let sampler = Sampler::new(AdsrParameters::new(0.0, 0.0, 1.0, 0.0));
        sampler.load_sample(vec![value; len], 48000, 60).unwrap();
        sampler
    }

    #[test]
    fn test_parse_notes() {
        assert_eq!(parse_notes(DEFAULT_NOTES).unwrap(), vec![60, 64, 67]);
        assert_eq!(parse_notes(" 36, 48 ,").unwrap(), vec![36, 48]);
        assert!(parse_notes("").unwrap().is_empty());
        assert!(matches!(parse_notes("60,128"), Err(RenderError::InvalidNote(n)) if n == "128"));
        assert!(matches!(parse_notes("C4"), Err(RenderError::InvalidNote(_))));
    }

    #[test]
    fn test_schedule_order() {
        let options = RenderOptions {
            notes: vec![60, 62],
            spacing: Duration::from_millis(10),
            hold: Duration::from_millis(10),
            ..Default::default()
        };
        let events = schedule(&options);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].0, 0);
        // The first note off lands on the same frame as the second note on.
        assert_eq!(events[1], (480, NoteEvent::NoteOff { note: 60 }));
        assert_eq!(
            events[2],
            (
                480,
                NoteEvent::NoteOn {
                    note: 62,
                    velocity: 100
                }
            )
        );
        assert_eq!(events[3].0, 960);
    }

    #[test]
    fn test_bounce_places_events_across_blocks() {
        let sampler = sampler(0.5, 48000);
        let mut engine = sampler.engine(3);
        let options = RenderOptions {
            notes: vec![60],
            velocity: 127,
            // Note on at frame 0, note off at frame 100, in the first block.
            hold: Duration::from_secs_f64(100.0 / 48000.0),
            length: Some(Duration::from_secs_f64(300.0 / 48000.0)),
            block_size: 64,
            ..Default::default()
        };

        let mut rendered = Vec::new();
        let stats = bounce(&mut engine, &options, |block| {
            rendered.extend_from_slice(block);
            Ok(())
        })
        .unwrap();

        assert_eq!(stats.frames, 300);
        assert_eq!(stats.events, 2);
        assert_eq!(rendered.len(), 300);
        assert!((stats.peak - 0.5).abs() < 1e-6);
        assert!(rendered[..100].iter().all(|s| (s - 0.5).abs() < 1e-6));
        // Zero release time: silent from the note off onwards.
        assert!(rendered[100..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_bounce_zero_length() {
        let sampler = sampler(0.5, 16);
        let mut engine = sampler.engine(1);
        let options = RenderOptions {
            length: Some(Duration::ZERO),
            ..Default::default()
        };
        assert!(matches!(
            bounce(&mut engine, &options, |_| Ok(())),
            Err(RenderError::Empty(_))
        ));
    }

    #[test]
    fn test_render_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bounce.wav");
        let sampler = sampler(0.25, 4800);
        let options = RenderOptions {
            notes: vec![60, 72],
            velocity: 127,
            spacing: Duration::from_millis(50),
            hold: Duration::from_millis(25),
            tail: Duration::from_millis(10),
            ..Default::default()
        };

        let stats = render_to_file(&sampler, 2, &options, &path).unwrap();
        // Last note off at 75ms plus a 10ms tail.
        assert_eq!(stats.frames, 4080);
        assert_eq!(stats.events, 4);

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
        let samples = reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()
            .unwrap();
        assert_eq!(samples.len(), 4080);
        assert!((samples[0] - 0.25).abs() < 1e-6);
        assert_eq!(samples.iter().cloned().fold(0.0f32, f32::max), stats.peak);
    }

    #[test]
    fn test_render_without_sample() {
        let dir = tempfile::tempdir().unwrap();
        let sampler = Sampler::new(AdsrParameters::default());
        let result = render_to_file(
            &sampler,
            3,
            &RenderOptions::default(),
            &dir.path().join("silent.wav"),
        );
        assert!(matches!(result, Err(RenderError::Empty(_))));
    }
}
