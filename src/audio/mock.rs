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
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use crossbeam_channel::Receiver;
use tracing::{info, span, Level};

use super::{Output, StreamRenderer, MAX_PENDING_EVENTS};
use crate::config;
use crate::sampler::{SamplerEngine, TimedNoteEvent};

const DEFAULT_SAMPLE_RATE: u32 = 48000;
const CHANNELS: u16 = 2;

/// A mock device. Renders on a plain thread and throws the audio away.
#[derive(Clone)]
pub struct Device {
    name: String,
    sample_rate: u32,
    buffer_size: usize,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str, config: &config::Audio) -> Device {
        Device {
            name: name.to_string(),
            sample_rate: config.sample_rate().unwrap_or(DEFAULT_SAMPLE_RATE),
            buffer_size: config.buffer_size(),
        }
    }
}

/// The running mock output.
pub struct MockOutput {
    sample_rate: u32,
    stop: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    peak: Arc<AtomicU32>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl MockOutput {
    /// The number of frames rendered so far.
    #[cfg(test)]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// The largest absolute sample rendered so far.
    #[cfg(test)]
    pub fn peak(&self) -> f32 {
        f32::from_bits(self.peak.load(Ordering::Relaxed))
    }
}

impl Output for MockOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        CHANNELS
    }
}

impl Drop for MockOutput {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join_handle) = self.join_handle.take() {
            let _ = join_handle.join();
        }
        info!(
            frames = self.frames.load(Ordering::Relaxed),
            peak = f32::from_bits(self.peak.load(Ordering::Relaxed)),
            "Stopped mock output."
        );
    }
}

impl Device {
    /// Starts the mock output and returns the concrete handle.
    pub fn start_mock(
        &self,
        engine: SamplerEngine,
        events: Receiver<TimedNoteEvent>,
    ) -> MockOutput {
        let span = span!(Level::INFO, "start output (mock)");
        let _enter = span.enter();

        info!(
            device = self.name,
            sample_rate = self.sample_rate,
            buffer_size = self.buffer_size,
            "Starting mock output."
        );

        let stop = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(AtomicU64::new(0));
        let peak = Arc::new(AtomicU32::new(0.0f32.to_bits()));

        let join_handle = {
            let stop = stop.clone();
            let frames = frames.clone();
            let peak = peak.clone();
            let sample_rate = self.sample_rate;
            let buffer_size = self.buffer_size;
            thread::spawn(move || {
                let mut renderer = StreamRenderer::new(
                    engine,
                    events,
                    sample_rate,
                    CHANNELS,
                    buffer_size,
                    MAX_PENDING_EVENTS,
                );
                let mut data = vec![0.0f32; buffer_size * usize::from(CHANNELS)];
                let block_time =
                    Duration::from_secs_f64(buffer_size as f64 / f64::from(sample_rate));

                while !stop.load(Ordering::Relaxed) {
                    renderer.render(&mut data);
                    let block_peak = data.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
                    peak.fetch_max(block_peak.to_bits(), Ordering::Relaxed);
                    frames.fetch_add(buffer_size as u64, Ordering::Relaxed);
                    thread::sleep(block_time);
                }
            })
        };

        MockOutput {
            sample_rate: self.sample_rate,
            stop,
            frames,
            peak,
            join_handle: Some(join_handle),
        }
    }
}

impl super::Device for Device {
    fn start(
        &self,
        engine: SamplerEngine,
        events: Receiver<TimedNoteEvent>,
    ) -> Result<Box<dyn Output>, Box<dyn Error>> {
        Ok(Box::new(self.start_mock(engine, events)))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
