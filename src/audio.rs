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
use std::{error::Error, fmt, sync::Arc};

use ::cpal::{FromSample, Sample};
use crossbeam_channel::Receiver;

use crate::config;
use crate::sampler::{SamplerEngine, TimedNoteEvent};

pub mod cpal;
pub mod decode;
mod mock;

/// The most note events applied at the start of a single device callback.
pub(crate) const MAX_PENDING_EVENTS: usize = 256;

/// An audio output the sampler can be rendered to.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Starts rendering the engine to the device. Note events received on
    /// `events` are applied at the start of the next rendered block. Output
    /// stops when the returned handle is dropped.
    fn start(
        &self,
        engine: SamplerEngine,
        events: Receiver<TimedNoteEvent>,
    ) -> Result<Box<dyn Output>, Box<dyn Error>>;
}

/// A running output. Dropping it stops the output.
pub trait Output {
    /// The sample rate the output runs at.
    fn sample_rate(&self) -> u32;

    /// The number of interleaved channels the output writes.
    fn channels(&self) -> u16;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets the device described by the configuration.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device, config)));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}

/// The audio callback side of an output. Drains pending note events and
/// renders the engine into interleaved device buffers without allocating.
pub(crate) struct StreamRenderer {
    engine: SamplerEngine,
    events: Receiver<TimedNoteEvent>,
    pending: Vec<TimedNoteEvent>,
    max_events: usize,
    scratch: Vec<f32>,
    sample_rate: u32,
    channels: usize,
}

impl StreamRenderer {
    pub(crate) fn new(
        engine: SamplerEngine,
        events: Receiver<TimedNoteEvent>,
        sample_rate: u32,
        channels: u16,
        block_size: usize,
        queue_size: usize,
    ) -> StreamRenderer {
        StreamRenderer {
            engine,
            events,
            pending: Vec::with_capacity(queue_size.max(1)),
            max_events: queue_size.max(1),
            scratch: vec![0.0; block_size.max(1)],
            sample_rate,
            channels: usize::from(channels.max(1)),
        }
    }

    /// Fills `data` with interleaved frames. Mono output from the engine is
    /// copied to every channel.
    pub(crate) fn render<T: Sample + FromSample<f32>>(&mut self, data: &mut [T]) {
        // Anything past the capacity stays queued for the next callback.
        self.pending.clear();
        while self.pending.len() < self.max_events {
            match self.events.try_recv() {
                Ok(event) => self.pending.push(event),
                Err(_) => break,
            }
        }

        let mut events: &[TimedNoteEvent] = &self.pending;
        for frames in data.chunks_mut(self.scratch.len() * self.channels) {
            let num_frames = frames.len() / self.channels;
            let scratch = &mut self.scratch[..num_frames];
            scratch.fill(0.0);
            self.engine
                .render_block(events, scratch, num_frames, self.sample_rate);
            events = &[];

            for (frame, sample) in frames.chunks_mut(self.channels).zip(scratch.iter()) {
                frame.fill(T::from_sample(*sample));
            }
        }
    }
}
