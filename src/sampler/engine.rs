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

//! The control and audio halves of the sampler.
//!
//! [`Sampler`] lives on the control side. It loads samples, edits envelope
//! parameters and frees retired banks. [`SamplerEngine`] lives on the audio
//! thread and renders blocks. The two share state only through lock-free
//! snapshots.

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, info, warn};

use super::bank::{BankSlot, SampleBank};
use super::error::SamplerError;
use super::event::TimedNoteEvent;
use super::params::{AdsrParameters, ParameterSnapshot, SharedParameters};
use super::renderer::BlockRenderer;
use super::waveform::{WaveformSnapshot, WAVEFORM_POINTS};
use crate::audio::decode::{decode_file, DecodedAudio};
use crate::util::{filename_display, note_name};

struct Shared {
    bank: BankSlot,
    params: SharedParameters,
    waveform: ArcSwap<WaveformSnapshot>,
}

/// The control side handle of the sampler. Cheap to clone.
#[derive(Clone)]
pub struct Sampler {
    shared: Arc<Shared>,
}

impl Sampler {
    /// Creates a sampler with no sample loaded.
    pub fn new(params: AdsrParameters) -> Self {
        Self {
            shared: Arc::new(Shared {
                bank: BankSlot::new(),
                params: SharedParameters::new(params),
                waveform: ArcSwap::from_pointee(WaveformSnapshot::empty()),
            }),
        }
    }

    /// Creates an audio thread processor with `voices` voices.
    pub fn engine(&self, voices: usize) -> SamplerEngine {
        let snapshot = ParameterSnapshot::new(&self.shared.params);
        SamplerEngine {
            shared: self.shared.clone(),
            renderer: BlockRenderer::new(voices, snapshot.params()),
            snapshot,
            bank: None,
        }
    }

    /// Replaces the loaded sample with mono `pcm`. On error the previous
    /// sample stays loaded.
    pub fn load_sample(
        &self,
        pcm: Vec<f32>,
        sample_rate: u32,
        root_note: u8,
    ) -> Result<Arc<SampleBank>, SamplerError> {
        let bank = SampleBank::new(pcm, sample_rate, root_note).inspect_err(|e| {
            warn!(err = %e, "Rejected sample, keeping the previous one");
        })?;
        let waveform = WaveformSnapshot::from_pcm(bank.pcm(), WAVEFORM_POINTS);

        let bank = self.shared.bank.publish(bank);
        self.shared.waveform.store(Arc::new(waveform));

        info!(
            sample_rate = bank.sample_rate(),
            root_note = note_name(bank.root_note()),
            duration_ms = bank.duration().as_millis(),
            memory_kb = bank.memory_size() / 1024,
            "Sample loaded"
        );
        Ok(bank)
    }

    /// Loads decoded audio, mixing it down to mono.
    pub fn load_decoded(
        &self,
        audio: DecodedAudio,
        root_note: u8,
    ) -> Result<Arc<SampleBank>, SamplerError> {
        let sample_rate = audio.sample_rate;
        self.load_sample(audio.into_mono(), sample_rate, root_note)
    }

    /// Decodes and loads an audio file.
    pub fn load_file(&self, path: &Path, root_note: u8) -> Result<Arc<SampleBank>, SamplerError> {
        info!(file = filename_display(path), "Loading sample");
        let audio = decode_file(path)?;
        debug!(
            channels = audio.channels,
            frames = audio.frames(),
            "Decoded sample"
        );
        self.load_decoded(audio, root_note)
    }

    /// Publishes new envelope parameters. The audio thread picks them up at
    /// the start of its next block.
    pub fn set_parameters(&self, params: AdsrParameters) {
        debug!(
            attack = params.attack,
            decay = params.decay,
            sustain = params.sustain,
            release = params.release,
            "Updating envelope"
        );
        self.shared.params.store(params);
    }

    pub fn parameters(&self) -> AdsrParameters {
        self.shared.params.load()
    }

    /// The peak summary of the loaded sample.
    pub fn waveform(&self) -> Arc<WaveformSnapshot> {
        self.shared.waveform.load_full()
    }

    pub fn current_bank(&self) -> Option<Arc<SampleBank>> {
        self.shared.bank.current()
    }

    /// Frees replaced samples that no voice is playing any more. Returns the
    /// number freed.
    pub fn collect_garbage(&self) -> usize {
        self.shared.bank.collect()
    }

    /// The number of replaced samples still held by a voice.
    pub fn retired_banks(&self) -> usize {
        self.shared.bank.retired_count()
    }
}

/// The audio thread half of the sampler.
pub struct SamplerEngine {
    shared: Arc<Shared>,
    renderer: BlockRenderer,
    snapshot: ParameterSnapshot,
    /// The bank sampled at the start of the last block.
    bank: Option<Arc<SampleBank>>,
}

impl SamplerEngine {
    /// Renders one block. Adds to `output`; does not clear it.
    pub fn render_block(
        &mut self,
        events: &[TimedNoteEvent],
        output: &mut [f32],
        num_samples: usize,
        sample_rate: u32,
    ) {
        if self.snapshot.refresh(&self.shared.params) {
            self.renderer.set_parameters(self.snapshot.params());
        }
        self.bank = self.shared.bank.current();
        self.renderer
            .render_block(events, output, num_samples, sample_rate, self.bank.as_ref());
    }

    /// The number of voices currently sounding.
    pub fn active_voices(&self) -> usize {
        self.renderer.pool().active_count()
    }

    pub fn renderer(&self) -> &BlockRenderer {
        &self.renderer
    }
}
