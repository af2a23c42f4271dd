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

//! MIDI-driven polyphonic sample playback.
//!
//! This module provides:
//! - A linear ADSR envelope per voice
//! - Voices that repitch a single shared sample per MIDI note
//! - A fixed-size voice pool with release-aware voice stealing
//! - Sample-accurate block rendering that never allocates or locks
//! - Lock-free hand-off of samples and parameters from the control thread

mod bank;
mod engine;
mod envelope;
mod error;
mod event;
mod params;
mod pool;
mod renderer;
mod voice;
mod waveform;

pub use bank::{BankSlot, SampleBank, DEFAULT_ROOT_NOTE, MAX_SAMPLE_SECONDS};
pub use engine::{Sampler, SamplerEngine};
pub use envelope::{EnvelopeGenerator, EnvelopeStage};
pub use error::SamplerError;
pub use event::{NoteEvent, TimedNoteEvent};
pub use params::{sustain_from_db, AdsrParameters, SharedParameters, SUSTAIN_FLOOR_DB};
pub use pool::{Allocation, VoicePool, DEFAULT_VOICE_COUNT};
pub use renderer::BlockRenderer;
pub use voice::{pitch_ratio, SampleVoice};
pub use waveform::{WaveformBlock, WaveformSnapshot, WAVEFORM_POINTS};
