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

//! Voice allocation for polyphonic sample playback.
//!
//! The pool owns a fixed number of voices, allocated once. When every voice
//! is busy a new note steals one: the quietest voice that is already
//! releasing, or failing that the oldest voice.

use std::sync::Arc;

use super::bank::SampleBank;
use super::params::AdsrParameters;
use super::voice::SampleVoice;

/// The number of voices a pool has unless configured otherwise.
pub const DEFAULT_VOICE_COUNT: usize = 3;

/// How a voice was chosen for a new note.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Allocation {
    /// The voice was idle.
    Free,
    /// The voice was releasing and restarts from its current level.
    Released,
    /// The voice was still held and is cut off.
    Stolen,
}

/// A fixed-capacity collection of voices.
pub struct VoicePool {
    voices: Vec<SampleVoice>,
    /// Incremented on every note on, used to order voices by age.
    trigger_count: u64,
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new(DEFAULT_VOICE_COUNT)
    }
}

impl VoicePool {
    /// Creates a pool with `capacity` voices. A pool always has at least one.
    pub fn new(capacity: usize) -> Self {
        Self {
            voices: (0..capacity.max(1)).map(SampleVoice::new).collect(),
            trigger_count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    pub fn voices(&self) -> &[SampleVoice] {
        &self.voices
    }

    pub fn voice(&self, id: usize) -> Option<&SampleVoice> {
        self.voices.get(id)
    }

    /// The number of voices that are currently sounding.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Sets the envelope shape on every voice.
    pub fn prepare(&mut self, params: &AdsrParameters, sample_rate: u32) {
        for voice in self.voices.iter_mut() {
            voice.prepare(params, sample_rate);
        }
    }

    /// Starts `note` on a voice and returns the voice's id.
    pub fn note_on(&mut self, note: u8, velocity: u8, bank: &Arc<SampleBank>) -> usize {
        self.note_on_with_allocation(note, velocity, bank).0
    }

    /// Like [`VoicePool::note_on`], but also reports how the voice was found.
    pub fn note_on_with_allocation(
        &mut self,
        note: u8,
        velocity: u8,
        bank: &Arc<SampleBank>,
    ) -> (usize, Allocation) {
        let (id, allocation) = self.select_voice();
        self.trigger_count += 1;

        let voice = &mut self.voices[id];
        if allocation == Allocation::Stolen {
            voice.kill();
        }
        voice.start(note, velocity, bank.clone(), self.trigger_count);
        (id, allocation)
    }

    /// Releases every held voice playing `note`. Returns the number released.
    pub fn note_off(&mut self, note: u8) -> usize {
        let mut released = 0;
        for voice in self.voices.iter_mut() {
            if voice.note() == Some(note) && !voice.is_releasing() {
                voice.stop();
                released += 1;
            }
        }
        released
    }

    /// Releases every held voice. Returns the number released.
    pub fn all_notes_off(&mut self) -> usize {
        let mut released = 0;
        for voice in self.voices.iter_mut() {
            if voice.is_active() && !voice.is_releasing() {
                voice.stop();
                released += 1;
            }
        }
        released
    }

    /// Adds the output of every sounding voice to `buffer[start..start + num_samples]`.
    pub fn render(
        &mut self,
        buffer: &mut [f32],
        start: usize,
        num_samples: usize,
        params: &AdsrParameters,
        sample_rate: u32,
    ) {
        for voice in self.voices.iter_mut().filter(|v| v.is_active()) {
            voice.render_into(buffer, start, num_samples, params, sample_rate);
        }
    }

    /// Returns idle voices to the free state. Returns the number of idle voices.
    pub fn reclaim(&mut self) -> usize {
        self.voices
            .iter_mut()
            .map(|voice| voice.reclaim())
            .filter(|reclaimed| *reclaimed)
            .count()
    }

    fn select_voice(&self) -> (usize, Allocation) {
        if let Some(voice) = self.voices.iter().find(|v| !v.is_active()) {
            return (voice.id(), Allocation::Free);
        }

        let quietest_release = self
            .voices
            .iter()
            .filter(|v| v.is_releasing())
            .min_by(|a, b| {
                a.level()
                    .total_cmp(&b.level())
                    .then(a.started_at().cmp(&b.started_at()))
            });
        if let Some(voice) = quietest_release {
            return (voice.id(), Allocation::Released);
        }

        let oldest = self
            .voices
            .iter()
            .min_by_key(|v| v.started_at())
            .map(|v| v.id())
            .unwrap_or(0);
        (oldest, Allocation::Stolen)
    }
}
