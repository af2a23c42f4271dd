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

//! A single playing instance of the loaded sample.

use std::sync::Arc;

use super::bank::SampleBank;
use super::envelope::{EnvelopeGenerator, EnvelopeStage};
use super::params::AdsrParameters;

/// The lowest pitch ratio a voice will play at (eight octaves down).
pub const MIN_PITCH_RATIO: f64 = 1.0 / 256.0;

/// The highest pitch ratio a voice will play at (eight octaves up).
pub const MAX_PITCH_RATIO: f64 = 256.0;

/// Returns the playback rate of `note` relative to `root_note`.
pub fn pitch_ratio(note: u8, root_note: u8) -> f64 {
    let semitones = f64::from(note.min(127)) - f64::from(root_note.min(127));
    2f64.powf(semitones / 12.0).clamp(MIN_PITCH_RATIO, MAX_PITCH_RATIO)
}

/// A voice. Voices are created once by the pool and recycled.
pub struct SampleVoice {
    /// Index of this voice in its pool.
    id: usize,
    /// The MIDI note this voice was last started with.
    note: u8,
    /// Velocity scaled to [0, 1].
    velocity_gain: f32,
    /// Fractional read position in the bank.
    position: f64,
    pitch_ratio: f64,
    envelope: EnvelopeGenerator,
    /// The bank that was current when the voice was started.
    bank: Option<Arc<SampleBank>>,
    /// Trigger order stamp, used to pick the oldest voice when stealing.
    started_at: u64,
}

impl SampleVoice {
    /// Creates an idle voice.
    pub fn new(id: usize) -> Self {
        Self {
            id,
            note: 0,
            velocity_gain: 0.0,
            position: 0.0,
            pitch_ratio: 1.0,
            envelope: EnvelopeGenerator::new(),
            bank: None,
            started_at: 0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// The note this voice is playing, if any.
    pub fn note(&self) -> Option<u8> {
        if self.is_active() {
            Some(self.note)
        } else {
            None
        }
    }

    pub fn is_active(&self) -> bool {
        !self.envelope.is_idle()
    }

    pub fn is_releasing(&self) -> bool {
        self.envelope.is_releasing()
    }

    /// The envelope gain of the next sample.
    pub fn level(&self) -> f32 {
        self.envelope.level()
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.envelope.stage()
    }

    pub fn pitch_ratio(&self) -> f64 {
        self.pitch_ratio
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn bank(&self) -> Option<&Arc<SampleBank>> {
        self.bank.as_ref()
    }

    /// Sets the envelope shape used by the next trigger, release and render.
    pub fn prepare(&mut self, params: &AdsrParameters, sample_rate: u32) {
        self.envelope.prepare(params, sample_rate);
    }

    /// Starts playing `note` from the beginning of `bank`. The envelope
    /// attacks from wherever it currently is.
    pub fn start(&mut self, note: u8, velocity: u8, bank: Arc<SampleBank>, started_at: u64) {
        self.note = note.min(127);
        self.velocity_gain = f32::from(velocity.min(127)) / 127.0;
        self.pitch_ratio = pitch_ratio(self.note, bank.root_note());
        self.position = 0.0;
        self.bank = Some(bank);
        self.started_at = started_at;
        self.envelope.trigger();
    }

    /// Releases the note. The voice keeps sounding through its release.
    pub fn stop(&mut self) {
        self.envelope.release();
    }

    /// Silences the voice immediately.
    pub fn kill(&mut self) {
        self.envelope.reset();
    }

    /// Adds `num_samples` of output to `buffer` starting at `start`.
    ///
    /// The voice finishes early, leaving the rest of the range untouched, if
    /// the envelope completes its release or the read position runs off the
    /// end of the bank.
    pub fn render_into(
        &mut self,
        buffer: &mut [f32],
        start: usize,
        num_samples: usize,
        params: &AdsrParameters,
        sample_rate: u32,
    ) {
        if !self.is_active() {
            return;
        }
        let Some(bank) = self.bank.as_deref() else {
            self.envelope.reset();
            return;
        };

        let end = start.saturating_add(num_samples).min(buffer.len());
        if start >= end {
            return;
        }

        self.envelope.prepare(params, sample_rate);
        let increment =
            self.pitch_ratio * f64::from(bank.sample_rate()) / f64::from(sample_rate.max(1));

        for out in &mut buffer[start..end] {
            let Some(sample) = bank.interpolate(self.position) else {
                self.envelope.reset();
                break;
            };
            *out += sample * self.envelope.next_gain() * self.velocity_gain;
            self.position += increment;
            if self.envelope.is_idle() {
                break;
            }
        }
    }

    /// Lets go of the bank once the voice has gone idle.
    pub fn reclaim(&mut self) -> bool {
        if self.is_active() {
            return false;
        }
        self.bank = None;
        true
    }
}

impl std::fmt::Debug for SampleVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleVoice")
            .field("id", &self.id)
            .field("note", &self.note())
            .field("stage", &self.stage())
            .field("level", &self.level())
            .field("position", &self.position)
            .finish()
    }
}
