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
use super::params::AdsrParameters;

/// The stage an envelope is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// A linear ADSR envelope measured in samples.
///
/// Each stage ramps linearly from the level the envelope had when the stage
/// was entered to the stage target. When a stage runs past its duration the
/// leftover samples are carried into the next stage, so advancing by `a`
/// and then `b` samples lands in the same place as advancing by `a + b`.
#[derive(Clone, Debug)]
pub struct EnvelopeGenerator {
    stage: EnvelopeStage,
    entry_level: f32,
    elapsed: f64,
    level: f32,
    params: AdsrParameters,
    sample_rate: f32,
}

impl Default for EnvelopeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvelopeGenerator {
    /// Creates an idle envelope.
    pub fn new() -> Self {
        Self {
            stage: EnvelopeStage::Idle,
            entry_level: 0.0,
            elapsed: 0.0,
            level: 0.0,
            params: AdsrParameters::default(),
            sample_rate: 0.0,
        }
    }

    /// The current stage.
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// The gain of the next sample to be output.
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_idle(&self) -> bool {
        self.stage == EnvelopeStage::Idle
    }

    pub fn is_releasing(&self) -> bool {
        self.stage == EnvelopeStage::Release
    }

    /// Starts the attack stage from the current level.
    pub fn trigger(&mut self) {
        self.enter(EnvelopeStage::Attack);
    }

    /// Starts the release stage from the current level. Does nothing if the
    /// envelope is idle.
    pub fn release(&mut self) {
        if self.is_idle() {
            return;
        }
        self.enter(EnvelopeStage::Release);
    }

    /// Silences the envelope immediately.
    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.entry_level = 0.0;
        self.elapsed = 0.0;
        self.level = 0.0;
    }

    /// Updates the parameters and sample rate used for subsequent steps.
    pub fn prepare(&mut self, params: &AdsrParameters, sample_rate: u32) {
        self.params = params.sanitized();
        self.sample_rate = sample_rate as f32;
        self.settle();
    }

    /// Moves the envelope forward by `samples` and returns the new level.
    pub fn advance(&mut self, samples: usize, params: &AdsrParameters, sample_rate: u32) -> f32 {
        self.prepare(params, sample_rate);
        self.step(samples);
        self.level
    }

    /// Returns the gain for the current sample and moves forward by one.
    /// Uses the parameters from the last call to `prepare`.
    #[inline]
    pub fn next_gain(&mut self) -> f32 {
        let gain = self.level;
        self.step(1);
        gain
    }

    fn step(&mut self, samples: usize) {
        if self.is_idle() || samples == 0 {
            return;
        }
        self.elapsed += samples as f64;
        self.settle();
    }

    fn enter(&mut self, stage: EnvelopeStage) {
        self.entry_level = self.level;
        self.stage = stage;
        self.elapsed = 0.0;
        self.settle();
    }

    fn duration(&self, stage: EnvelopeStage) -> f64 {
        let seconds = match stage {
            EnvelopeStage::Attack => self.params.attack,
            EnvelopeStage::Decay => self.params.decay,
            EnvelopeStage::Release => self.params.release,
            EnvelopeStage::Idle | EnvelopeStage::Sustain => return f64::INFINITY,
        };
        // Multiplied in f32 so that durations like 50 ms land on whole samples.
        f64::from(seconds * self.sample_rate)
    }

    fn target(&self, stage: EnvelopeStage) -> f32 {
        match stage {
            EnvelopeStage::Attack => 1.0,
            EnvelopeStage::Decay | EnvelopeStage::Sustain => self.params.sustain,
            EnvelopeStage::Release | EnvelopeStage::Idle => 0.0,
        }
    }

    /// Applies any pending stage transitions and recomputes the level.
    fn settle(&mut self) {
        loop {
            let duration = self.duration(self.stage);
            if self.elapsed < duration {
                break;
            }
            let next = match self.stage {
                EnvelopeStage::Attack => EnvelopeStage::Decay,
                EnvelopeStage::Decay => EnvelopeStage::Sustain,
                EnvelopeStage::Release => EnvelopeStage::Idle,
                EnvelopeStage::Idle | EnvelopeStage::Sustain => break,
            };
            self.entry_level = self.target(self.stage);
            self.elapsed -= duration;
            self.stage = next;
        }

        self.level = match self.stage {
            EnvelopeStage::Idle => {
                self.elapsed = 0.0;
                0.0
            }
            EnvelopeStage::Sustain => self.params.sustain,
            stage => {
                // The loop above guarantees elapsed < duration, so duration > 0.
                let progress = (self.elapsed / self.duration(stage)) as f32;
                let target = self.target(stage);
                self.entry_level + (target - self.entry_level) * progress
            }
        }
        .clamp(0.0, 1.0);
    }
}
