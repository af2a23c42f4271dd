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

//! ADSR parameters and the lock-free snapshot shared between the control
//! thread and the audio thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::util::scale_from_gain;

/// Sustain levels at or below this gain (in dB) are treated as silence.
pub const SUSTAIN_FLOOR_DB: f32 = -70.0;

/// Converts a sustain gain in dB to a linear level between 0 and 1.
pub fn sustain_from_db(db: f32) -> f32 {
    if db.is_nan() || db <= SUSTAIN_FLOOR_DB {
        return 0.0;
    }
    scale_from_gain(db.min(0.0))
}

/// The shape of an ADSR envelope.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdsrParameters {
    /// Attack time in seconds.
    pub attack: f32,
    /// Decay time in seconds.
    pub decay: f32,
    /// Sustain level between 0 and 1.
    pub sustain: f32,
    /// Release time in seconds.
    pub release: f32,
}

impl Default for AdsrParameters {
    fn default() -> Self {
        Self {
            attack: 0.0,
            decay: 0.6,
            sustain: 1.0,
            release: 0.05,
        }
    }
}

impl AdsrParameters {
    /// Creates a new set of parameters.
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Returns a copy with negative or non-finite durations zeroed and the
    /// sustain level clamped to [0, 1].
    pub fn sanitized(&self) -> Self {
        Self {
            attack: sanitize_duration(self.attack),
            decay: sanitize_duration(self.decay),
            sustain: if self.sustain.is_nan() {
                0.0
            } else {
                self.sustain.clamp(0.0, 1.0)
            },
            release: sanitize_duration(self.release),
        }
    }
}

fn sanitize_duration(seconds: f32) -> f32 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}

/// Parameters written by the control thread and read once per block by the
/// audio thread. Every write bumps a generation counter so the reader can
/// skip copying unchanged values.
pub struct SharedParameters {
    current: ArcSwap<AdsrParameters>,
    generation: AtomicU64,
}

impl SharedParameters {
    /// Creates shared parameters with the given initial values.
    pub fn new(params: AdsrParameters) -> Self {
        Self {
            current: ArcSwap::from_pointee(params.sanitized()),
            generation: AtomicU64::new(1),
        }
    }

    /// Publishes new parameters. Never called from the audio thread.
    pub fn store(&self, params: AdsrParameters) {
        self.current.store(Arc::new(params.sanitized()));
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Copies out the most recently published parameters.
    pub fn load(&self) -> AdsrParameters {
        **self.current.load()
    }

    /// The number of writes so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for SharedParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedParameters")
            .field("current", &self.load())
            .field("generation", &self.generation())
            .finish()
    }
}

/// The audio thread's private copy of the shared parameters.
#[derive(Clone, Copy, Debug)]
pub struct ParameterSnapshot {
    params: AdsrParameters,
    generation: u64,
}

impl ParameterSnapshot {
    /// Takes an initial snapshot.
    pub fn new(shared: &SharedParameters) -> Self {
        let generation = shared.generation();
        Self {
            params: shared.load(),
            generation,
        }
    }

    /// Re-reads the shared parameters if they changed since the last refresh.
    /// Returns true if a new value was copied.
    pub fn refresh(&mut self, shared: &SharedParameters) -> bool {
        let generation = shared.generation();
        if generation == self.generation {
            return false;
        }
        self.params = shared.load();
        self.generation = generation;
        true
    }

    /// The snapshotted parameters.
    pub fn params(&self) -> AdsrParameters {
        self.params
    }
}
