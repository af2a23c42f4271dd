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

//! Configuration for the sample and its envelope.

use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;
use tracing::warn;

use super::error::ConfigError;
use crate::sampler::{
    sustain_from_db, AdsrParameters, DEFAULT_ROOT_NOTE, DEFAULT_VOICE_COUNT, SUSTAIN_FLOOR_DB,
};

const MAX_ATTACK: Duration = Duration::from_secs(20);
const MAX_DECAY: Duration = Duration::from_secs(60);
const MAX_RELEASE: Duration = Duration::from_secs(60);
const MAX_VOICES: usize = 64;

const DEFAULT_ATTACK: Duration = Duration::ZERO;
const DEFAULT_DECAY: Duration = Duration::from_millis(600);
const DEFAULT_SUSTAIN_DB: f32 = 0.0;
const DEFAULT_RELEASE: Duration = Duration::from_millis(50);

/// A YAML representation of the sample being played.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Instrument {
    /// The audio file to load, relative to the config file.
    file: Option<String>,

    /// The note the sample plays back at its recorded pitch (default: 60).
    root_note: Option<u8>,

    /// The number of voices (default: 3).
    voices: Option<usize>,

    /// The amplitude envelope.
    #[serde(default)]
    envelope: Envelope,
}

impl Instrument {
    /// New will create a new sample configuration.
    pub fn new(file: Option<&str>, root_note: Option<u8>, voices: Option<usize>) -> Instrument {
        Instrument {
            file: file.map(str::to_string),
            root_note,
            voices,
            envelope: Envelope::default(),
        }
    }

    /// Returns the audio file, if any.
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Returns the root note, clamped to the MIDI range.
    pub fn root_note(&self) -> u8 {
        self.root_note.unwrap_or(DEFAULT_ROOT_NOTE).min(127)
    }

    /// Returns the number of voices.
    pub fn voices(&self) -> usize {
        self.voices.unwrap_or(DEFAULT_VOICE_COUNT).clamp(1, MAX_VOICES)
    }

    /// Returns the envelope configuration.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }
}

/// A YAML representation of an ADSR envelope. Times are duration strings
/// such as "250ms" or "2s".
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Envelope {
    attack: Option<String>,
    decay: Option<String>,
    /// The sustain level in dB, from -70 (silent) to 0.
    sustain_db: Option<f32>,
    release: Option<String>,
}

impl Envelope {
    /// New will create a new envelope configuration.
    pub fn new(
        attack: Option<&str>,
        decay: Option<&str>,
        sustain_db: Option<f32>,
        release: Option<&str>,
    ) -> Envelope {
        Envelope {
            attack: attack.map(str::to_string),
            decay: decay.map(str::to_string),
            sustain_db,
            release: release.map(str::to_string),
        }
    }

    /// Returns the attack time (default: 0, max: 20s).
    pub fn attack(&self) -> Result<Duration, ConfigError> {
        parse_duration("envelope.attack", &self.attack, DEFAULT_ATTACK, MAX_ATTACK)
    }

    /// Returns the decay time (default: 600ms, max: 60s).
    pub fn decay(&self) -> Result<Duration, ConfigError> {
        parse_duration("envelope.decay", &self.decay, DEFAULT_DECAY, MAX_DECAY)
    }

    /// Returns the sustain gain in dB (default: 0, range: -70 to 0).
    pub fn sustain_db(&self) -> f32 {
        let sustain_db = self.sustain_db.unwrap_or(DEFAULT_SUSTAIN_DB);
        if sustain_db.is_nan() {
            return SUSTAIN_FLOOR_DB;
        }
        let clamped = sustain_db.clamp(SUSTAIN_FLOOR_DB, 0.0);
        if clamped != sustain_db {
            warn!(sustain_db, clamped, "Sustain level out of range, clamping");
        }
        clamped
    }

    /// Returns the release time (default: 50ms, max: 60s).
    pub fn release(&self) -> Result<Duration, ConfigError> {
        parse_duration(
            "envelope.release",
            &self.release,
            DEFAULT_RELEASE,
            MAX_RELEASE,
        )
    }

    /// Converts the configuration into envelope parameters.
    pub fn parameters(&self) -> Result<AdsrParameters, ConfigError> {
        Ok(AdsrParameters::new(
            self.attack()?.as_secs_f32(),
            self.decay()?.as_secs_f32(),
            sustain_from_db(self.sustain_db()),
            self.release()?.as_secs_f32(),
        ))
    }
}

fn parse_duration(
    field: &'static str,
    value: &Option<String>,
    default: Duration,
    max: Duration,
) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    let duration: Duration = DurationString::from_string(value.clone())
        .map_err(|e| ConfigError::InvalidDuration {
            field,
            value: value.clone(),
            reason: e.to_string(),
        })?
        .into();
    if duration > max {
        warn!(
            field,
            value = value.as_str(),
            max_ms = max.as_millis(),
            "Duration out of range, clamping"
        );
        return Ok(max);
    }
    Ok(duration)
}
