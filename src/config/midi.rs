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
use serde::Deserialize;

use super::error::ConfigError;

const DEFAULT_QUEUE_SIZE: usize = 256;

/// A YAML representation of the MIDI configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Midi {
    /// The MIDI input device. Matched as a substring of the port name.
    device: String,

    /// Only listen to this channel (1-16). Listens to every channel when unset.
    channel: Option<u8>,

    /// How many events may wait for the audio thread before new ones are dropped.
    queue_size: Option<usize>,
}

impl Midi {
    /// New will create a new MIDI configuration.
    pub fn new(device: &str, channel: Option<u8>) -> Midi {
        Midi {
            device: device.to_string(),
            channel,
            queue_size: None,
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Returns the zero based channel to listen to, if any.
    pub fn channel(&self) -> Result<Option<u8>, ConfigError> {
        match self.channel {
            None => Ok(None),
            Some(channel @ 1..=16) => Ok(Some(channel - 1)),
            Some(channel) => Err(ConfigError::InvalidValue {
                field: "midi.channel",
                reason: format!("{} is not between 1 and 16", channel),
            }),
        }
    }

    /// Returns the size of the event queue.
    pub fn queue_size(&self) -> usize {
        self.queue_size.unwrap_or(DEFAULT_QUEUE_SIZE).max(1)
    }
}
