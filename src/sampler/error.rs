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
use crate::audio::decode::DecodeError;

/// Errors surfaced while loading a sample.
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    /// The input was empty, malformed or could not be decoded. Decode
    /// failures keep the decoder error as their source.
    #[error("Invalid audio data: {reason}")]
    InvalidAudioData {
        reason: String,
        source: Option<DecodeError>,
    },
}

impl SamplerError {
    pub(crate) fn invalid_audio(reason: impl Into<String>) -> Self {
        SamplerError::InvalidAudioData {
            reason: reason.into(),
            source: None,
        }
    }
}

impl From<DecodeError> for SamplerError {
    fn from(err: DecodeError) -> Self {
        SamplerError::InvalidAudioData {
            reason: format!("unable to decode: {}", err),
            source: Some(err),
        }
    }
}
