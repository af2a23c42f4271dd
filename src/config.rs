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
use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;
use tracing::info;

mod audio;
mod error;
mod midi;
mod sampler;

pub use audio::Audio;
pub use error::ConfigError;
pub use midi::Midi;
pub use sampler::{Envelope, Instrument};

/// The configuration for the sampler program.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Player {
    /// The audio output configuration.
    #[serde(default)]
    audio: Audio,

    /// The MIDI input configuration. No MIDI input is opened when unset.
    midi: Option<Midi>,

    /// The sample and its envelope.
    #[serde(default)]
    sampler: Instrument,

    /// The directory relative paths are resolved against.
    #[serde(skip)]
    base_path: PathBuf,
}

impl Player {
    /// Creates a new player configuration.
    pub fn new(audio: Audio, midi: Option<Midi>, sampler: Instrument) -> Player {
        Player {
            audio,
            midi,
            sampler,
            base_path: PathBuf::new(),
        }
    }

    /// Parse a player configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Player, ConfigError> {
        let mut player = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Player>()?;
        player.base_path = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        info!(
            path = ?path,
            audio_device = player.audio.device(),
            midi_device = player.midi.as_ref().map(|midi| midi.device()),
            "Loaded player configuration"
        );
        Ok(player)
    }

    /// Returns the audio configuration.
    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    /// Returns the MIDI configuration.
    pub fn midi(&self) -> Option<&Midi> {
        self.midi.as_ref()
    }

    /// Returns the sample configuration.
    pub fn sampler(&self) -> &Instrument {
        &self.sampler
    }

    /// Returns the sample file resolved against the config file's directory.
    pub fn sample_file(&self) -> Option<PathBuf> {
        self.sampler.file().map(|file| self.base_path.join(file))
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::Player;
    use crate::config::ConfigError;

    #[test]
    fn test_deserialize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mtsampler.yaml");
        std::fs::write(
            &path,
            r#"
audio:
  device: "default"
  sample_rate: 48000
  buffer_size: 256
midi:
  device: "Keystation"
  channel: 1
sampler:
  file: "samples/piano-c4.wav"
  root_note: 60
  voices: 4
  envelope:
    attack: 0ms
    decay: 600ms
    sustain_db: -70
    release: 50ms
"#,
        )
        .unwrap();

        let player = Player::deserialize(&path).unwrap();
        assert_eq!(player.audio().device(), "default");
        assert_eq!(player.audio().sample_rate(), Some(48000));
        assert_eq!(player.audio().buffer_size(), 256);
        assert_eq!(player.midi().unwrap().device(), "Keystation");
        assert_eq!(player.midi().unwrap().channel().unwrap(), Some(0));
        assert_eq!(player.sampler().voices(), 4);
        assert_eq!(
            player.sample_file(),
            Some(dir.path().join("samples/piano-c4.wav"))
        );

        let params = player.sampler().envelope().parameters().unwrap();
        assert_eq!(params.attack, 0.0);
        assert_eq!(params.sustain, 0.0);
    }

    #[test]
    fn test_minimal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.yaml");
        std::fs::write(&path, "sampler:\n  file: kick.wav\n").unwrap();

        let player = Player::deserialize(&path).unwrap();
        assert_eq!(player.audio().device(), "default");
        assert!(player.midi().is_none());
        assert_eq!(player.sampler().root_note(), 60);
        assert_eq!(player.sample_file(), Some(dir.path().join("kick.wav")));
    }

    #[test]
    fn test_missing_file() {
        let result = Player::deserialize(&PathBuf::from("/nonexistent/mtsampler.yaml"));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_new_has_no_sample_file() {
        let player = Player::new(Default::default(), None, Default::default());
        assert!(player.sample_file().is_none());
    }
}
