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

const DEFAULT_DEVICE: &str = "default";
const DEFAULT_BUFFER_SIZE: usize = 512;
const MAX_BUFFER_SIZE: usize = 8192;

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Audio {
    /// The audio output device. "default" picks the host's default output.
    device: Option<String>,

    /// Output sample rate in Hz. Uses the device default when unset.
    sample_rate: Option<u32>,

    /// The largest number of frames rendered at once (default: 512).
    buffer_size: Option<usize>,
}

impl Audio {
    /// New will create a new Audio configuration.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: Some(device.to_string()),
            sample_rate: None,
            buffer_size: None,
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    /// Returns the requested sample rate, if any.
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate.filter(|rate| *rate > 0)
    }

    /// Returns the render block size in frames, clamped to a sane range.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
            .unwrap_or(DEFAULT_BUFFER_SIZE)
            .clamp(1, MAX_BUFFER_SIZE)
    }
}

#[cfg(test)]
mod test {
    use config::{Config, File, FileFormat};

    use super::Audio;

    #[test]
    fn test_defaults() {
        let audio: Audio = Config::builder()
            .add_source(File::from_str("{}", FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(audio.device(), "default");
        assert_eq!(audio.sample_rate(), None);
        assert_eq!(audio.buffer_size(), 512);
    }

    #[test]
    fn test_parse() {
        let yaml = r#"
            device: "UltraLite-mk5"
            sample_rate: 48000
            buffer_size: 100000
        "#;
        let audio: Audio = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(audio.device(), "UltraLite-mk5");
        assert_eq!(audio.sample_rate(), Some(48000));
        assert_eq!(audio.buffer_size(), 8192);
    }

    #[test]
    fn test_new() {
        let audio = Audio::new("mock-device");
        assert_eq!(audio.device(), "mock-device");
        assert_eq!(Audio::default().device(), "default");
    }
}
