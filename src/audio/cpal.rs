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
use std::{error::Error, fmt};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    FromSample, SizedSample,
};
use crossbeam_channel::Receiver;
use tracing::{error, info, span, warn, Level};

use super::{Output, StreamRenderer, MAX_PENDING_EVENTS};
use crate::config;
use crate::sampler::{SamplerEngine, TimedNoteEvent};

/// The name that selects the host's default output device.
const DEFAULT_DEVICE: &str = "default";

/// A cpal output device.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The requested sample rate. The device default is used when unset.
    sample_rate: Option<u32>,
    /// The largest number of frames rendered at once.
    buffer_size: usize,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// A running cpal stream.
struct CpalOutput {
    // Held to keep the stream playing.
    _stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
}

impl Output for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn super::Device>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn super::Device> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices that have at least one output channel.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = output_configs
                    .map(|output_config| output_config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    devices.push(Device::new(device.name()?, max_channels, host_id, device));
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    fn new(name: String, max_channels: u16, host_id: cpal::HostId, device: cpal::Device) -> Device {
        Device {
            name,
            max_channels,
            host_id,
            device,
            sample_rate: None,
            buffer_size: config::Audio::default().buffer_size(),
        }
    }

    /// Gets the cpal device named in the configuration.
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let name = config.device();
        let mut device = if name == DEFAULT_DEVICE {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or("no default output device")?;
            let max_channels = device.default_output_config()?.channels();
            Device::new(device.name()?, max_channels, host.id(), device)
        } else {
            Device::list_cpal_devices()?
                .into_iter()
                .find(|device| device.name.trim() == name)
                .ok_or_else(|| format!("no device found with name {}", name))?
        };

        device.sample_rate = config.sample_rate();
        device.buffer_size = config.buffer_size();
        Ok(device)
    }

    /// Picks the stream configuration, preferring f32 output at the requested
    /// sample rate.
    fn stream_config(&self) -> Result<cpal::SupportedStreamConfig, Box<dyn Error>> {
        let Some(sample_rate) = self.sample_rate else {
            return Ok(self.device.default_output_config()?);
        };

        let rate = cpal::SampleRate(sample_rate);
        let mut matching = self
            .device
            .supported_output_configs()?
            .filter(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
            .collect::<Vec<_>>();
        matching.sort_by_key(|range| range.sample_format() != cpal::SampleFormat::F32);

        match matching.into_iter().next() {
            Some(range) => Ok(range.with_sample_rate(rate)),
            None => {
                warn!(
                    device = self.name,
                    sample_rate, "Sample rate not supported, using the device default"
                );
                Ok(self.device.default_output_config()?)
            }
        }
    }

    fn build_stream<T>(
        &self,
        stream_config: &cpal::StreamConfig,
        mut renderer: StreamRenderer,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: SizedSample + FromSample<f32>,
    {
        self.device.build_output_stream(
            stream_config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| renderer.render(data),
            |err| error!("CPAL output stream error: {}", err),
            None,
        )
    }
}

impl super::Device for Device {
    fn start(
        &self,
        engine: SamplerEngine,
        events: Receiver<TimedNoteEvent>,
    ) -> Result<Box<dyn Output>, Box<dyn Error>> {
        let span = span!(Level::INFO, "start output (cpal)");
        let _enter = span.enter();

        let supported = self.stream_config()?;
        let sample_format = supported.sample_format();
        let stream_config = supported.config();
        let sample_rate = stream_config.sample_rate.0;
        let channels = stream_config.channels;

        let renderer = StreamRenderer::new(
            engine,
            events,
            sample_rate,
            channels,
            self.buffer_size,
            MAX_PENDING_EVENTS,
        );
        let stream = match sample_format {
            cpal::SampleFormat::F32 => self.build_stream::<f32>(&stream_config, renderer)?,
            cpal::SampleFormat::I16 => self.build_stream::<i16>(&stream_config, renderer)?,
            cpal::SampleFormat::U16 => self.build_stream::<u16>(&stream_config, renderer)?,
            cpal::SampleFormat::I32 => self.build_stream::<i32>(&stream_config, renderer)?,
            format => return Err(format!("unsupported sample format {}", format).into()),
        };
        stream.play()?;

        info!(
            device = self.name,
            sample_rate,
            channels,
            format = %sample_format,
            buffer_size = self.buffer_size,
            "CPAL output stream started"
        );

        Ok(Box::new(CpalOutput {
            _stream: stream,
            sample_rate,
            channels,
        }))
    }
}
