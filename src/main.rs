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
use std::error::Error;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use mtsampler::render::{self, RenderOptions};
use mtsampler::sampler::{Sampler, WaveformSnapshot, WAVEFORM_POINTS};
use mtsampler::{audio, config, midi, util};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// How often the control loop frees replaced samples.
const GARBAGE_INTERVAL: Duration = Duration::from_millis(500);

/// The width of the waveform printed by `inspect`.
const WAVEFORM_WIDTH: usize = 64;

/// Events queued between MIDI input and audio output when no MIDI input is configured.
const DEFAULT_QUEUE_SIZE: usize = 256;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=MIDI sampler

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/mtsampler
ExecStart=/usr/local/bin/mtsampler start "$MTSAMPLER_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=mtsampler.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A polyphonic MIDI sampler."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the available MIDI input devices.
    MidiDevices {},
    /// Decodes an audio file and prints its format and waveform.
    Inspect {
        /// The audio file to inspect.
        file: PathBuf,
    },
    /// Renders a sequence of notes with the configured sample to a WAV file.
    Render {
        /// The path to the player config.
        player_path: PathBuf,
        /// The WAV file to write.
        output_path: PathBuf,
        /// Comma separated MIDI note numbers, played one after another.
        #[arg(short, long, default_value = render::DEFAULT_NOTES)]
        notes: String,
        /// The length of the output in seconds. Defaults to the end of the
        /// last note plus its tail.
        #[arg(short, long)]
        seconds: Option<f32>,
        /// The velocity of every note.
        #[arg(short, long, default_value_t = 100)]
        velocity: u8,
        /// The time between note ons, e.g. 500ms.
        #[arg(long, default_value = "500ms")]
        spacing: String,
        /// How long each note is held, e.g. 400ms.
        #[arg(long, default_value = "400ms")]
        hold: String,
    },
    /// Starts the sampler with the given player config.
    Start {
        /// The path to the player config.
        player_path: PathBuf,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Inspect { file } => {
            let decoded = audio::decode::decode_file(&file)?;
            let duration = decoded.duration();
            let sample_rate = decoded.sample_rate;
            let channels = decoded.channels;
            let frames = decoded.frames();
            let mono = decoded.into_mono();
            let waveform = WaveformSnapshot::from_pcm(&mono, WAVEFORM_POINTS);

            println!("{}:", util::filename_display(&file));
            println!("  Sample rate: {} Hz", sample_rate);
            println!("  Channels: {}", channels);
            println!("  Frames: {}", frames);
            println!("  Duration: {}", util::duration_minutes_seconds(duration));
            println!("  Peak: {:.3}", waveform.peak());
            println!("  {}", waveform.to_bars(WAVEFORM_WIDTH));
        }
        Commands::Render {
            player_path,
            output_path,
            notes,
            seconds,
            velocity,
            spacing,
            hold,
        } => {
            let player = config::Player::deserialize(&player_path)?;
            let sampler = load_sampler(&player)?;
            let envelope = player.sampler().envelope();

            let length = match seconds {
                Some(seconds) => Some(
                    Duration::try_from_secs_f32(seconds)
                        .map_err(|e| format!("invalid length {}: {}", seconds, e))?,
                ),
                None => None,
            };
            let options = RenderOptions {
                notes: render::parse_notes(&notes)?,
                velocity: velocity.min(127),
                spacing: parse_duration(&spacing)?,
                hold: parse_duration(&hold)?,
                length,
                tail: envelope.release()? + Duration::from_millis(100),
                sample_rate: player.audio().sample_rate().unwrap_or(48000),
                block_size: player.audio().buffer_size(),
            };

            let stats = render::render_to_file(
                &sampler,
                player.sampler().voices(),
                &options,
                &output_path,
            )?;
            println!(
                "Rendered {} ({} frames, peak {:.3}).",
                util::filename_display(&output_path),
                stats.frames,
                stats.peak
            );
        }
        Commands::Start { player_path } => {
            start(&player_path)?;
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}

/// Creates a sampler from the config and loads its sample, if any.
fn load_sampler(player: &config::Player) -> Result<Sampler, Box<dyn Error>> {
    let instrument = player.sampler();
    let sampler = Sampler::new(instrument.envelope().parameters()?);
    match player.sample_file() {
        Some(file) => {
            sampler.load_file(&file, instrument.root_note())?;
        }
        None => warn!("No sample file configured, output will be silent"),
    }
    Ok(sampler)
}

/// Runs the sampler until the process is killed.
fn start(player_path: &Path) -> Result<(), Box<dyn Error>> {
    let player = config::Player::deserialize(player_path)?;
    let sampler = load_sampler(&player)?;

    let queue_size = player
        .midi()
        .map(|midi| midi.queue_size())
        .unwrap_or(DEFAULT_QUEUE_SIZE);
    let (sender, receiver) = crossbeam_channel::bounded(queue_size);

    let device = audio::get_device(player.audio())?;
    let output = device.start(sampler.engine(player.sampler().voices()), receiver)?;
    info!(
        device = %device,
        sample_rate = output.sample_rate(),
        channels = output.channels(),
        "Audio output started"
    );

    let midi_device = match player.midi() {
        Some(midi_config) => {
            let midi_device = midi::get_device(midi_config.device())?;
            midi_device.watch_events(sender, midi_config.channel()?)?;
            Some(midi_device)
        }
        None => {
            warn!("No MIDI device configured, nothing will trigger the sampler");
            None
        }
    };

    loop {
        thread::sleep(GARBAGE_INTERVAL);
        let freed = sampler.collect_garbage();
        if freed > 0 {
            debug!(
                freed,
                midi_device = midi_device.as_ref().map(|device| device.name()),
                "Freed replaced samples"
            );
        }
    }
}

fn parse_duration(value: &str) -> Result<Duration, Box<dyn Error>> {
    Ok(DurationString::from_string(value.to_string())
        .map_err(|e| format!("invalid duration {}: {}", value, e))?
        .into())
}
