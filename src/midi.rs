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
use std::{error::Error, fmt, sync::Arc};

use crossbeam_channel::{Sender, TrySendError};
use midly::live::LiveEvent;
use tracing::{debug, warn};

use crate::sampler::{NoteEvent, TimedNoteEvent};

mod midir;
mod mock;

/// A MIDI device that note events can be read from.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Returns the name of the device.
    fn name(&self) -> String;

    /// Watches MIDI input for note events and sends them to the given sender.
    /// When `channel` is set, only that (zero based) channel is listened to.
    fn watch_events(
        &self,
        sender: Sender<TimedNoteEvent>,
        channel: Option<u8>,
    ) -> Result<(), Box<dyn Error>>;

    /// Stops watching events.
    fn stop_watch_events(&self);
}

/// Lists devices known to midir.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    midir::list()
}

/// Gets a device with the given name.
pub fn get_device(name: &str) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    };

    Ok(Arc::new(midir::get(name)?))
}

/// Parses a raw MIDI message and queues it for the audio thread if it is a
/// note event. Returns true if an event was queued.
fn forward_event(raw_event: &[u8], channel: Option<u8>, sender: &Sender<TimedNoteEvent>) -> bool {
    let event = match LiveEvent::parse(raw_event) {
        Ok(event) => event,
        Err(e) => {
            debug!(err = %e, "Ignoring unparseable MIDI message");
            return false;
        }
    };
    let Some(event) = NoteEvent::from_live(&event, channel) else {
        return false;
    };

    // Live events are applied at the start of the next block.
    match sender.try_send(TimedNoteEvent::new(0, event)) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            warn!(event = ?event.event, "Event queue full, dropping MIDI event");
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            debug!("Event receiver is gone, dropping MIDI event");
            false
        }
    }
}
