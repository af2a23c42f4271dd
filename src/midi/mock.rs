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

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::info;

use crate::sampler::TimedNoteEvent;

struct Watcher {
    sender: Sender<TimedNoteEvent>,
    channel: Option<u8>,
}

/// A mock device. Events are injected by hand instead of coming from hardware.
#[derive(Clone)]
pub struct Device {
    name: String,
    watcher: Arc<Mutex<Option<Watcher>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            watcher: Arc::new(Mutex::new(None)),
        }
    }

    /// Feeds a raw MIDI message through the device as if it had been received.
    /// Returns true if a note event was queued.
    #[cfg(test)]
    pub fn mock_event(&self, raw_event: &[u8]) -> bool {
        match self.watcher.lock().as_ref() {
            Some(watcher) => super::forward_event(raw_event, watcher.channel, &watcher.sender),
            None => false,
        }
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn watch_events(
        &self,
        sender: Sender<TimedNoteEvent>,
        channel: Option<u8>,
    ) -> Result<(), Box<dyn Error>> {
        let mut watcher = self.watcher.lock();
        if watcher.is_some() {
            return Err("Already watching events.".into());
        }
        info!(device = self.name, "Watching mock MIDI events.");
        *watcher = Some(Watcher { sender, channel });
        Ok(())
    }

    fn stop_watch_events(&self) {
        self.watcher.lock().take();
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
