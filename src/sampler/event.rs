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
use midly::live::LiveEvent;
use midly::MidiMessage;

/// All Sound Off.
const CC_ALL_SOUND_OFF: u8 = 120;
/// All Notes Off.
const CC_ALL_NOTES_OFF: u8 = 123;

/// A note event understood by the sampler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    AllNotesOff,
}

impl NoteEvent {
    /// Converts a live MIDI event into a note event. A note on with zero
    /// velocity is a note off. When `channel` is set, events on other
    /// channels are ignored.
    pub fn from_live(event: &LiveEvent, channel: Option<u8>) -> Option<NoteEvent> {
        let LiveEvent::Midi {
            channel: event_channel,
            message,
        } = event
        else {
            return None;
        };
        if channel.is_some_and(|channel| channel != event_channel.as_int()) {
            return None;
        }

        match *message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => Some(NoteEvent::NoteOff {
                note: key.as_int(),
            }),
            MidiMessage::NoteOn { key, vel } => Some(NoteEvent::NoteOn {
                note: key.as_int(),
                velocity: vel.as_int(),
            }),
            MidiMessage::NoteOff { key, .. } => Some(NoteEvent::NoteOff { note: key.as_int() }),
            MidiMessage::Controller { controller, .. }
                if matches!(controller.as_int(), CC_ALL_SOUND_OFF | CC_ALL_NOTES_OFF) =>
            {
                Some(NoteEvent::AllNotesOff)
            }
            _ => None,
        }
    }
}

/// A note event at a sample offset within a render block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimedNoteEvent {
    pub offset: u32,
    pub event: NoteEvent,
}

impl TimedNoteEvent {
    pub fn new(offset: u32, event: NoteEvent) -> Self {
        Self { offset, event }
    }

    pub fn note_on(offset: u32, note: u8, velocity: u8) -> Self {
        Self::new(offset, NoteEvent::NoteOn { note, velocity })
    }

    pub fn note_off(offset: u32, note: u8) -> Self {
        Self::new(offset, NoteEvent::NoteOff { note })
    }
}
