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

use std::path::Path;
use std::time::Duration;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Extracts a displayable file name from a path, returning a fallback if the name is unreadable.
pub fn filename_display(path: &Path) -> &str {
    path.file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("unreadable file name")
}

/// Outputs the given duration in a minutes:seconds.millis format.
pub fn duration_minutes_seconds(duration: Duration) -> String {
    let minutes = duration.as_secs() / 60;
    let secs = duration.as_secs() - minutes * 60;
    format!("{}:{:02}.{:03}", minutes, secs, duration.subsec_millis())
}

/// Converts a gain in dB to a linear scale factor.
pub fn scale_from_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Returns the name of a MIDI note, with middle C (60) as C4.
pub fn note_name(note: u8) -> String {
    let octave = i32::from(note / 12) - 1;
    format!("{}{}", NOTE_NAMES[usize::from(note % 12)], octave)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::util::{duration_minutes_seconds, note_name, scale_from_gain};

    #[test]
    fn test_duration_minutes_strings() {
        assert_eq!("0:00.000", duration_minutes_seconds(Duration::new(0, 0)));
        assert_eq!(
            "0:05.250",
            duration_minutes_seconds(Duration::from_millis(5250))
        );
        assert_eq!("1:00.000", duration_minutes_seconds(Duration::new(60, 0)));
        assert_eq!("2:05.000", duration_minutes_seconds(Duration::new(125, 0)));
    }

    #[test]
    fn test_scale_from_gain() {
        assert_eq!(scale_from_gain(0.0), 1.0);
        assert!((scale_from_gain(-20.0) - 0.1).abs() < 1e-6);
        assert!((scale_from_gain(-40.0) - 0.01).abs() < 1e-6);
        assert!((scale_from_gain(20.0) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_note_name() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(69), "A4");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(127), "G9");
        assert_eq!(note_name(61), "C#4");
    }
}
