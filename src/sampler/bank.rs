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

//! Immutable sample data shared between the loader and the voices.
//!
//! A bank is never modified after it is built. Loading a new sample builds a
//! new bank and publishes it through a [`BankSlot`]; voices that are already
//! playing keep the bank they were started with. Replaced banks are parked in
//! a retired list on the control side and only dropped there, so the audio
//! thread never frees sample memory.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::debug;

use super::error::SamplerError;

/// The longest sample that will be kept, in seconds. Longer input is truncated.
pub const MAX_SAMPLE_SECONDS: u32 = 10;

/// The note a sample plays back at its recorded pitch unless told otherwise.
pub const DEFAULT_ROOT_NOTE: u8 = 60;

/// Mono sample data with its root note and sample rate.
#[derive(Debug)]
pub struct SampleBank {
    pcm: Box<[f32]>,
    root_note: u8,
    sample_rate: u32,
}

impl SampleBank {
    /// Builds a bank from mono samples. Input longer than
    /// [`MAX_SAMPLE_SECONDS`] is truncated and the root note is clamped to
    /// the MIDI range.
    pub fn new(mut pcm: Vec<f32>, sample_rate: u32, root_note: u8) -> Result<Self, SamplerError> {
        if sample_rate == 0 {
            return Err(SamplerError::invalid_audio("sample rate must be greater than zero"));
        }
        if pcm.is_empty() {
            return Err(SamplerError::invalid_audio("sample contains no audio"));
        }
        if let Some(index) = pcm.iter().position(|sample| !sample.is_finite()) {
            return Err(SamplerError::invalid_audio(format!(
                "non-finite sample at index {}",
                index
            )));
        }

        let max_len = sample_rate as usize * MAX_SAMPLE_SECONDS as usize;
        if pcm.len() > max_len {
            debug!(
                len = pcm.len(),
                max_len, "Truncating sample to maximum length"
            );
            pcm.truncate(max_len);
        }

        Ok(Self {
            pcm: pcm.into_boxed_slice(),
            root_note: root_note.min(127),
            sample_rate,
        })
    }

    /// The raw mono samples.
    pub fn pcm(&self) -> &[f32] {
        &self.pcm
    }

    pub fn len(&self) -> usize {
        self.pcm.len()
    }

    /// Always false; a bank holds at least one sample.
    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }

    pub fn root_note(&self) -> u8 {
        self.root_note
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The playback length at the recorded pitch.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.pcm.len() as f64 / f64::from(self.sample_rate))
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.pcm.len() * std::mem::size_of::<f32>()
    }

    /// Linearly interpolates the sample at a fractional position. Returns
    /// None once the position is past the last sample.
    #[inline]
    pub fn interpolate(&self, position: f64) -> Option<f32> {
        if !(0.0..self.pcm.len() as f64).contains(&position) {
            return None;
        }
        let index = position as usize;
        let frac = (position - index as f64) as f32;
        let s0 = *self.pcm.get(index)?;
        let s1 = self.pcm.get(index + 1).copied().unwrap_or(s0);
        Some(s0 + (s1 - s0) * frac)
    }
}

/// Publishes the current bank to the audio thread and holds on to replaced
/// banks until nothing else references them.
#[derive(Default)]
pub struct BankSlot {
    current: ArcSwapOption<SampleBank>,
    retired: Mutex<Vec<Arc<SampleBank>>>,
}

impl BankSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `bank` the current bank. The previous bank, if any, is retired.
    pub fn publish(&self, bank: SampleBank) -> Arc<SampleBank> {
        let bank = Arc::new(bank);
        if let Some(previous) = self.current.swap(Some(bank.clone())) {
            self.retired.lock().push(previous);
        }
        self.collect();
        bank
    }

    /// The current bank. Lock-free; safe to call from the audio thread.
    #[inline]
    pub fn current(&self) -> Option<Arc<SampleBank>> {
        self.current.load_full()
    }

    /// Drops retired banks that are no longer referenced anywhere else.
    /// Returns the number of banks freed.
    pub fn collect(&self) -> usize {
        let mut retired = self.retired.lock();
        let before = retired.len();
        retired.retain(|bank| Arc::strong_count(bank) > 1);
        let freed = before - retired.len();
        if freed > 0 {
            debug!(freed, remaining = retired.len(), "Freed retired sample banks");
        }
        freed
    }

    /// The number of retired banks still waiting on a voice.
    pub fn retired_count(&self) -> usize {
        self.retired.lock().len()
    }
}

impl std::fmt::Debug for BankSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BankSlot")
            .field("current", &self.current().map(|bank| bank.len()))
            .field("retired", &self.retired_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_audio() {
        assert!(matches!(
            SampleBank::new(vec![], 44100, 60),
            Err(SamplerError::InvalidAudioData { .. })
        ));
        assert!(matches!(
            SampleBank::new(vec![0.0, f32::NAN], 44100, 60),
            Err(SamplerError::InvalidAudioData { .. })
        ));
        assert!(matches!(
            SampleBank::new(vec![0.0, f32::INFINITY], 44100, 60),
            Err(SamplerError::InvalidAudioData { .. })
        ));
        assert!(matches!(
            SampleBank::new(vec![0.0], 0, 60),
            Err(SamplerError::InvalidAudioData { .. })
        ));
    }

    #[test]
    fn test_truncates_long_samples() {
        let bank = SampleBank::new(vec![0.1; 1000 * 12], 1000, 60).unwrap();
        assert_eq!(bank.len(), 10000);
        assert_eq!(bank.duration(), Duration::from_secs(10));
        assert_eq!(bank.memory_size(), 40000);
    }

    #[test]
    fn test_clamps_root_note() {
        let bank = SampleBank::new(vec![0.0], 44100, 200).unwrap();
        assert_eq!(bank.root_note(), 127);
    }

    #[test]
    fn test_interpolate() {
        let bank = SampleBank::new(vec![0.0, 1.0, -1.0], 44100, 60).unwrap();
        assert_eq!(bank.interpolate(0.0), Some(0.0));
        assert_eq!(bank.interpolate(0.5), Some(0.5));
        assert_eq!(bank.interpolate(1.0), Some(1.0));
        assert_eq!(bank.interpolate(1.5), Some(0.0));
        // The last sample has nothing to interpolate toward.
        assert_eq!(bank.interpolate(2.5), Some(-1.0));
        assert_eq!(bank.interpolate(3.0), None);
        assert_eq!(bank.interpolate(-0.5), None);
        assert_eq!(bank.interpolate(f64::NAN), None);
    }

    #[test]
    fn test_publish_retires_previous_bank() {
        let slot = BankSlot::new();
        assert!(slot.current().is_none());

        let first = slot.publish(SampleBank::new(vec![0.1], 44100, 60).unwrap());
        assert_eq!(slot.retired_count(), 0);

        // A voice still holds the first bank.
        let held = first.clone();
        drop(first);
        let second = slot.publish(SampleBank::new(vec![0.2, 0.3], 44100, 60).unwrap());
        assert_eq!(slot.retired_count(), 1);
        assert!(Arc::ptr_eq(&slot.current().unwrap(), &second));
        assert_eq!(held.pcm(), &[0.1]);

        // Nothing frees until the voice lets go.
        assert_eq!(slot.collect(), 0);
        drop(held);
        assert_eq!(slot.collect(), 1);
        assert_eq!(slot.retired_count(), 0);
    }
}
