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

//! Sample-accurate rendering of one block of audio.
//!
//! The block is split at each event's offset. Voices render up to the event,
//! the event is applied, and rendering resumes from there. Nothing in here
//! allocates, locks or logs.

use std::sync::Arc;

use super::bank::SampleBank;
use super::event::{NoteEvent, TimedNoteEvent};
use super::params::AdsrParameters;
use super::pool::VoicePool;

/// Renders blocks from a voice pool.
pub struct BlockRenderer {
    pool: VoicePool,
    params: AdsrParameters,
}

impl BlockRenderer {
    pub fn new(voices: usize, params: AdsrParameters) -> Self {
        Self {
            pool: VoicePool::new(voices),
            params: params.sanitized(),
        }
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    pub fn parameters(&self) -> AdsrParameters {
        self.params
    }

    /// Replaces the envelope parameters used from the next block on.
    pub fn set_parameters(&mut self, params: AdsrParameters) {
        self.params = params.sanitized();
    }

    /// Adds `num_samples` of output to `output`, applying `events` at their
    /// offsets. Events are expected in offset order; an offset earlier than
    /// the previous one is applied at the previous one, and offsets past the
    /// end of the block are applied at the end. Note ons are ignored when
    /// there is no bank.
    pub fn render_block(
        &mut self,
        events: &[TimedNoteEvent],
        output: &mut [f32],
        num_samples: usize,
        sample_rate: u32,
        bank: Option<&Arc<SampleBank>>,
    ) {
        let num_samples = num_samples.min(output.len());
        let params = self.params;
        self.pool.prepare(&params, sample_rate);

        let mut cursor = 0;
        for event in events {
            let at = (event.offset as usize).clamp(cursor, num_samples);
            if at > cursor {
                self.pool.render(output, cursor, at - cursor, &params, sample_rate);
                cursor = at;
            }
            self.dispatch(event.event, bank);
        }
        if cursor < num_samples {
            self.pool
                .render(output, cursor, num_samples - cursor, &params, sample_rate);
        }

        self.pool.reclaim();
    }

    fn dispatch(&mut self, event: NoteEvent, bank: Option<&Arc<SampleBank>>) {
        match event {
            NoteEvent::NoteOn { note, velocity: 0 } => {
                self.pool.note_off(note);
            }
            NoteEvent::NoteOn { note, velocity } => {
                if let Some(bank) = bank {
                    self.pool.note_on(note, velocity, bank);
                }
            }
            NoteEvent::NoteOff { note } => {
                self.pool.note_off(note);
            }
            NoteEvent::AllNotesOff => {
                self.pool.all_notes_off();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;
    use crate::sampler::params::sustain_from_db;

    fn flat() -> AdsrParameters {
        AdsrParameters::new(0.0, 0.0, 1.0, 0.0)
    }

    fn bank(pcm: Vec<f32>, sample_rate: u32) -> Arc<SampleBank> {
        Arc::new(SampleBank::new(pcm, sample_rate, 60).unwrap())
    }

    #[test]
    fn test_event_offsets_are_sample_accurate() {
        let bank = bank(vec![1.0; 1000], 48000);
        let mut renderer = BlockRenderer::new(3, flat());
        let mut output = vec![0.0; 16];
        renderer.render_block(
            &[
                TimedNoteEvent::note_on(4, 60, 127),
                TimedNoteEvent::note_off(10, 60),
            ],
            &mut output,
            16,
            48000,
            Some(&bank),
        );

        let mut expected = vec![0.0; 16];
        expected[4..10].fill(1.0);
        assert_eq!(output, expected);
        assert_eq!(renderer.pool().active_count(), 0);
    }

    #[test]
    fn test_output_is_additive() {
        let bank = bank(vec![0.5; 1000], 48000);
        let mut renderer = BlockRenderer::new(3, flat());
        let mut output = vec![0.25; 8];
        renderer.render_block(
            &[
                TimedNoteEvent::note_on(0, 60, 127),
                TimedNoteEvent::note_on(0, 60, 127),
            ],
            &mut output,
            8,
            48000,
            Some(&bank),
        );
        assert_eq!(output, vec![1.25; 8]);
    }

    #[test]
    fn test_offsets_past_end_apply_at_end() {
        let bank = bank(vec![1.0; 1000], 48000);
        let mut renderer = BlockRenderer::new(3, flat());
        let mut output = vec![0.0; 8];
        renderer.render_block(
            &[TimedNoteEvent::note_on(100, 60, 127)],
            &mut output,
            8,
            48000,
            Some(&bank),
        );
        assert_eq!(output, vec![0.0; 8]);
        assert_eq!(renderer.pool().active_count(), 1);

        // The note sounds from the start of the next block.
        let mut output = vec![0.0; 8];
        renderer.render_block(&[], &mut output, 8, 48000, Some(&bank));
        assert_eq!(output, vec![1.0; 8]);
    }

    #[test]
    fn test_backwards_offsets_are_clamped() {
        let bank = bank(vec![1.0; 1000], 48000);
        let mut renderer = BlockRenderer::new(3, flat());
        let mut output = vec![0.0; 8];
        renderer.render_block(
            &[
                TimedNoteEvent::note_on(6, 60, 127),
                TimedNoteEvent::note_on(2, 64, 127),
            ],
            &mut output,
            8,
            48000,
            Some(&bank),
        );
        // Both notes start at sample 6.
        assert_eq!(output, vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 2.0]);
    }

    #[test]
    fn test_no_bank_is_silent() {
        let mut renderer = BlockRenderer::new(3, flat());
        let mut output = vec![0.0; 8];
        renderer.render_block(
            &[TimedNoteEvent::note_on(0, 60, 127)],
            &mut output,
            8,
            48000,
            None,
        );
        assert_eq!(output, vec![0.0; 8]);
        assert_eq!(renderer.pool().active_count(), 0);
    }

    #[test]
    fn test_zero_velocity_note_on_releases() {
        let bank = bank(vec![1.0; 1000], 48000);
        let mut renderer = BlockRenderer::new(3, flat());
        let mut output = vec![0.0; 8];
        renderer.render_block(
            &[
                TimedNoteEvent::note_on(0, 60, 127),
                TimedNoteEvent::note_on(4, 60, 0),
            ],
            &mut output,
            8,
            48000,
            Some(&bank),
        );
        assert_eq!(output, vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_num_samples_limited_to_buffer() {
        let bank = bank(vec![1.0; 1000], 48000);
        let mut renderer = BlockRenderer::new(3, flat());
        let mut output = vec![0.0; 4];
        renderer.render_block(
            &[TimedNoteEvent::note_on(0, 60, 127)],
            &mut output,
            64,
            48000,
            Some(&bank),
        );
        assert_eq!(output, vec![1.0; 4]);

        // Only the requested samples are touched.
        let mut output = vec![0.0; 8];
        renderer.render_block(&[], &mut output, 2, 48000, Some(&bank));
        assert_eq!(output, vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_steal_within_one_block() {
        // Each sample value identifies the position it was read from.
        let pcm: Vec<f32> = (0..1000).map(|i| i as f32 / 1000.0).collect();
        let bank = bank(pcm, 48000);
        let params = AdsrParameters::default();
        let mut renderer = BlockRenderer::new(3, params);

        let mut output = vec![0.0; 64];
        renderer.render_block(
            &[
                TimedNoteEvent::note_on(0, 60, 127),
                TimedNoteEvent::note_on(8, 64, 127),
                TimedNoteEvent::note_on(16, 67, 127),
                TimedNoteEvent::note_on(32, 72, 127),
            ],
            &mut output,
            64,
            48000,
            Some(&bank),
        );

        let pool = renderer.pool();
        assert_eq!(pool.active_count(), 3);
        let notes: Vec<Option<u8>> = pool.voices().iter().map(|v| v.note()).collect();
        assert_eq!(notes, vec![Some(72), Some(64), Some(67)]);

        // The stolen voice restarted at the steal point and reads at twice
        // the speed: 32 samples at a ratio of 2 put it at position 64.
        let stolen = pool.voice(0).unwrap();
        assert!((stolen.position() - 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_steal_output_reflects_new_note() {
        // A ramp sample, so that the read speed shows up in the output.
        let pcm: Vec<f32> = (0..1000).map(|i| i as f32 / 1000.0).collect();
        let bank = bank(pcm, 48000);
        let mut renderer = BlockRenderer::new(1, flat());

        let mut output = vec![0.0; 8];
        renderer.render_block(
            &[TimedNoteEvent::note_on(0, 60, 127)],
            &mut output,
            8,
            48000,
            Some(&bank),
        );

        // Note 72 takes over note 60's voice at sample 4.
        let mut output = vec![0.0; 8];
        renderer.render_block(
            &[TimedNoteEvent::note_on(4, 72, 127)],
            &mut output,
            8,
            48000,
            Some(&bank),
        );
        let expected = [0.008, 0.009, 0.010, 0.011, 0.0, 0.002, 0.004, 0.006];
        for (actual, expected) in output.iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_stealing_releasing_voice_is_continuous() {
        let bank = bank(vec![0.5; 48000], 48000);
        // 480 sample attack, 4800 sample release.
        let params = AdsrParameters::new(0.01, 0.0, 1.0, 0.1);
        let mut renderer = BlockRenderer::new(1, params);
        let mut output = vec![0.0; 2048];
        renderer.render_block(
            &[
                TimedNoteEvent::note_on(0, 60, 127),
                TimedNoteEvent::note_off(1000, 60),
                TimedNoteEvent::note_on(1500, 64, 127),
            ],
            &mut output,
            2048,
            48000,
            Some(&bank),
        );

        let voice = renderer.pool().voice(0).unwrap();
        assert_eq!(voice.note(), Some(64));
        assert!(!voice.is_releasing());

        // The steal lands partway down the release, well above silence.
        let before = output[1499];
        let after = output[1500];
        assert!(before > 0.4 && before < 0.5, "before = {}", before);
        assert!((after - before).abs() < 1e-3, "{} -> {}", before, after);
        // The new attack climbs from there without a jump anywhere.
        for window in output[1000..].windows(2) {
            assert!((window[1] - window[0]).abs() < 1e-3);
        }
        assert!(output[2047] > after);
    }

    #[test]
    fn test_trigger_then_release_fades_out() {
        let params = AdsrParameters::new(0.0, 0.6, sustain_from_db(-70.0), 0.05);
        let bank = bank(vec![1.0; 48000], 48000);
        let mut renderer = BlockRenderer::new(3, params);

        let mut output = vec![0.0; 4096];
        renderer.render_block(
            &[
                TimedNoteEvent::note_on(0, 60, 127),
                TimedNoteEvent::note_off(0, 60),
            ],
            &mut output,
            4096,
            48000,
            Some(&bank),
        );

        assert_eq!(output[0], 1.0);
        assert!((output[1200] - 0.5).abs() < 1e-4);
        for pair in output[..2400].windows(2) {
            assert!(pair[1] < pair[0]);
        }
        assert!(output[2400..].iter().all(|s| *s == 0.0));
        assert_eq!(renderer.pool().active_count(), 0);
    }

    #[test]
    fn test_root_note_round_trip() {
        let pcm: Vec<f32> = (0..512).map(|i| (i as f32 * 0.05).sin() * 0.8).collect();
        let bank = bank(pcm.clone(), 44100);
        let sustain = 0.5;
        let mut renderer = BlockRenderer::new(1, AdsrParameters::new(0.0, 0.0, sustain, 1.0));

        let mut output = vec![0.0; 256];
        renderer.render_block(
            &[TimedNoteEvent::note_on(0, 60, 127)],
            &mut output,
            256,
            44100,
            Some(&bank),
        );
        for (actual, source) in output.iter().zip(pcm.iter()) {
            assert!((actual - source * sustain).abs() < 1e-6);
        }
    }

    #[test]
    fn test_split_blocks_match_single_block() {
        let mut rng = rand::thread_rng();
        let pcm: Vec<f32> = (0..4000).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let bank = bank(pcm, 44100);

        for _ in 0..20 {
            let params = AdsrParameters::new(
                rng.gen_range(0.0..0.01),
                rng.gen_range(0.0..0.01),
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..0.01),
            );
            let mut events: Vec<TimedNoteEvent> = (0..6)
                .map(|_| {
                    let note = rng.gen_range(48..72);
                    if rng.gen_bool(0.6) {
                        TimedNoteEvent::note_on(rng.gen_range(0..2048), note, rng.gen_range(1..128))
                    } else {
                        TimedNoteEvent::note_off(rng.gen_range(0..2048), note)
                    }
                })
                .collect();
            events.sort_by_key(|e| e.offset);

            let mut whole = BlockRenderer::new(3, params);
            let mut expected = vec![0.0; 2048];
            whole.render_block(&events, &mut expected, 2048, 44100, Some(&bank));

            let split_at = rng.gen_range(1..2047);
            let mut split = BlockRenderer::new(3, params);
            let mut actual = vec![0.0; 2048];
            let (first, second) = actual.split_at_mut(split_at);
            let first_events: Vec<TimedNoteEvent> = events
                .iter()
                .filter(|e| (e.offset as usize) < split_at)
                .copied()
                .collect();
            let second_events: Vec<TimedNoteEvent> = events
                .iter()
                .filter(|e| (e.offset as usize) >= split_at)
                .map(|e| TimedNoteEvent::new(e.offset - split_at as u32, e.event))
                .collect();
            split.render_block(&first_events, first, split_at, 44100, Some(&bank));
            split.render_block(&second_events, second, 2048 - split_at, 44100, Some(&bank));

            for (a, b) in actual.iter().zip(expected.iter()) {
                assert!(a.is_finite());
                assert!((a - b).abs() < 1e-3, "{} != {}", a, b);
            }
        }
    }
}
