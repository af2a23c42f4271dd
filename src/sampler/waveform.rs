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

/// The number of buckets kept for a loaded sample.
pub const WAVEFORM_POINTS: usize = 1024;

const BARS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// The signed extremes of one bucket of samples.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WaveformBlock {
    pub min: f32,
    pub max: f32,
}

impl WaveformBlock {
    fn from_samples(samples: &[f32]) -> Self {
        let (min, max) = samples
            .iter()
            .fold((f32::MAX, f32::MIN), |(min, max), s| (min.min(*s), max.max(*s)));
        WaveformBlock { min, max }
    }

    /// The largest absolute value in the bucket.
    pub fn peak(&self) -> f32 {
        self.min.abs().max(self.max.abs())
    }
}

/// A fixed-size min/max summary of a sample, for display.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WaveformSnapshot {
    blocks: Vec<WaveformBlock>,
    source_len: usize,
}

impl WaveformSnapshot {
    /// A snapshot with no data.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Summarizes `pcm` into at most `points` signed min/max buckets.
    pub fn from_pcm(pcm: &[f32], points: usize) -> Self {
        if pcm.is_empty() || points == 0 {
            return Self::empty();
        }

        // Samples shorter than the point count get one bucket per sample.
        let step = pcm.len().div_ceil(points).max(1);
        let blocks = pcm.chunks(step).map(WaveformBlock::from_samples).collect();

        Self {
            blocks,
            source_len: pcm.len(),
        }
    }

    /// The buckets, in sample order.
    pub fn blocks(&self) -> &[WaveformBlock] {
        &self.blocks
    }

    /// The largest absolute value over the whole snapshot.
    pub fn peak(&self) -> f32 {
        self.blocks
            .iter()
            .fold(0.0f32, |peak, block| peak.max(block.peak()))
    }

    /// The number of samples the snapshot was built from.
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Renders the snapshot's envelope as a single line of block characters
    /// `width` columns wide.
    pub fn to_bars(&self, width: usize) -> String {
        if self.blocks.is_empty() || width == 0 {
            return String::new();
        }
        let step = self.blocks.len().div_ceil(width).max(1);
        self.blocks
            .chunks(step)
            .map(|chunk| {
                let peak = chunk
                    .iter()
                    .fold(0.0f32, |max, block| max.max(block.peak()))
                    .min(1.0);
                BARS[(peak * (BARS.len() - 1) as f32).round() as usize]
            })
            .collect()
    }
}
