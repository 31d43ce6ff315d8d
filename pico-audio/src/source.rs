//! Sample sources the completion handler refills blocks from.

use crate::block::SampleBlock;
use crate::constants::BLOCK_SAMPLES;
use crate::synth::SynthEngine;

/// Read position in a caller-provided sample buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawSource {
    data: &'static [i16],
    offset: usize,
}

impl RawSource {
    pub(crate) fn new(data: &'static [i16]) -> Self {
        RawSource { data, offset: 0 }
    }

    /// Copy the next block, zero-padding past the end.
    ///
    /// Returns `true` once the cursor has reached the end of the buffer.
    pub(crate) fn fill(&mut self, block: &mut SampleBlock) -> bool {
        let remaining = &self.data[self.offset.min(self.data.len())..];
        let n = remaining.len().min(BLOCK_SAMPLES);
        block.samples[..n].copy_from_slice(&remaining[..n]);
        block.samples[n..].fill(0);
        self.offset += n;
        self.is_exhausted()
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.offset >= self.data.len()
    }
}

/// The provider currently feeding refills.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ActiveSource {
    Silence,
    Raw(RawSource),
    Synth,
}

/// Discriminant of [`ActiveSource`], for detecting switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SourceKind {
    Silence,
    Raw,
    Synth,
}

impl ActiveSource {
    pub(crate) fn kind(&self) -> SourceKind {
        match self {
            ActiveSource::Silence => SourceKind::Silence,
            ActiveSource::Raw(_) => SourceKind::Raw,
            ActiveSource::Synth => SourceKind::Synth,
        }
    }

    /// Overwrite `block` with the next samples from this source.
    ///
    /// Returns `true` when a raw buffer has just run out.
    pub(crate) fn fill<S: SynthEngine>(&mut self, block: &mut SampleBlock, synth: &mut S) -> bool {
        match self {
            ActiveSource::Silence => {
                block.samples.fill(0);
                false
            }
            ActiveSource::Raw(raw) => raw.fill(block),
            ActiveSource::Synth => {
                synth.render(block);
                false
            }
        }
    }
}
