//! Synthesis engine contract and the built-in multi-channel synthesizer.
//!
//! The output engine only ever calls [`SynthEngine::apply`] and
//! [`SynthEngine::render`], both from the DMA completion handler. Channel
//! parameters are changed by posting [`ChannelCommand`]s through
//! [`ChannelControl`](crate::playback::ChannelControl); they reach the engine
//! at the next completion edge, so oscillator state has a single writer.

#[cfg(feature = "synth")]
mod channel;
#[cfg(feature = "synth")]
mod engine;

#[cfg(feature = "synth")]
pub use channel::{AdsrPhase, AudioChannel};
#[cfg(feature = "synth")]
pub use engine::Synth;

use core::ops::{BitOr, BitOrAssign};

use crate::block::SampleBlock;

/// A source of synthesized audio driven by the completion handler.
pub trait SynthEngine {
    /// Apply one channel command. Called before `render` on the same edge.
    fn apply(&mut self, command: ChannelCommand);

    /// Overwrite `block` with the next block of mixed samples.
    ///
    /// Runs at interrupt time: must not block or allocate.
    fn render(&mut self, block: &mut SampleBlock);
}

/// Set of oscillator shapes mixed by a channel.
///
/// When several are enabled their outputs are averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Waveforms(pub u8);

impl Waveforms {
    pub const NONE: Waveforms = Waveforms(0);
    pub const SINE: Waveforms = Waveforms(8);
    pub const TRIANGLE: Waveforms = Waveforms(16);
    pub const SAW: Waveforms = Waveforms(32);
    pub const SQUARE: Waveforms = Waveforms(64);
    pub const NOISE: Waveforms = Waveforms(128);

    /// `true` if every bit of a non-empty `other` is set.
    pub const fn contains(self, other: Waveforms) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Waveforms {
    type Output = Waveforms;

    fn bitor(self, rhs: Waveforms) -> Waveforms {
        Waveforms(self.0 | rhs.0)
    }
}

impl BitOrAssign for Waveforms {
    fn bitor_assign(&mut self, rhs: Waveforms) {
        self.0 |= rhs.0;
    }
}

/// A parameter change or envelope trigger for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelCommand {
    pub channel: u8,
    pub action: ChannelAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelAction {
    Waveforms(Waveforms),
    /// Oscillator frequency in Hz.
    Frequency(u16),
    /// Channel volume, `0xffff` = full scale.
    Volume(u16),
    /// Square-wave duty threshold, `0x7fff` = 50 %.
    PulseWidth(u16),
    AttackMs(u16),
    DecayMs(u16),
    /// Sustain level, `0xffff` = full scale.
    Sustain(u16),
    ReleaseMs(u16),
    /// Start the envelope from its current level.
    TriggerAttack,
    /// Begin the release phase.
    TriggerRelease,
    /// Silence immediately.
    Off,
    /// Reset every parameter to its default and silence the channel.
    Restore,
    /// Switch to a sine wave at `frequency` and `volume` and start the
    /// attack phase.
    Tone { frequency: u16, volume: u16 },
}
