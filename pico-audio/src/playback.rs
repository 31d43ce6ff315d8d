//! Playback state machine and the background control handle.
//!
//! [`AudioShared`] holds everything the two execution contexts share: the
//! playback state, the output gain and two lock-free hand-offs. It is split
//! once into an [`AudioPlayer`] for background code and an [`EngineLink`]
//! that the interrupt-side [`AudioOutputI2S`](crate::io::AudioOutputI2S)
//! consumes.
//!
//! ```text
//!  background                       shared                      DMA IRQ
//! ┌────────────┐  push   ┌─────────────────────────┐  pop   ┌──────────────┐
//! │ AudioPlayer├────────►│ raw_request (mailbox)   ├───────►│              │
//! │            ├────────►│ synth_commands (SPSC)   ├───────►│ EngineLink   │
//! │            │  store  │ state  (AtomicU8)       │  load  │              │
//! │            ├────────►│ gain   (AtomicU8)       ├───────►│              │
//! └────────────┘         └─────────────────────────┘        └──────────────┘
//! ```
//!
//! Changes become visible at the next completion edge and never block. The
//! handler only writes the state for the `PlayingBuffer -> Idle` transition
//! when a raw buffer runs out.
//!
//! Both halves are expected to run on the same core: the handler never runs
//! concurrently with a half-finished `play_raw_buffer` on another core.
//! Shared words are only ever loaded and stored, which is all a Cortex-M0+
//! offers; the one-time [`AudioShared::split`] check runs inside a critical
//! section instead.

use core::cell::Cell;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::constants::{CHANNEL_COUNT, COMMAND_SLOTS};
use crate::error::Error;
use crate::io::mailbox::Mailbox;
use crate::io::spsc::SpscQueue;
use crate::synth::{ChannelAction, ChannelCommand, Waveforms};
use crate::volume::{AtomicGain, Gain};

/// What the engine is currently sending to the I2S pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PlaybackState {
    /// Silence. The bit clock keeps running.
    Idle = 0,
    /// Streaming a caller-provided sample buffer.
    PlayingBuffer = 1,
    /// Streaming the synthesis engine's output.
    PlayingSynth = 2,
}

impl PlaybackState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => PlaybackState::PlayingBuffer,
            2 => PlaybackState::PlayingSynth,
            _ => PlaybackState::Idle,
        }
    }
}

pub(crate) struct AtomicPlaybackState(AtomicU8);

impl AtomicPlaybackState {
    const fn new(state: PlaybackState) -> Self {
        AtomicPlaybackState(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> PlaybackState {
        PlaybackState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: PlaybackState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// State shared between [`AudioPlayer`] and the completion handler.
///
/// Lives in a `static` (or anything that outlives both halves):
///
/// ```ignore
/// static AUDIO: AudioShared = AudioShared::new();
///
/// let (player, link) = AUDIO.split().unwrap();
/// ```
pub struct AudioShared {
    pub(crate) state: AtomicPlaybackState,
    gain: AtomicGain,
    pub(crate) raw_request: Mailbox<&'static [i16]>,
    synth_commands: SpscQueue<ChannelCommand, COMMAND_SLOTS>,
    split: AtomicBool,
}

impl AudioShared {
    /// Idle, mid-scale gain, nothing queued.
    pub const fn new() -> Self {
        AudioShared {
            state: AtomicPlaybackState::new(PlaybackState::Idle),
            gain: AtomicGain::new(Gain(crate::constants::DEFAULT_GAIN)),
            raw_request: Mailbox::new(),
            synth_commands: SpscQueue::new(),
            split: AtomicBool::new(false),
        }
    }

    /// Hand out the producer and consumer halves.
    ///
    /// Returns `None` after the first call: each hand-off has exactly one
    /// producer and one consumer.
    pub fn split(&self) -> Option<(AudioPlayer<'_>, EngineLink<'_>)> {
        let first = critical_section::with(|_| {
            let taken = self.split.load(Ordering::Relaxed);
            self.split.store(true, Ordering::Relaxed);
            !taken
        });
        if !first {
            return None;
        }
        Some((
            AudioPlayer {
                shared: self,
                _not_sync: PhantomData,
            },
            EngineLink { shared: self },
        ))
    }

    /// Current playback state.
    pub fn state(&self) -> PlaybackState {
        self.state.load()
    }
}

impl Default for AudioShared {
    fn default() -> Self {
        Self::new()
    }
}

/// Background-side control handle.
///
/// There is only ever one, and it cannot be shared between contexts
/// (`!Sync`), which keeps each hand-off single-producer.
pub struct AudioPlayer<'a> {
    shared: &'a AudioShared,
    _not_sync: PhantomData<Cell<()>>,
}

impl<'a> AudioPlayer<'a> {
    /// Set the output volume. `value` is clamped to `[0.0, 1.0]`.
    pub fn set_volume(&self, value: f32) {
        self.set_gain(Gain::from_normalized(value));
    }

    /// Current output volume in `[0.0, 1.0]`.
    pub fn volume(&self) -> f32 {
        self.gain().to_normalized()
    }

    /// Add `delta` to the volume, clamping the result.
    pub fn adjust_volume(&self, delta: f32) {
        self.set_volume(self.volume() + delta);
    }

    /// Current output gain as the raw `0..=255` step.
    pub fn gain(&self) -> Gain {
        self.shared.gain.load()
    }

    /// Set the output gain directly, skipping the float mapping.
    pub fn set_gain(&self, gain: Gain) {
        self.shared.gain.store(gain);
    }

    /// Stream `data` once, then fall back to silence.
    ///
    /// Pre-empts whatever is playing no later than the next refill, and
    /// replaces any request the handler has not picked up yet. `data` is
    /// borrowed for `'static` because the handler reads it long after this
    /// call returns. Only an empty `data` is rejected.
    pub fn play_raw_buffer(&self, data: &'static [i16]) -> Result<(), Error> {
        if data.is_empty() {
            warn!("rejecting empty sample buffer");
            return Err(Error::EmptyBuffer);
        }
        // The request must be posted before the state flips, so the handler
        // never sees PlayingBuffer without something to play.
        self.shared.raw_request.post(data);
        self.shared.state.store(PlaybackState::PlayingBuffer);
        debug!("playing raw buffer of {} samples", data.len());
        Ok(())
    }

    /// Stream the synthesis engine's output.
    pub fn play_synth(&self) {
        self.shared.state.store(PlaybackState::PlayingSynth);
        debug!("playing synth");
    }

    /// Switch to silence. Idempotent; the DMA chain keeps running.
    pub fn stop_playing(&self) {
        self.shared.state.store(PlaybackState::Idle);
        debug!("stopped");
    }

    /// Current playback state, including the handler's own
    /// `PlayingBuffer -> Idle` transition.
    pub fn state(&self) -> PlaybackState {
        self.shared.state.load()
    }

    /// Control handle for synth channel `index`.
    pub fn channel(&self, index: usize) -> Result<ChannelControl<'_>, Error> {
        if index >= CHANNEL_COUNT {
            warn!("synth channel {} out of range", index);
            return Err(Error::InvalidChannel(index));
        }
        Ok(ChannelControl {
            player: self,
            index: index as u8,
        })
    }

    fn send(&self, command: ChannelCommand) -> Result<(), Error> {
        self.shared.synth_commands.push(command).map_err(|_| {
            warn!("synth command queue full");
            Error::CommandQueueFull
        })
    }
}

/// Map `[0.0, 1.0]` onto `0..=0xffff`.
fn unit_to_u16(value: f32) -> u16 {
    let clamped = if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    };
    (clamped * 65535.0 + 0.5) as u16
}

/// Parameter and envelope control for one synth channel.
///
/// Every call posts a [`ChannelCommand`] that the engine applies at the next
/// completion edge.
pub struct ChannelControl<'p> {
    player: &'p AudioPlayer<'p>,
    index: u8,
}

impl<'p> ChannelControl<'p> {
    /// The channel this handle controls.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    fn send(&self, action: ChannelAction) -> Result<(), Error> {
        self.player.send(ChannelCommand {
            channel: self.index,
            action,
        })
    }

    /// Select which oscillators are mixed into this channel.
    pub fn set_waveforms(&self, waveforms: Waveforms) -> Result<(), Error> {
        self.send(ChannelAction::Waveforms(waveforms))
    }

    /// Oscillator frequency in Hz.
    pub fn set_frequency(&self, hz: u16) -> Result<(), Error> {
        self.send(ChannelAction::Frequency(hz))
    }

    /// Channel volume in `[0.0, 1.0]`.
    pub fn set_volume(&self, value: f32) -> Result<(), Error> {
        self.send(ChannelAction::Volume(unit_to_u16(value)))
    }

    /// Square-wave duty cycle in `[0.0, 1.0]`.
    pub fn set_pulse_width(&self, duty: f32) -> Result<(), Error> {
        self.send(ChannelAction::PulseWidth(unit_to_u16(duty)))
    }

    /// Envelope attack time.
    pub fn set_attack_ms(&self, ms: u16) -> Result<(), Error> {
        self.send(ChannelAction::AttackMs(ms))
    }

    /// Envelope decay time.
    pub fn set_decay_ms(&self, ms: u16) -> Result<(), Error> {
        self.send(ChannelAction::DecayMs(ms))
    }

    /// Sustain level in `[0.0, 1.0]`.
    pub fn set_sustain(&self, level: f32) -> Result<(), Error> {
        self.send(ChannelAction::Sustain(unit_to_u16(level)))
    }

    /// Envelope release time.
    pub fn set_release_ms(&self, ms: u16) -> Result<(), Error> {
        self.send(ChannelAction::ReleaseMs(ms))
    }

    /// Start the envelope from its attack phase.
    pub fn trigger_attack(&self) -> Result<(), Error> {
        self.send(ChannelAction::TriggerAttack)
    }

    /// Move the envelope into its release phase.
    pub fn trigger_release(&self) -> Result<(), Error> {
        self.send(ChannelAction::TriggerRelease)
    }

    /// Silence the channel at once, skipping the release.
    pub fn off(&self) -> Result<(), Error> {
        self.send(ChannelAction::Off)
    }

    /// Reset every parameter of this channel to its default.
    pub fn restore(&self) -> Result<(), Error> {
        self.send(ChannelAction::Restore)
    }

    /// Start a sine tone immediately. `volume` is in `[0.0, 1.0]`.
    pub fn play_tone(&self, frequency: u16, volume: f32) -> Result<(), Error> {
        self.send(ChannelAction::Tone {
            frequency,
            volume: unit_to_u16(volume),
        })
    }
}

/// Interrupt-side half of [`AudioShared`].
///
/// Only [`AudioOutputI2S`](crate::io::AudioOutputI2S) uses this.
pub struct EngineLink<'a> {
    shared: &'a AudioShared,
}

impl<'a> EngineLink<'a> {
    pub(crate) fn state(&self) -> PlaybackState {
        self.shared.state.load()
    }

    pub(crate) fn gain(&self) -> Gain {
        self.shared.gain.load()
    }

    /// Newest posted raw buffer; older ones are superseded.
    pub(crate) fn take_raw_request(&self) -> Option<&'static [i16]> {
        self.shared.raw_request.take()
    }

    pub(crate) fn next_command(&self) -> Option<ChannelCommand> {
        self.shared.synth_commands.pop()
    }

    /// `PlayingBuffer -> Idle`, unless background code already moved on.
    ///
    /// Only called from the completion interrupt, which background code on
    /// the same core cannot preempt between the load and the store.
    pub(crate) fn finish_raw(&self) {
        if self.shared.state.load() == PlaybackState::PlayingBuffer {
            self.shared.state.store(PlaybackState::Idle);
            debug!("raw buffer finished");
        }
    }
}
