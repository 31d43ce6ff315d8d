//! # pico-audio
//!
//! A `no_std`, zero-allocation real-time audio output engine for the
//! RP2040 (dual Cortex-M0+). A PIO state machine generates the I2S bit clock,
//! word clock and data line; a DMA channel feeds it from a two-block double
//! buffer that the DMA completion interrupt keeps refilled.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Memory | [`block`] | `'static` double buffer with strict ownership alternation |
//! | Hardware | [`hal`] | `PioBlock` / `DmaController` traits, I2S PIO program, clock divider |
//! | Control | [`playback`] | Playback state machine and the background `AudioPlayer` handle |
//! | Engine | [`io`] | `AudioOutputI2S` completion handler and lifecycle |
//! | Lifecycle | [`lifecycle`] | Claim guard and `dma_safe_abort` |
//! | DSP | [`volume`] / [`dsp`] | Output gain stage and saturating arithmetic |
//! | Synthesis | [`synth`] | `SynthEngine` contract and the built-in 8-channel synth |
//!
//! ## Quick start
//!
//! ```ignore
//! use pico_audio::prelude::*;
//!
//! static AUDIO: AudioShared = AudioShared::new();
//! static mut BLOCKS: DoubleBuffer = DoubleBuffer::new();
//! static CHIME: [i16; 2205] = /* ... */;
//!
//! let (player, link) = AUDIO.split().unwrap();
//! let blocks = unsafe { &mut *core::ptr::addr_of_mut!(BLOCKS) };
//! let mut output = AudioOutputI2S::new(link, blocks, pio0, dma, Synth::new(), I2sConfig::default());
//! output.init()?;
//!
//! // DMA_IRQ_0 handler:
//! output.on_dma_complete();
//!
//! // Background:
//! player.set_volume(0.5);
//! player.play_raw_buffer(&CHIME)?;
//! player.channel(0)?.play_tone(440, 0.8)?;
//! player.play_synth();
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `synth` | yes | Built-in [`synth::Synth`] (pulls in `libm`) |
//! | `defmt` | no | `defmt` logging and `defmt::Format` on public types |
//!
//! ## Audio parameters
//!
//! - **Sample rate:** 22 050 Hz ([`constants::SAMPLE_RATE_HZ`])
//! - **Block size:** 4 samples ([`constants::BLOCK_SAMPLES`])
//! - **Refill deadline:** [`constants::BLOCK_DURATION_US`]
//! - **Sample format:** `i16` mono, replicated onto both I2S channels

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod constants;
pub mod error;
pub mod block;
pub mod dsp;
pub mod volume;
pub mod hal;
pub mod synth;
pub mod playback;
pub mod source;
pub mod lifecycle;
pub mod io;

pub use error::Error;

/// Commonly used items.
pub mod prelude {
    pub use crate::block::DoubleBuffer;
    pub use crate::error::Error;
    pub use crate::hal::{DmaController, I2sConfig, I2sPins, PioBlock, StateMachineId};
    pub use crate::io::AudioOutputI2S;
    pub use crate::lifecycle::dma_safe_abort;
    pub use crate::playback::{AudioPlayer, AudioShared, ChannelControl, PlaybackState};
    #[cfg(feature = "synth")]
    pub use crate::synth::Synth;
    pub use crate::synth::{SynthEngine, Waveforms};
    pub use crate::volume::Gain;
}
