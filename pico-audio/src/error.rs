use thiserror::Error;

/// Errors reported by the audio engine and its control handle.
///
/// Every error is raised before any shared or hardware state is changed, with
/// one exception: a failed [`init`](crate::io::AudioOutputI2S::init) releases
/// whatever it had already acquired before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// `play_raw_buffer` was given an empty slice.
    #[error("sample buffer is empty")]
    EmptyBuffer,
    /// Synth channel index is out of range.
    #[error("synth channel {0} does not exist")]
    InvalidChannel(usize),
    /// The LRCLK pin must be the pin directly after BCLK (PIO side-set pair).
    #[error("LRCLK pin {lrclk} does not follow BCLK pin {bclk}")]
    InvalidPins { bclk: u8, lrclk: u8 },
    /// Too many channel commands are waiting for the next completion edge.
    #[error("synth command queue is full")]
    CommandQueueFull,
    /// Every DMA channel is already claimed.
    #[error("no DMA channel available")]
    DmaChannelUnavailable,
    /// The PIO block has no room for the I2S program.
    #[error("no PIO instruction memory available")]
    ProgramSpaceExhausted,
    /// The configured PIO state machine is claimed by someone else.
    #[error("PIO state machine {0} is already claimed")]
    StateMachineUnavailable(u8),
    /// `init` was called on an engine that is already running.
    #[error("audio engine is already initialized")]
    AlreadyInitialized,
    /// The operation needs an initialized engine.
    #[error("audio engine is not initialized")]
    NotInitialized,
}
