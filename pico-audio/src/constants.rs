/// Output sample rate in Hz.
pub const SAMPLE_RATE_HZ: u32 = 22_050;

/// Number of 16-bit samples per block.
///
/// Together with [`SAMPLE_RATE_HZ`] this sets the refill deadline of the
/// completion handler (see [`BLOCK_DURATION_US`]).
pub const BLOCK_SAMPLES: usize = 4;

/// Number of sample blocks in the double buffer.
pub const BLOCK_COUNT: usize = 2;

/// Time the hardware needs to drain one block, in microseconds (rounded down).
///
/// The completion handler must finish refilling within this window.
pub const BLOCK_DURATION_US: u32 = (BLOCK_SAMPLES as u32 * 1_000_000) / SAMPLE_RATE_HZ;

/// Gain applied before the first `set_volume` call (mid-scale).
pub const DEFAULT_GAIN: u8 = 127;

/// Number of synthesizer channels.
pub const CHANNEL_COUNT: usize = 8;

/// Synth channel commands that can wait for the next completion edge.
/// Must be a power of two.
pub const COMMAND_SLOTS: usize = 32;

/// Default system clock of the RP2040 in Hz.
pub const DEFAULT_SYSTEM_CLOCK_HZ: u32 = 125_000_000;
