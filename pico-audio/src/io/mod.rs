//! I2S output driver and the lock-free hand-offs it consumes.
//!
//! ## Components
//!
//! | Item | Context | Description |
//! |------|---------|-------------|
//! | [`AudioOutputI2S`] | DMA interrupt | Double-buffered mono I2S output |
//! | [`spsc`] | both | Lock-free single-producer single-consumer ring buffer |
//! | [`mailbox`] | both | Latest-wins single-value hand-off |
//!
//! ## DMA buffer layout
//!
//! Two [`SampleBlock`](crate::block::SampleBlock)s of
//! [`BLOCK_SAMPLES`](crate::constants::BLOCK_SAMPLES) `i16` each. The DMA
//! channel reads one while the completion handler fills the other; each
//! completion swaps them and re-arms a one-shot transfer.

pub mod mailbox;
pub mod spsc;
pub mod output_i2s;

pub use output_i2s::AudioOutputI2S;
