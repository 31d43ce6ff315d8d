//! Sample block storage shared with the DMA engine.
//!
//! The DMA engine reads one block while the completion handler fills the
//! other; see [`DoubleBuffer`].

mod double_buffer;

pub use double_buffer::{BlockOwner, DoubleBuffer, SampleBlock};
