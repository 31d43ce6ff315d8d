use crate::constants::{BLOCK_COUNT, BLOCK_SAMPLES};

/// One block of signed 16-bit samples, 4-byte aligned for DMA.
#[derive(Clone, Copy)]
#[repr(C, align(4))]
pub struct SampleBlock {
    pub samples: [i16; BLOCK_SAMPLES],
}

impl SampleBlock {
    /// A block of silence.
    pub const fn zeroed() -> Self {
        SampleBlock {
            samples: [0i16; BLOCK_SAMPLES],
        }
    }

    /// Whether every sample is zero.
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0)
    }
}

/// Which side currently owns a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockOwner {
    /// Being read by the DMA engine. Software must not write it.
    Hardware,
    /// Being written by the completion handler. Hardware must not read it.
    Software,
}

/// Two sample blocks with strictly alternating ownership.
///
/// Ownership is derived from a single index, so exactly one block is
/// hardware-owned and exactly one is software-owned at every instant.
///
/// The store must live in `'static` memory: the DMA engine keeps reading the
/// in-flight block after the call that armed it returns.
///
/// ```ignore
/// static mut AUDIO_BLOCKS: DoubleBuffer = DoubleBuffer::new();
/// ```
pub struct DoubleBuffer {
    blocks: [SampleBlock; BLOCK_COUNT],
    /// Index of the hardware-owned block.
    in_flight: usize,
}

impl DoubleBuffer {
    /// Two silent blocks, block 0 in flight.
    pub const fn new() -> Self {
        DoubleBuffer {
            blocks: [SampleBlock::zeroed(); BLOCK_COUNT],
            in_flight: 0,
        }
    }

    /// Silence both blocks and hand block 0 back to the hardware side.
    pub fn reset(&mut self) {
        for block in self.blocks.iter_mut() {
            *block = SampleBlock::zeroed();
        }
        self.in_flight = 0;
    }

    /// Flip ownership: the in-flight block becomes fillable and vice versa.
    pub fn swap(&mut self) {
        self.in_flight ^= 1;
    }

    /// Index of the hardware-owned block.
    pub fn in_flight_index(&self) -> usize {
        self.in_flight
    }

    /// Index of the software-owned block.
    pub fn fillable_index(&self) -> usize {
        self.in_flight ^ 1
    }

    /// The block the DMA engine is (or is about to be) reading.
    pub fn in_flight(&self) -> &SampleBlock {
        &self.blocks[self.in_flight]
    }

    /// The block software may write.
    pub fn fillable_mut(&mut self) -> &mut SampleBlock {
        &mut self.blocks[self.in_flight ^ 1]
    }

    /// Read access to either block, for instrumentation.
    pub fn block(&self, index: usize) -> &SampleBlock {
        &self.blocks[index]
    }

    /// Current owner of each block, indexed by block number.
    pub fn owners(&self) -> [BlockOwner; BLOCK_COUNT] {
        core::array::from_fn(|i| {
            if i == self.in_flight {
                BlockOwner::Hardware
            } else {
                BlockOwner::Software
            }
        })
    }
}

impl Default for DoubleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(owners: &[BlockOwner], owner: BlockOwner) -> usize {
        owners.iter().filter(|&&o| o == owner).count()
    }

    #[test]
    fn new_is_silent_with_block_zero_in_flight() {
        let buf = DoubleBuffer::new();
        assert_eq!(buf.in_flight_index(), 0);
        assert_eq!(buf.fillable_index(), 1);
        assert!(buf.block(0).is_silent());
        assert!(buf.block(1).is_silent());
    }

    #[test]
    fn ownership_is_always_one_each() {
        let mut buf = DoubleBuffer::new();
        for _ in 0..5 {
            let owners = buf.owners();
            assert_eq!(count(&owners, BlockOwner::Hardware), 1);
            assert_eq!(count(&owners, BlockOwner::Software), 1);
            buf.swap();
        }
    }

    #[test]
    fn swap_alternates() {
        let mut buf = DoubleBuffer::new();
        buf.swap();
        assert_eq!(buf.in_flight_index(), 1);
        assert_eq!(buf.owners(), [BlockOwner::Software, BlockOwner::Hardware]);
        buf.swap();
        assert_eq!(buf.in_flight_index(), 0);
        assert_eq!(buf.owners(), [BlockOwner::Hardware, BlockOwner::Software]);
    }

    #[test]
    fn fillable_writes_do_not_touch_in_flight() {
        let mut buf = DoubleBuffer::new();
        buf.fillable_mut().samples.fill(1234);
        assert!(buf.in_flight().is_silent());
        assert_eq!(buf.block(1).samples, [1234; BLOCK_SAMPLES]);

        buf.swap();
        assert_eq!(buf.in_flight().samples, [1234; BLOCK_SAMPLES]);
    }

    #[test]
    fn reset_silences_and_rewinds() {
        let mut buf = DoubleBuffer::new();
        buf.fillable_mut().samples.fill(-7);
        buf.swap();
        buf.reset();
        assert_eq!(buf.in_flight_index(), 0);
        assert!(buf.block(0).is_silent());
        assert!(buf.block(1).is_silent());
    }
}
