//! Hardware contract for the PIO block and the DMA controller.
//!
//! The engine never touches registers itself. A board support crate
//! implements [`PioBlock`] and [`DmaController`] on top of its PAC/HAL; the
//! methods map one-to-one onto the RP2040 SDK primitives noted on each item.
//!
//! ## Data path
//!
//! ```text
//! DoubleBuffer (SRAM)          DMA channel (16-bit, DREQ paced)       PIO SM
//! ┌──────────────────┐       ┌──────────────────────────────┐      ┌─────────┐
//! │ block[in_flight] ├──────►│ read++  ──►  write TXF[sm]    ├─────►│ audio_  │──► DATA
//! └──────────────────┘       └──────────────┬───────────────┘      │ i2s     │──► BCLK
//!                                           │ completion IRQ       └─────────┘──► LRCLK
//!                                           ▼
//!                              AudioOutputI2S::on_dma_complete
//! ```
//!
//! A 16-bit write to the 32-bit TX FIFO is replicated into both halfwords by
//! the bus fabric, so each mono sample is emitted on both I2S channels.

mod program;

#[cfg(test)]
pub(crate) mod fake;

pub use program::{ClockDivider, PioProgram, AUDIO_I2S_PROGRAM};

use crate::constants::DEFAULT_SYSTEM_CLOCK_HZ;
use crate::error::Error;

/// A DMA channel number (0..=11 on the RP2040).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaChannelId(pub u8);

/// A PIO state machine number within its block (0..=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StateMachineId(pub u8);

/// Instruction-memory offset a program was loaded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProgramOffset(pub u8);

/// GPIO pins driven by the I2S state machine.
///
/// BCLK and LRCLK are the program's side-set pins, so LRCLK must be the pin
/// directly after BCLK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2sPins {
    pub data: u8,
    pub bclk: u8,
    pub lrclk: u8,
}

impl I2sPins {
    /// LRCLK must directly follow BCLK for the side-set pair.
    pub fn validate(&self) -> Result<(), Error> {
        if self.bclk.checked_add(1) == Some(self.lrclk) {
            Ok(())
        } else {
            Err(Error::InvalidPins {
                bclk: self.bclk,
                lrclk: self.lrclk,
            })
        }
    }

    /// GPIO bit mask covering all three pins. Pins above 31 are ignored.
    pub fn mask(&self) -> u32 {
        [self.data, self.bclk, self.lrclk]
            .iter()
            .fold(0, |mask, &pin| mask | 1u32.checked_shl(pin as u32).unwrap_or(0))
    }
}

impl Default for I2sPins {
    fn default() -> Self {
        I2sPins {
            data: 9,
            bclk: 10,
            lrclk: 11,
        }
    }
}

/// Runtime configuration for the output engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2sConfig {
    pub pins: I2sPins,
    pub state_machine: StateMachineId,
    /// `clk_sys` frequency used to derive the PIO clock divider.
    pub system_clock_hz: u32,
}

impl Default for I2sConfig {
    fn default() -> Self {
        I2sConfig {
            pins: I2sPins::default(),
            state_machine: StateMachineId(0),
            system_clock_hz: DEFAULT_SYSTEM_CLOCK_HZ,
        }
    }
}

/// One PIO block (`pio0` or `pio1`).
pub trait PioBlock {
    /// `pio_sm_claim`. Returns `false` if the state machine is already taken.
    fn claim_state_machine(&mut self, sm: StateMachineId) -> bool;

    /// `pio_sm_unclaim`.
    fn unclaim_state_machine(&mut self, sm: StateMachineId);

    /// `pio_add_program`. Returns `None` when instruction memory is full.
    fn add_program(&mut self, program: &PioProgram) -> Option<ProgramOffset>;

    /// `pio_remove_program`.
    fn remove_program(&mut self, program: &PioProgram, offset: ProgramOffset);

    /// Configure `sm` to run the I2S program: pin directions, side-set,
    /// 32-bit autopull, joined TX FIFO, clock divider, and jump to the entry
    /// point. Leaves the state machine disabled.
    fn init_i2s(
        &mut self,
        sm: StateMachineId,
        offset: ProgramOffset,
        pins: &I2sPins,
        divider: ClockDivider,
    );

    /// `pio_sm_set_enabled`.
    fn set_enabled(&mut self, sm: StateMachineId, enabled: bool);

    /// `pio_sm_set_pins_with_mask(.., 0, mask)`: drive the given pins low.
    fn set_pins_low(&mut self, sm: StateMachineId, mask: u32);

    /// Bus address of the state machine's TX FIFO.
    fn tx_fifo_address(&self, sm: StateMachineId) -> u32;

    /// DREQ number pacing writes to the TX FIFO.
    fn tx_dreq(&self, sm: StateMachineId) -> u8;
}

/// The DMA controller and its shared completion interrupt (`DMA_IRQ_0`).
pub trait DmaController {
    /// `dma_claim_unused_channel(false)`.
    fn claim_unused_channel(&mut self) -> Option<DmaChannelId>;

    /// `dma_channel_unclaim`.
    fn unclaim_channel(&mut self, channel: DmaChannelId);

    /// 16-bit transfers, incrementing read address, fixed write address,
    /// paced by `dreq`. Does not start the channel.
    fn configure_for_peripheral(&mut self, channel: DmaChannelId, write_address: u32, dreq: u8);

    /// `dma_channel_transfer_from_buffer_now`.
    ///
    /// # Safety
    ///
    /// `source` must stay valid and unmodified for `count` samples until the
    /// transfer completes or is aborted.
    unsafe fn start_transfer(&mut self, channel: DmaChannelId, source: *const i16, count: u32);

    /// Request an abort (`dma_hw->abort`). The channel may still be busy on
    /// return.
    fn abort(&mut self, channel: DmaChannelId);

    /// `CTRL_TRIG.BUSY`.
    fn is_busy(&self, channel: DmaChannelId) -> bool;

    /// Whether the channel's bit is set in `INTE0`.
    fn irq_enabled(&self, channel: DmaChannelId) -> bool;

    /// Set or clear the channel's bit in `INTE0`.
    fn set_irq_enabled(&mut self, channel: DmaChannelId, enabled: bool);

    /// Whether the channel's bit is set in `INTS0`.
    fn irq_pending(&self, channel: DmaChannelId) -> bool;

    /// Write-one-to-clear the channel's bit in `INTS0`.
    fn acknowledge_irq(&mut self, channel: DmaChannelId);

    /// `irq_add_shared_handler` + `irq_set_enabled(DMA_IRQ_0, true)`.
    ///
    /// The board crate's handler must call
    /// [`AudioOutputI2S::on_dma_complete`](crate::io::AudioOutputI2S::on_dma_complete).
    fn register_completion_handler(&mut self);

    /// `irq_remove_handler`.
    fn unregister_completion_handler(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pins_are_valid() {
        assert_eq!(I2sPins::default().validate(), Ok(()));
    }

    #[test]
    fn lrclk_must_follow_bclk() {
        let pins = I2sPins {
            data: 9,
            bclk: 10,
            lrclk: 12,
        };
        assert_eq!(
            pins.validate(),
            Err(Error::InvalidPins { bclk: 10, lrclk: 12 })
        );

        let wrapped = I2sPins {
            data: 0,
            bclk: 255,
            lrclk: 0,
        };
        assert!(wrapped.validate().is_err());
    }

    #[test]
    fn pin_mask_covers_all_three() {
        assert_eq!(I2sPins::default().mask(), (1 << 9) | (1 << 10) | (1 << 11));
    }
}
