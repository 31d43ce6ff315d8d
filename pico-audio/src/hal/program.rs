use crate::constants::SAMPLE_RATE_HZ;

/// An assembled PIO program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PioProgram {
    pub instructions: &'static [u16],
    /// Fixed load address, or `None` for relocatable.
    pub origin: Option<u8>,
    pub wrap_target: u8,
    pub wrap: u8,
    /// Offset (relative to load address) the state machine starts at.
    pub entry_point: u8,
    /// Number of side-set bits (BCLK, LRCLK).
    pub side_set_bits: u8,
}

/// I2S transmitter: 16 bits per channel, MSB first, BCLK and LRCLK on
/// side-set.
///
/// ```text
/// .program audio_i2s
/// .side_set 2                     ; LRCLK, BCLK
/// bitloop1:
///     out pins, 1       side 0b10
///     jmp x-- bitloop1  side 0b11
///     out pins, 1       side 0b00
///     set x, 14         side 0b01
/// bitloop0:
///     out pins, 1       side 0b00
///     jmp x-- bitloop0  side 0b01
///     out pins, 1       side 0b10
/// public entry_point:
///     set x, 14         side 0b11
/// ```
///
/// Two PIO cycles per bit, 32 bits per frame: the state machine clock must
/// run at `64 * SAMPLE_RATE_HZ`.
pub const AUDIO_I2S_PROGRAM: PioProgram = PioProgram {
    instructions: &[
        0x7001, // out pins, 1          side 2
        0x1840, // jmp x--, 0           side 3
        0x6001, // out pins, 1          side 0
        0xe82e, // set x, 14            side 1
        0x6001, // out pins, 1          side 0
        0x0844, // jmp x--, 4           side 1
        0x7001, // out pins, 1          side 2
        0xf82e, // set x, 14            side 3
    ],
    origin: None,
    wrap_target: 0,
    wrap: 7,
    entry_point: 7,
    side_set_bits: 2,
};

/// PIO clock divider in 16.8 fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockDivider {
    pub integer: u16,
    pub fraction: u8,
}

impl ClockDivider {
    /// Divider that clocks the I2S program at `sample_rate_hz` frames per
    /// second from a `system_clock_hz` source.
    ///
    /// `system_clock_hz / (64 * sample_rate_hz)` scaled by 256 simplifies to
    /// `system_clock_hz * 4 / sample_rate_hz`.
    pub const fn for_sample_rate(system_clock_hz: u32, sample_rate_hz: u32) -> Self {
        let divider = (system_clock_hz as u64 * 4) / sample_rate_hz as u64;
        let integer = divider >> 8;
        ClockDivider {
            integer: if integer > u16::MAX as u64 {
                u16::MAX
            } else {
                integer as u16
            },
            fraction: (divider & 0xff) as u8,
        }
    }

    /// Divider for the crate's fixed output rate.
    pub const fn for_output(system_clock_hz: u32) -> Self {
        Self::for_sample_rate(system_clock_hz, SAMPLE_RATE_HZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divider_at_125_mhz() {
        // 125 MHz * 4 / 22050 = 22675 = 88 * 256 + 147
        let div = ClockDivider::for_output(125_000_000);
        assert_eq!(div, ClockDivider { integer: 88, fraction: 147 });
    }

    #[test]
    fn divider_reproduces_sample_rate() {
        let sys = 133_000_000u32;
        let div = ClockDivider::for_output(sys);
        let fixed = div.integer as f64 + div.fraction as f64 / 256.0;
        let rate = sys as f64 / fixed / 64.0;
        assert!((rate - SAMPLE_RATE_HZ as f64).abs() < 5.0, "rate={rate}");
    }

    #[test]
    fn program_shape() {
        let p = AUDIO_I2S_PROGRAM;
        assert_eq!(p.instructions.len(), 8);
        assert_eq!(p.wrap as usize, p.instructions.len() - 1);
        assert!((p.entry_point as usize) < p.instructions.len());
    }
}
