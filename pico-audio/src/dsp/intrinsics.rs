//! Saturation primitives with a DSP-instruction fast path.
//!
//! The RP2040 (Cortex-M0+) has no DSP extension and always takes the portable
//! branch. Cortex-M33 parts such as the RP2350 compile to a single `SSAT`.

/// Saturate an `i32` to `i16` range (`-32768..=32767`).
#[inline(always)]
pub fn saturate16(val: i32) -> i16 {
    #[cfg(all(target_arch = "arm", target_feature = "dsp"))]
    {
        let out: i32;
        unsafe {
            core::arch::asm!(
                "ssat {out}, #16, {val}",
                out = out(reg) out,
                val = in(reg) val,
            );
        }
        out as i16
    }
    #[cfg(not(all(target_arch = "arm", target_feature = "dsp")))]
    {
        val.clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }
}

/// Clamp to the symmetric range `-0x7fff..=0x7fff` used by the synth mixer.
#[inline(always)]
pub fn clamp_symmetric16(val: i32) -> i16 {
    val.clamp(-0x7fff, 0x7fff) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturate16_passes_in_range() {
        assert_eq!(saturate16(0), 0);
        assert_eq!(saturate16(32767), 32767);
        assert_eq!(saturate16(-32768), -32768);
        assert_eq!(saturate16(-1234), -1234);
    }

    #[test]
    fn saturate16_clips_out_of_range() {
        assert_eq!(saturate16(32768), 32767);
        assert_eq!(saturate16(-32769), -32768);
        assert_eq!(saturate16(100_000), 32767);
        assert_eq!(saturate16(-100_000), -32768);
    }

    #[test]
    fn clamp_symmetric16_never_reaches_min() {
        assert_eq!(clamp_symmetric16(-40_000), -0x7fff);
        assert_eq!(clamp_symmetric16(40_000), 0x7fff);
        assert_eq!(clamp_symmetric16(5), 5);
    }
}
