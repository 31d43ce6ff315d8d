//! Block-level gain arithmetic.

use super::intrinsics::saturate16;

/// Largest gain value; maps to unity.
pub const GAIN_UNITY: i32 = 255;

/// Scale one sample by `gain / 255`, rounding half away from zero.
///
/// The result is saturated to the `i16` range, so gains above unity clip
/// instead of wrapping.
#[inline(always)]
pub fn scale_sample(sample: i16, gain: i32) -> i16 {
    let product = sample as i32 * gain;
    let half = if product < 0 { -(GAIN_UNITY / 2) } else { GAIN_UNITY / 2 };
    saturate16((product + half) / GAIN_UNITY)
}

/// Scale every sample in `samples` by `gain / 255`.
pub fn block_scale(samples: &mut [i16], gain: i32) {
    if gain == GAIN_UNITY {
        return;
    }
    if gain == 0 {
        samples.fill(0);
        return;
    }
    for sample in samples.iter_mut() {
        *sample = scale_sample(*sample, gain);
    }
}
