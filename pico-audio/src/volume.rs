//! Volume stage: a linear `0..=255` gain applied to every outgoing sample.
//!
//! Background code stores the gain as a single byte; the completion handler
//! loads it once per refill. Neither side can observe a torn value.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::constants::DEFAULT_GAIN;
use crate::dsp::helpers::block_scale;

/// Linear output gain. 0 = silent, 255 = unity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gain(pub u8);

impl Gain {
    pub const SILENT: Gain = Gain(0);
    pub const UNITY: Gain = Gain(u8::MAX);

    /// Map a normalized volume to a gain.
    ///
    /// Out-of-range input is clamped to `[0.0, 1.0]`; NaN maps to silence.
    pub fn from_normalized(value: f32) -> Self {
        let clamped = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        };
        // Round rather than truncate so `to_normalized` round-trips exactly.
        Gain((clamped * 255.0 + 0.5) as u8)
    }

    /// The gain as a normalized volume in `[0.0, 1.0]`.
    pub fn to_normalized(self) -> f32 {
        self.0 as f32 / 255.0
    }

    /// Scale a block of samples in place.
    pub fn apply(self, samples: &mut [i16]) {
        block_scale(samples, self.0 as i32);
    }
}

impl Default for Gain {
    fn default() -> Self {
        Gain(DEFAULT_GAIN)
    }
}

/// A [`Gain`] shared between background code and the completion handler.
pub struct AtomicGain(AtomicU8);

impl AtomicGain {
    /// Start at `gain`. Usable in `static` initializers.
    pub const fn new(gain: Gain) -> Self {
        AtomicGain(AtomicU8::new(gain.0))
    }

    /// The gain the next refill will apply.
    pub fn load(&self) -> Gain {
        Gain(self.0.load(Ordering::Relaxed))
    }

    /// Replace the gain; the next refill picks it up.
    pub fn store(&self, gain: Gain) {
        self.0.store(gain.0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Half a gain step, plus float slack.
    const QUANTUM: f32 = 1.0 / 510.0 + 1e-6;

    #[test]
    fn default_is_mid_scale() {
        assert_eq!(Gain::default(), Gain(127));
    }

    #[test]
    fn normalized_round_trip_within_quantization() {
        for i in 0..=100 {
            let v = i as f32 / 100.0;
            let back = Gain::from_normalized(v).to_normalized();
            assert!((back - v).abs() <= QUANTUM, "v={v} back={back}");
        }
    }

    #[test]
    fn exact_gain_values_round_trip() {
        for g in 0..=255u8 {
            assert_eq!(Gain::from_normalized(Gain(g).to_normalized()), Gain(g));
        }
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(Gain::from_normalized(1.5), Gain::UNITY);
        assert_eq!(Gain::from_normalized(-0.25), Gain::SILENT);
        assert_eq!(Gain::from_normalized(f32::INFINITY), Gain::UNITY);
        assert_eq!(Gain::from_normalized(f32::NEG_INFINITY), Gain::SILENT);
        assert_eq!(Gain::from_normalized(f32::NAN), Gain::SILENT);
    }

    #[test]
    fn unity_gain_keeps_full_scale_in_range() {
        let mut block = [32767, -32768, 0, 1];
        Gain::UNITY.apply(&mut block);
        assert_eq!(block, [32767, -32768, 0, 1]);
    }

    #[test]
    fn atomic_gain_load_store() {
        let gain = AtomicGain::new(Gain::default());
        assert_eq!(gain.load(), Gain(127));
        gain.store(Gain(200));
        assert_eq!(gain.load(), Gain(200));
    }
}
