//! Eight-channel mixing synthesizer.

use core::f32::consts::PI;

use super::channel::AudioChannel;
use super::{ChannelCommand, SynthEngine};
use crate::block::SampleBlock;
use crate::constants::{CHANNEL_COUNT, SAMPLE_RATE_HZ};
use crate::dsp::intrinsics::clamp_symmetric16;

const SINE_TABLE_LEN: usize = 256;

/// The built-in [`SynthEngine`]: [`CHANNEL_COUNT`] channels summed, scaled by
/// a master volume and clamped to `±0x7fff`.
///
/// # Example
/// ```ignore
/// let synth = Synth::new();
/// let mut audio = AudioOutputI2S::new(link, buffers, pio, dma, synth, I2sConfig::default());
/// player.channel(0)?.play_tone(440, 0.5)?;
/// player.play_synth();
/// ```
pub struct Synth {
    channels: [AudioChannel; CHANNEL_COUNT],
    sine: [i16; SINE_TABLE_LEN],
    /// Master volume, `0xffff` = full scale.
    master_volume: u16,
    /// xorshift32 state for the noise waveform. Never zero.
    rng: u32,
}

impl Synth {
    /// Eight default channels at [`SAMPLE_RATE_HZ`], full master volume.
    pub fn new() -> Self {
        let mut sine = [0i16; SINE_TABLE_LEN];
        for (i, entry) in sine.iter_mut().enumerate() {
            let angle = 2.0 * PI * i as f32 / SINE_TABLE_LEN as f32;
            *entry = (libm::sinf(angle) * 32767.0) as i16;
        }

        Synth {
            channels: core::array::from_fn(|_| AudioChannel::new(SAMPLE_RATE_HZ)),
            sine,
            master_volume: 0xffff,
            rng: 0x1234_5678,
        }
    }

    /// Read-only view of channel `index`.
    pub fn channel(&self, index: usize) -> Option<&AudioChannel> {
        self.channels.get(index)
    }

    /// Scale applied to the mixed output, `0xffff` is unity.
    pub fn set_master_volume(&mut self, volume: u16) {
        self.master_volume = volume;
    }

    /// Whether any channel is currently producing sound.
    pub fn is_audio_playing(&self) -> bool {
        self.master_volume != 0 && self.channels.iter().any(AudioChannel::is_audible)
    }

    fn next_sample(&mut self) -> i16 {
        let sine = &self.sine;
        let rng = &mut self.rng;
        let mut sum = 0i32;
        for channel in self.channels.iter_mut() {
            if let Some(s) = channel.next_sample(sine, || xorshift(rng)) {
                sum += s;
            }
        }
        let scaled = (sum as i64 * self.master_volume as i64) >> 16;
        clamp_symmetric16(scaled.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }
}

impl Default for Synth {
    fn default() -> Self {
        Self::new()
    }
}

fn xorshift(state: &mut u32) -> i16 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    (x >> 16) as i16
}

impl SynthEngine for Synth {
    fn apply(&mut self, command: ChannelCommand) {
        match self.channels.get_mut(command.channel as usize) {
            Some(channel) => channel.apply(command.action),
            None => warn!("dropping command for channel {}", command.channel),
        }
    }

    fn render(&mut self, block: &mut SampleBlock) {
        for sample in block.samples.iter_mut() {
            *sample = self.next_sample();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{AdsrPhase, ChannelAction, Waveforms};

    fn command(channel: u8, action: ChannelAction) -> ChannelCommand {
        ChannelCommand { channel, action }
    }

    fn render_blocks(synth: &mut Synth, blocks: usize) -> std::vec::Vec<i16> {
        let mut out = std::vec::Vec::new();
        let mut block = SampleBlock::zeroed();
        for _ in 0..blocks {
            synth.render(&mut block);
            out.extend_from_slice(&block.samples);
        }
        out
    }

    #[test]
    fn sine_table_shape() {
        let synth = Synth::new();
        assert_eq!(synth.sine[0], 0);
        assert!(synth.sine[64] >= 32766);
        assert!(synth.sine[192] <= -32766);
    }

    #[test]
    fn idle_synth_renders_silence() {
        let mut synth = Synth::new();
        assert!(!synth.is_audio_playing());
        assert!(render_blocks(&mut synth, 8).iter().all(|&s| s == 0));
    }

    #[test]
    fn tone_produces_sound_then_releases() {
        let mut synth = Synth::new();
        synth.apply(command(
            2,
            ChannelAction::Tone {
                frequency: 440,
                volume: 0xffff,
            },
        ));
        assert!(synth.is_audio_playing());

        let out = render_blocks(&mut synth, 100);
        assert!(out.iter().any(|&s| s.unsigned_abs() > 1000));

        synth.apply(command(2, ChannelAction::TriggerRelease));
        render_blocks(&mut synth, 20);
        assert_eq!(synth.channel(2).map(|c| c.adsr_phase()), Some(AdsrPhase::Off));
        assert!(!synth.is_audio_playing());
    }

    #[test]
    fn output_is_clamped_symmetrically() {
        let mut synth = Synth::new();
        for ch in 0..CHANNEL_COUNT as u8 {
            synth.apply(command(ch, ChannelAction::Waveforms(Waveforms::SQUARE)));
            synth.apply(command(ch, ChannelAction::PulseWidth(0xffff)));
            synth.apply(command(ch, ChannelAction::AttackMs(0)));
            synth.apply(command(ch, ChannelAction::DecayMs(0)));
            synth.apply(command(ch, ChannelAction::TriggerAttack));
        }
        let out = render_blocks(&mut synth, 10);
        assert!(out.iter().all(|&s| (-0x7fff..=0x7fff).contains(&s)));
        assert!(out.iter().skip(4).any(|&s| s == 0x7fff));
    }

    #[test]
    fn master_volume_zero_silences() {
        let mut synth = Synth::new();
        synth.apply(command(
            0,
            ChannelAction::Tone {
                frequency: 440,
                volume: 0xffff,
            },
        ));
        synth.set_master_volume(0);
        assert!(!synth.is_audio_playing());
        assert!(render_blocks(&mut synth, 20).iter().all(|&s| s == 0));
    }

    #[test]
    fn out_of_range_command_is_ignored() {
        let mut synth = Synth::new();
        synth.apply(command(CHANNEL_COUNT as u8, ChannelAction::TriggerAttack));
        assert!(!synth.is_audio_playing());
    }

    #[test]
    fn noise_generator_never_sticks_at_zero() {
        let mut state = 1u32;
        for _ in 0..1000 {
            xorshift(&mut state);
            assert_ne!(state, 0);
        }
    }
}
