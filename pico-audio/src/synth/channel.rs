//! One synthesizer voice: phase-accumulator oscillators plus an ADSR
//! envelope, evaluated one sample at a time.

use super::{ChannelAction, Waveforms};

/// Full-scale envelope level (24-bit).
const ADSR_FULL: i32 = 0x00ff_ffff;

/// Envelope state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdsrPhase {
    /// Ramping up to full scale.
    Attack,
    /// Ramping down to the sustain level.
    Decay,
    /// Holding at the sustain level until released.
    Sustain,
    /// Ramping down to silence.
    Release,
    /// No output.
    Off,
}

/// A synthesizer channel.
///
/// Parameters mirror [`ChannelAction`]; defaults are 660 Hz, full volume,
/// 2 ms attack, 6 ms decay, full sustain, 1 ms release, 50 % pulse width and
/// no waveform.
#[derive(Debug, Clone)]
pub struct AudioChannel {
    pub(super) waveforms: Waveforms,
    frequency: u16,
    pub(super) volume: u16,
    attack_ms: u16,
    decay_ms: u16,
    sustain: u16,
    release_ms: u16,
    pulse_width: u16,

    /// Phase accumulator (wraps at 32 bits = one cycle).
    phase_accumulator: u32,
    /// Phase increment per sample: `frequency / sample_rate * 2^32`.
    phase_increment: u32,
    /// Held noise value, refreshed once per cycle.
    noise: i16,

    adsr_phase: AdsrPhase,
    /// Envelope level, `0..=ADSR_FULL`.
    adsr: i32,
    adsr_step: i32,
    adsr_frame: u32,
    adsr_end_frame: u32,

    sample_rate: u32,
}

impl AudioChannel {
    /// No waveform selected, default envelope, tuned to 660 Hz.
    pub fn new(sample_rate: u32) -> Self {
        let mut channel = AudioChannel {
            waveforms: Waveforms::NONE,
            frequency: 0,
            volume: 0xffff,
            attack_ms: 2,
            decay_ms: 6,
            sustain: 0xffff,
            release_ms: 1,
            pulse_width: 0x7fff,
            phase_accumulator: 0,
            phase_increment: 0,
            noise: 0,
            adsr_phase: AdsrPhase::Off,
            adsr: 0,
            adsr_step: 0,
            adsr_frame: 0,
            adsr_end_frame: 0,
            sample_rate,
        };
        channel.set_frequency(660);
        channel
    }

    /// Retune the phase accumulator to `hz`.
    pub fn set_frequency(&mut self, hz: u16) {
        self.frequency = hz;
        self.phase_increment = ((hz as u64) << 32).checked_div(self.sample_rate as u64).unwrap_or(0) as u32;
    }

    pub fn frequency(&self) -> u16 {
        self.frequency
    }

    pub fn adsr_phase(&self) -> AdsrPhase {
        self.adsr_phase
    }

    /// Envelope level as a 16-bit value.
    pub fn envelope(&self) -> u16 {
        (self.adsr >> 8) as u16
    }

    /// Whether this channel currently contributes to the mix.
    pub fn is_audible(&self) -> bool {
        self.adsr_phase != AdsrPhase::Off && !self.waveforms.is_empty() && self.volume != 0
    }

    /// Apply one queued parameter change or envelope trigger.
    pub fn apply(&mut self, action: ChannelAction) {
        match action {
            ChannelAction::Waveforms(w) => self.waveforms = w,
            ChannelAction::Frequency(hz) => self.set_frequency(hz),
            ChannelAction::Volume(v) => self.volume = v,
            ChannelAction::PulseWidth(p) => self.pulse_width = p,
            ChannelAction::AttackMs(ms) => self.attack_ms = ms,
            ChannelAction::DecayMs(ms) => self.decay_ms = ms,
            ChannelAction::Sustain(s) => self.sustain = s,
            ChannelAction::ReleaseMs(ms) => self.release_ms = ms,
            ChannelAction::TriggerAttack => self.trigger_attack(),
            ChannelAction::TriggerRelease => self.trigger_release(),
            ChannelAction::Off => self.off(),
            ChannelAction::Restore => *self = AudioChannel::new(self.sample_rate),
            ChannelAction::Tone { frequency, volume } => {
                self.set_frequency(frequency);
                self.volume = volume;
                self.waveforms = Waveforms::SINE;
                self.trigger_attack();
            }
        }
    }

    fn ms_to_frames(&self, ms: u16) -> u32 {
        ((ms as u64 * self.sample_rate as u64) / 1000) as u32
    }

    /// Enter `phase`, ramping linearly to `target` over `ms` milliseconds.
    fn ramp_to(&mut self, phase: AdsrPhase, target: i32, ms: u16) {
        self.adsr_phase = phase;
        self.adsr_frame = 0;
        self.adsr_end_frame = self.ms_to_frames(ms);
        if self.adsr_end_frame == 0 {
            self.adsr = target;
            self.adsr_step = 0;
        } else {
            self.adsr_step = (target - self.adsr) / self.adsr_end_frame as i32;
        }
    }

    /// Ramp up to full level over the attack time.
    pub fn trigger_attack(&mut self) {
        self.ramp_to(AdsrPhase::Attack, ADSR_FULL, self.attack_ms);
    }

    pub fn trigger_decay(&mut self) {
        self.ramp_to(AdsrPhase::Decay, (self.sustain as i32) << 8, self.decay_ms);
    }

    pub fn trigger_sustain(&mut self) {
        self.adsr_phase = AdsrPhase::Sustain;
        self.adsr = (self.sustain as i32) << 8;
        self.adsr_frame = 0;
        self.adsr_end_frame = 0;
        self.adsr_step = 0;
    }

    /// Ramp down to silence over the release time.
    pub fn trigger_release(&mut self) {
        self.ramp_to(AdsrPhase::Release, 0, self.release_ms);
    }

    /// Cut the envelope to zero.
    pub fn off(&mut self) {
        self.adsr_phase = AdsrPhase::Off;
        self.adsr = 0;
        self.adsr_frame = 0;
        self.adsr_end_frame = 0;
        self.adsr_step = 0;
    }

    /// Advance the envelope by one sample, moving to the next phase when the
    /// current ramp has run its course.
    fn step_envelope(&mut self) {
        if self.adsr_phase != AdsrPhase::Sustain && self.adsr_frame >= self.adsr_end_frame {
            match self.adsr_phase {
                AdsrPhase::Attack => {
                    self.adsr = ADSR_FULL;
                    self.trigger_decay();
                }
                AdsrPhase::Decay => self.trigger_sustain(),
                AdsrPhase::Release => self.off(),
                AdsrPhase::Sustain | AdsrPhase::Off => {}
            }
        }
        self.adsr = (self.adsr + self.adsr_step).clamp(0, ADSR_FULL);
        self.adsr_frame = self.adsr_frame.saturating_add(1);
    }

    /// Produce the next sample, or `None` when the channel is silent.
    ///
    /// `sine` is a 256-entry full-scale sine table and `random` supplies a
    /// fresh noise value whenever the oscillator completes a cycle.
    pub fn next_sample(&mut self, sine: &[i16; 256], random: impl FnOnce() -> i16) -> Option<i32> {
        let (phase, wrapped) = self.phase_accumulator.overflowing_add(self.phase_increment);
        self.phase_accumulator = phase;

        if self.adsr_phase == AdsrPhase::Off {
            return None;
        }
        self.step_envelope();

        if wrapped {
            self.noise = random();
        }

        if self.waveforms.is_empty() {
            return None;
        }

        // 16-bit phase, 0..=0xffff over one cycle
        let offset = (phase >> 16) as i32;
        let mut sum = 0i32;
        let mut count = 0i32;

        if self.waveforms.contains(Waveforms::NOISE) {
            sum += self.noise as i32;
            count += 1;
        }
        if self.waveforms.contains(Waveforms::SAW) {
            sum += offset - 0x7fff;
            count += 1;
        }
        if self.waveforms.contains(Waveforms::TRIANGLE) {
            sum += if offset < 0x7fff {
                offset * 2 - 0x7fff
            } else {
                0x7fff - (offset - 0x7fff) * 2
            };
            count += 1;
        }
        if self.waveforms.contains(Waveforms::SQUARE) {
            sum += if offset < self.pulse_width as i32 { 0x7fff } else { -0x7fff };
            count += 1;
        }
        if self.waveforms.contains(Waveforms::SINE) {
            sum += sine[(phase >> 24) as usize] as i32;
            count += 1;
        }

        let mut sample = sum / count.max(1);
        sample = ((sample as i64 * (self.adsr >> 8) as i64) >> 16) as i32;
        sample = ((sample as i64 * self.volume as i64) >> 16) as i32;
        Some(sample)
    }
}
