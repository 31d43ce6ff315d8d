//! DMA-driven mono I2S output through one PIO state machine.
//!
//! [`AudioOutputI2S`] owns the PIO block, the DMA controller, the synthesis
//! engine and the `'static` double buffer. Background code never touches it
//! after [`init`](AudioOutputI2S::init); it talks to the engine through the
//! [`AudioPlayer`](crate::playback::AudioPlayer) half of the same
//! [`AudioShared`](crate::playback::AudioShared).
//!
//! ## Completion edge
//!
//! ```text
//!  block 0 ──DMA──► TX FIFO        block 1 filled by software
//!        │ done
//!        ▼
//!  on_dma_complete: ack ─► commands ─► mode change ─► swap ─► refill ─► re-arm
//!        │
//!  block 1 ──DMA──► TX FIFO        block 0 filled by software
//! ```
//!
//! Everything after the acknowledge has to finish within
//! [`BLOCK_DURATION_US`](crate::constants::BLOCK_DURATION_US), or the FIFO
//! runs dry and the line glitches.
//!
//! ## Usage
//!
//! ```ignore
//! static AUDIO: AudioShared = AudioShared::new();
//! static mut BLOCKS: DoubleBuffer = DoubleBuffer::new();
//!
//! let (player, link) = AUDIO.split().unwrap();
//! let blocks = unsafe { &mut *core::ptr::addr_of_mut!(BLOCKS) };
//! let mut output = AudioOutputI2S::new(link, blocks, pio0, dma, Synth::new(), I2sConfig::default());
//! output.init()?;
//!
//! // In DMA_IRQ_0:
//! output.on_dma_complete();
//!
//! // Anywhere in background code:
//! player.set_volume(0.8);
//! player.play_raw_buffer(&CHIME)?;
//! ```

use crate::block::DoubleBuffer;
use crate::constants::BLOCK_SAMPLES;
use crate::error::Error;
use crate::hal::{ClockDivider, DmaController, I2sConfig, PioBlock};
use crate::lifecycle::{dma_safe_abort, ClaimGuard, Lifecycle, Resources};
use crate::playback::{EngineLink, PlaybackState};
use crate::source::{ActiveSource, RawSource, SourceKind};
use crate::synth::SynthEngine;

/// The interrupt-side audio engine.
///
/// Dropping it tears everything down: the state machine stops, the pins go
/// low, the DMA channel is safely aborted, then the completion interrupt,
/// DMA channel, PIO program and state machine are released in that order.
pub struct AudioOutputI2S<'a, P: PioBlock, D: DmaController, S: SynthEngine> {
    link: EngineLink<'a>,
    buffers: &'static mut DoubleBuffer,
    pio: P,
    dma: D,
    synth: S,
    config: I2sConfig,
    lifecycle: Lifecycle,
    source: ActiveSource,
    /// Raw buffer taken from the mailbox but not yet started.
    pending_raw: Option<&'static [i16]>,
}

impl<'a, P: PioBlock, D: DmaController, S: SynthEngine> AudioOutputI2S<'a, P, D, S> {
    /// Assemble the engine. No hardware is touched until [`init`](Self::init).
    pub fn new(
        link: EngineLink<'a>,
        buffers: &'static mut DoubleBuffer,
        pio: P,
        dma: D,
        synth: S,
        config: I2sConfig,
    ) -> Self {
        AudioOutputI2S {
            link,
            buffers,
            pio,
            dma,
            synth,
            config,
            lifecycle: Lifecycle::Uninitialized,
            source: ActiveSource::Silence,
            pending_raw: None,
        }
    }

    /// Acquire the hardware and start streaming silence.
    ///
    /// After [`partial_teardown`](Self::partial_teardown) this restarts the
    /// stopped hardware with the claims already held. On failure everything
    /// acquired by this call is released again.
    pub fn init(&mut self) -> Result<(), Error> {
        let resources = match self.lifecycle {
            Lifecycle::Running(_) => return Err(Error::AlreadyInitialized),
            Lifecycle::Halted(resources) => {
                self.pio.init_i2s(
                    resources.state_machine,
                    resources.program,
                    &self.config.pins,
                    ClockDivider::for_output(self.config.system_clock_hz),
                );
                resources
            }
            Lifecycle::Uninitialized => {
                let mut guard = ClaimGuard::new(&mut self.pio, &mut self.dma);
                let resources = guard.acquire(&self.config).map_err(|e| {
                    warn!("audio init failed: {}", e);
                    e
                })?;
                guard.disarm();
                resources
            }
        };

        self.start(resources);
        self.lifecycle = Lifecycle::Running(resources);
        info!(
            "audio output running: dma channel {}, sm {}",
            resources.channel.0,
            resources.state_machine.0
        );
        Ok(())
    }

    /// Arm block 0 with silence and start the state machine.
    fn start(&mut self, resources: Resources) {
        self.buffers.reset();
        self.arm(resources);
        self.pio.set_enabled(resources.state_machine, true);
    }

    fn arm(&mut self, resources: Resources) {
        let block = self.buffers.in_flight();
        // SAFETY: `buffers` is 'static, and the in-flight block is not written
        // again until the next completion edge swaps it back to software.
        unsafe {
            self.dma.start_transfer(
                resources.channel,
                block.samples.as_ptr(),
                BLOCK_SAMPLES as u32,
            );
        }
    }

    /// Stop the state machine, drive the I2S pins low and safely abort the
    /// DMA channel. The hardware stays claimed; [`init`](Self::init)
    /// restarts it.
    pub fn partial_teardown(&mut self) -> Result<(), Error> {
        match self.lifecycle {
            Lifecycle::Uninitialized => Err(Error::NotInitialized),
            Lifecycle::Halted(_) => Ok(()),
            Lifecycle::Running(resources) => {
                self.pio.set_enabled(resources.state_machine, false);
                self.pio
                    .set_pins_low(resources.state_machine, self.config.pins.mask());
                dma_safe_abort(&mut self.dma, resources.channel);
                self.lifecycle = Lifecycle::Halted(resources);
                info!("audio output halted");
                Ok(())
            }
        }
    }

    /// DMA completion handler. Call from the shared DMA interrupt.
    ///
    /// Returns `false` (and does nothing) when the engine is not running or
    /// the completion flag belongs to another channel.
    pub fn on_dma_complete(&mut self) -> bool {
        let resources = match self.lifecycle {
            Lifecycle::Running(resources) => resources,
            _ => return false,
        };
        if !self.dma.irq_pending(resources.channel) {
            return false;
        }
        // Acknowledged before re-arming, so the next completion cannot be lost.
        self.dma.acknowledge_irq(resources.channel);

        while let Some(command) = self.link.next_command() {
            self.synth.apply(command);
        }

        if self.apply_mode_changes() {
            // The fillable block goes out next and still holds the previous
            // source's samples.
            self.refill();
        }

        self.buffers.swap();
        self.refill();
        self.arm(resources);
        true
    }

    /// Bring the active source in line with the playback state.
    ///
    /// Returns `true` if the source changed.
    fn apply_mode_changes(&mut self) -> bool {
        if let Some(data) = self.link.take_raw_request() {
            self.pending_raw = Some(data);
        }

        let before = self.source.kind();
        match self.link.state() {
            PlaybackState::Idle => self.source = ActiveSource::Silence,
            PlaybackState::PlayingSynth => self.source = ActiveSource::Synth,
            PlaybackState::PlayingBuffer => match self.pending_raw.take() {
                Some(data) => {
                    self.source = ActiveSource::Raw(RawSource::new(data));
                    return true;
                }
                None => {
                    if before != SourceKind::Raw {
                        self.source = ActiveSource::Silence;
                        self.link.finish_raw();
                    }
                }
            },
        }
        self.source.kind() != before
    }

    /// Fill the software-owned block from the active source and scale it.
    fn refill(&mut self) {
        let gain = self.link.gain();
        let block = self.buffers.fillable_mut();
        let exhausted = self.source.fill(block, &mut self.synth);
        gain.apply(&mut block.samples);
        if exhausted {
            self.source = ActiveSource::Silence;
            self.link.finish_raw();
        }
    }

    /// `true` between a successful `init` and the next teardown.
    pub fn is_running(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Running(_))
    }

    /// Which provider the next refill reads from.
    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// The double buffer, for instrumentation.
    pub fn buffers(&self) -> &DoubleBuffer {
        &*self.buffers
    }

    /// The synthesis engine, for inspecting channel state.
    pub fn synth(&self) -> &S {
        &self.synth
    }

    pub fn config(&self) -> &I2sConfig {
        &self.config
    }
}

impl<P: PioBlock, D: DmaController, S: SynthEngine> Drop for AudioOutputI2S<'_, P, D, S> {
    fn drop(&mut self) {
        // partial_teardown only fails when there is nothing to release
        if self.partial_teardown().is_err() {
            return;
        }
        if let Some(resources) = self.lifecycle.resources() {
            drop(ClaimGuard::holding(&mut self.pio, &mut self.dma, resources));
            self.lifecycle = Lifecycle::Uninitialized;
            info!("audio output released");
        }
    }
}
