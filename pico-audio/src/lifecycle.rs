//! Hardware acquisition, safe abort and release ordering.

use core::hint::spin_loop;

use crate::error::Error;
use crate::hal::{
    ClockDivider, DmaChannelId, DmaController, I2sConfig, PioBlock, ProgramOffset,
    StateMachineId, AUDIO_I2S_PROGRAM,
};

/// Stop `channel` without leaving a stale completion behind.
///
/// 1. mask the channel's completion interrupt
/// 2. abort the transfer
/// 3. spin until the channel reports idle
/// 4. acknowledge the completion flag the abort may have raised
/// 5. restore the interrupt mask
///
/// After this returns the channel may be re-armed, and the completion handler
/// will not run for the aborted transfer.
pub fn dma_safe_abort<D: DmaController>(dma: &mut D, channel: DmaChannelId) {
    let was_enabled = dma.irq_enabled(channel);
    dma.set_irq_enabled(channel, false);
    dma.abort(channel);
    while dma.is_busy(channel) {
        spin_loop();
    }
    dma.acknowledge_irq(channel);
    dma.set_irq_enabled(channel, was_enabled);
}

/// Everything `init` acquires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct Resources {
    pub(crate) channel: DmaChannelId,
    pub(crate) program: ProgramOffset,
    pub(crate) state_machine: StateMachineId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Uninitialized,
    Running(Resources),
    /// Torn down partially: hardware stopped, claims still held.
    Halted(Resources),
}

impl Lifecycle {
    pub(crate) fn resources(&self) -> Option<Resources> {
        match *self {
            Lifecycle::Uninitialized => None,
            Lifecycle::Running(r) | Lifecycle::Halted(r) => Some(r),
        }
    }
}

/// Scoped ownership of the DMA channel, PIO program and state machine.
///
/// Dropping the guard releases whatever it holds in a fixed order:
/// completion interrupt, DMA channel, PIO program, state machine. Call
/// [`disarm`](Self::disarm) to keep the claims instead.
pub(crate) struct ClaimGuard<'h, P: PioBlock, D: DmaController> {
    pio: &'h mut P,
    dma: &'h mut D,
    channel: Option<DmaChannelId>,
    program: Option<ProgramOffset>,
    state_machine: Option<StateMachineId>,
    irq_registered: bool,
}

impl<'h, P: PioBlock, D: DmaController> ClaimGuard<'h, P, D> {
    pub(crate) fn new(pio: &'h mut P, dma: &'h mut D) -> Self {
        ClaimGuard {
            pio,
            dma,
            channel: None,
            program: None,
            state_machine: None,
            irq_registered: false,
        }
    }

    /// Take back resources from an initialized engine, for release.
    pub(crate) fn holding(pio: &'h mut P, dma: &'h mut D, resources: Resources) -> Self {
        ClaimGuard {
            pio,
            dma,
            channel: Some(resources.channel),
            program: Some(resources.program),
            state_machine: Some(resources.state_machine),
            irq_registered: true,
        }
    }

    /// Claim a DMA channel, load the I2S program, claim and configure the
    /// state machine, then hook up the completion interrupt.
    ///
    /// Stops at the first failure; the guard still releases what was taken.
    pub(crate) fn acquire(&mut self, config: &I2sConfig) -> Result<Resources, Error> {
        config.pins.validate()?;
        let sm = config.state_machine;

        let channel = self
            .dma
            .claim_unused_channel()
            .ok_or(Error::DmaChannelUnavailable)?;
        self.channel = Some(channel);
        self.dma
            .configure_for_peripheral(channel, self.pio.tx_fifo_address(sm), self.pio.tx_dreq(sm));

        let program = self
            .pio
            .add_program(&AUDIO_I2S_PROGRAM)
            .ok_or(Error::ProgramSpaceExhausted)?;
        self.program = Some(program);

        if !self.pio.claim_state_machine(sm) {
            return Err(Error::StateMachineUnavailable(sm.0));
        }
        self.state_machine = Some(sm);

        let divider = ClockDivider::for_output(config.system_clock_hz);
        self.pio.init_i2s(sm, program, &config.pins, divider);
        debug!(
            "i2s divider {}.{} at {} Hz",
            divider.integer,
            divider.fraction,
            config.system_clock_hz
        );

        self.dma.set_irq_enabled(channel, true);
        self.dma.register_completion_handler();
        self.irq_registered = true;

        Ok(Resources {
            channel,
            program,
            state_machine: sm,
        })
    }

    /// Keep everything acquired so far.
    pub(crate) fn disarm(mut self) {
        self.channel = None;
        self.program = None;
        self.state_machine = None;
        self.irq_registered = false;
    }
}

impl<P: PioBlock, D: DmaController> Drop for ClaimGuard<'_, P, D> {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            if self.irq_registered {
                self.dma.set_irq_enabled(channel, false);
                self.dma.unregister_completion_handler();
            }
            self.dma.unclaim_channel(channel);
        }
        if let Some(offset) = self.program.take() {
            self.pio.remove_program(&AUDIO_I2S_PROGRAM, offset);
        }
        if let Some(sm) = self.state_machine.take() {
            self.pio.unclaim_state_machine(sm);
        }
    }
}
