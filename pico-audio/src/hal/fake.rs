//! Host-side stand-in for the PIO block and DMA controller.
//!
//! Both halves share one [`Bus`] that records every hardware operation in
//! order and captures the contents of every armed transfer, which is exactly
//! what the I2S pins would emit.

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use super::{
    ClockDivider, DmaChannelId, DmaController, I2sPins, PioBlock, PioProgram, ProgramOffset,
    StateMachineId,
};

pub const FAKE_TX_FIFO: u32 = 0x5020_0010;
pub const FAKE_DREQ: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ClaimDma(u8),
    UnclaimDma(u8),
    ConfigureDma { write_address: u32, dreq: u8 },
    StartTransfer(u8),
    Abort(u8),
    IrqEnabled(bool),
    Acknowledge,
    RegisterHandler,
    UnregisterHandler,
    AddProgram(u8),
    RemoveProgram(u8),
    ClaimSm(u8),
    UnclaimSm(u8),
    InitSm(ClockDivider),
    SmEnabled(bool),
    PinsLow(u32),
}

pub struct BusState {
    pub events: Vec<Event>,
    pub dma_available: bool,
    pub program_space: bool,
    pub sm_claimed: [bool; 4],
    pub channel: Option<u8>,
    pub program: Option<u8>,
    pub sm_enabled: bool,
    pub irq_enabled: bool,
    /// Raw completion flag (`INTR`), independent of the mask.
    pub raw_pending: bool,
    pub busy: bool,
    /// An abort was requested and BUSY has not dropped yet.
    pub aborting: bool,
    /// Polls of `is_busy` that still report busy after an abort.
    pub abort_busy_polls: u32,
    pub handler_registered: bool,
    /// Snapshot of each armed block, in arming order.
    pub transmitted: Vec<Vec<i16>>,
}

#[derive(Clone)]
pub struct Bus(Rc<RefCell<BusState>>);

impl Bus {
    pub fn new() -> Self {
        Bus(Rc::new(RefCell::new(BusState {
            events: Vec::new(),
            dma_available: true,
            program_space: true,
            sm_claimed: [false; 4],
            channel: None,
            program: None,
            sm_enabled: false,
            irq_enabled: false,
            raw_pending: false,
            busy: false,
            aborting: false,
            abort_busy_polls: 0,
            handler_registered: false,
            transmitted: Vec::new(),
        })))
    }

    pub fn state(&self) -> std::cell::Ref<'_, BusState> {
        self.0.borrow()
    }

    pub fn state_mut(&self) -> std::cell::RefMut<'_, BusState> {
        self.0.borrow_mut()
    }

    /// The armed transfer drains: BUSY drops and the completion flag rises.
    pub fn finish_transfer(&self) {
        let mut s = self.0.borrow_mut();
        s.busy = false;
        s.raw_pending = true;
    }

    /// Whether the NVIC would currently enter the DMA interrupt.
    pub fn interrupt_asserted(&self) -> bool {
        let s = self.0.borrow();
        s.raw_pending && s.irq_enabled && s.handler_registered
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    pub fn transmitted(&self) -> Vec<Vec<i16>> {
        self.0.borrow().transmitted.clone()
    }

    pub fn clear_log(&self) {
        let mut s = self.0.borrow_mut();
        s.events.clear();
        s.transmitted.clear();
    }

    fn record(&self, event: Event) {
        self.0.borrow_mut().events.push(event);
    }
}

pub struct FakePio {
    bus: Bus,
}

pub struct FakeDma {
    bus: Bus,
}

pub fn fake_hardware() -> (FakePio, FakeDma, Bus) {
    let bus = Bus::new();
    (
        FakePio { bus: bus.clone() },
        FakeDma { bus: bus.clone() },
        bus,
    )
}

impl PioBlock for FakePio {
    fn claim_state_machine(&mut self, sm: StateMachineId) -> bool {
        let mut s = self.bus.state_mut();
        let slot = &mut s.sm_claimed[sm.0 as usize];
        if *slot {
            return false;
        }
        *slot = true;
        s.events.push(Event::ClaimSm(sm.0));
        true
    }

    fn unclaim_state_machine(&mut self, sm: StateMachineId) {
        self.bus.state_mut().sm_claimed[sm.0 as usize] = false;
        self.bus.record(Event::UnclaimSm(sm.0));
    }

    fn add_program(&mut self, _program: &PioProgram) -> Option<ProgramOffset> {
        let mut s = self.bus.state_mut();
        if !s.program_space || s.program.is_some() {
            return None;
        }
        s.program = Some(24);
        s.events.push(Event::AddProgram(24));
        Some(ProgramOffset(24))
    }

    fn remove_program(&mut self, _program: &PioProgram, offset: ProgramOffset) {
        self.bus.state_mut().program = None;
        self.bus.record(Event::RemoveProgram(offset.0));
    }

    fn init_i2s(
        &mut self,
        _sm: StateMachineId,
        _offset: ProgramOffset,
        _pins: &I2sPins,
        divider: ClockDivider,
    ) {
        self.bus.record(Event::InitSm(divider));
    }

    fn set_enabled(&mut self, _sm: StateMachineId, enabled: bool) {
        self.bus.state_mut().sm_enabled = enabled;
        self.bus.record(Event::SmEnabled(enabled));
    }

    fn set_pins_low(&mut self, _sm: StateMachineId, mask: u32) {
        self.bus.record(Event::PinsLow(mask));
    }

    fn tx_fifo_address(&self, _sm: StateMachineId) -> u32 {
        FAKE_TX_FIFO
    }

    fn tx_dreq(&self, _sm: StateMachineId) -> u8 {
        FAKE_DREQ
    }
}

impl DmaController for FakeDma {
    fn claim_unused_channel(&mut self) -> Option<DmaChannelId> {
        let mut s = self.bus.state_mut();
        if !s.dma_available || s.channel.is_some() {
            return None;
        }
        s.channel = Some(3);
        s.events.push(Event::ClaimDma(3));
        Some(DmaChannelId(3))
    }

    fn unclaim_channel(&mut self, channel: DmaChannelId) {
        self.bus.state_mut().channel = None;
        self.bus.record(Event::UnclaimDma(channel.0));
    }

    fn configure_for_peripheral(&mut self, _channel: DmaChannelId, write_address: u32, dreq: u8) {
        self.bus.record(Event::ConfigureDma {
            write_address,
            dreq,
        });
    }

    unsafe fn start_transfer(&mut self, channel: DmaChannelId, source: *const i16, count: u32) {
        // SAFETY: caller guarantees `source` is valid for `count` samples.
        let samples = unsafe { core::slice::from_raw_parts(source, count as usize) }.to_vec();
        let mut s = self.bus.state_mut();
        s.busy = true;
        s.transmitted.push(samples);
        s.events.push(Event::StartTransfer(channel.0));
    }

    fn abort(&mut self, channel: DmaChannelId) {
        let mut s = self.bus.state_mut();
        if s.busy {
            // Aborting a live transfer raises the completion flag, and BUSY
            // lingers for a few polls.
            s.raw_pending = true;
            s.aborting = true;
            s.abort_busy_polls = 2;
        }
        s.events.push(Event::Abort(channel.0));
    }

    fn is_busy(&self, _channel: DmaChannelId) -> bool {
        let mut s = self.bus.state_mut();
        if s.aborting {
            if s.abort_busy_polls == 0 {
                s.busy = false;
                s.aborting = false;
            } else {
                s.abort_busy_polls -= 1;
            }
        }
        s.busy
    }

    fn irq_enabled(&self, _channel: DmaChannelId) -> bool {
        self.bus.state().irq_enabled
    }

    fn set_irq_enabled(&mut self, _channel: DmaChannelId, enabled: bool) {
        self.bus.state_mut().irq_enabled = enabled;
        self.bus.record(Event::IrqEnabled(enabled));
    }

    fn irq_pending(&self, _channel: DmaChannelId) -> bool {
        let s = self.bus.state();
        s.raw_pending && s.irq_enabled
    }

    fn acknowledge_irq(&mut self, _channel: DmaChannelId) {
        self.bus.state_mut().raw_pending = false;
        self.bus.record(Event::Acknowledge);
    }

    fn register_completion_handler(&mut self) {
        self.bus.state_mut().handler_registered = true;
        self.bus.record(Event::RegisterHandler);
    }

    fn unregister_completion_handler(&mut self) {
        self.bus.state_mut().handler_registered = false;
        self.bus.record(Event::UnregisterHandler);
    }
}
