//! Simulated lines, shift registers and timers for exercising the
//! bit-banged drivers on the host.
//!
//! Nothing here touches real registers: the SPI harness is a three-wire
//! shifter with DI looped back to DO, the I2C harness is a wired-AND bus
//! with a scripted slave snooping START/STOP conditions and acknowledging
//! bytes, and the serial harness records pin transitions against a virtual
//! nanosecond clock advanced by the timer.

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use core::time::Duration;

use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::timer::{CountDown, Periodic};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use crate::usi::Usi;

// ---------------------------------------------------------------------------
// Three-wire (SPI) harness

/// Virtual three-wire shifter with its data input wired to its data
/// output, so every transfer echoes the outgoing byte.
pub struct LoopbackUsi {
    shift: u8,
    edges_left: u8,
    overflow: bool,
    clock: bool,
    sample_on_second: bool,
    /// Total clock edges strobed.
    pub strobes: u32,
    /// Interrupt masks taken.
    pub masks: u32,
    /// Interrupt masks restored.
    pub restores: u32,
}

impl LoopbackUsi {
    pub fn new() -> Self {
        LoopbackUsi {
            shift: 0,
            edges_left: 0,
            overflow: false,
            clock: false,
            sample_on_second: false,
            strobes: 0,
            masks: 0,
            restores: 0,
        }
    }
}

impl Usi for LoopbackUsi {
    type IrqToken = ();

    fn load(&mut self, byte: u8) {
        self.shift = byte;
    }

    fn take(&mut self) -> u8 {
        self.shift
    }

    fn arm(&mut self, bits: u8) {
        self.edges_left = bits * 2;
        self.overflow = self.edges_left == 0;
    }

    fn overflowed(&self) -> bool {
        self.overflow
    }

    fn strobe(&mut self) {
        self.strobes += 1;
        self.clock = !self.clock;
        if self.edges_left > 0 {
            let shifting_edge = if self.sample_on_second {
                !self.clock
            } else {
                self.clock
            };
            if shifting_edge {
                let echoed = self.shift >> 7;
                self.shift = (self.shift << 1) | echoed;
            }
            self.edges_left -= 1;
            if self.edges_left == 0 {
                self.overflow = true;
            }
        }
    }

    fn set_phase(&mut self, sample_on_second_edge: bool) {
        self.sample_on_second = sample_on_second_edge;
    }

    fn clock_line_high(&self) -> bool {
        self.clock
    }

    fn data_output(&mut self, _enable: bool) {}

    fn mask_interrupts(&mut self) {
        self.masks += 1;
    }

    fn restore_interrupts(&mut self, _token: ()) {
        self.restores += 1;
    }
}

// ---------------------------------------------------------------------------
// Two-wire (I2C) harness

/// Everything observed on the simulated two-wire bus, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    Stop,
    /// Master-to-slave byte (including address bytes) and the slave's
    /// acknowledgement.
    Write { byte: u8, acked: bool },
    /// Slave-to-master byte and the master's acknowledgement.
    Read { byte: u8, master_acked: bool },
}

#[derive(Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Addr,
    Write,
    Read,
}

struct TwoWireBus {
    // Master side
    scl_master_low: bool,
    sda_pin_out: bool,
    sda_latch_low: bool,
    usi_output: bool,
    sda_out_low: bool,
    shift: u8,
    edges_left: u8,
    overflow: bool,
    // Slave side
    hold_scl: bool,
    slave_sda_low: bool,
    phase: Phase,
    bit_no: u8,
    cur: u8,
    pending_ack: bool,
    reading_byte: u8,
    master_ack: bool,
    byte_index: usize,
    nack_on: Option<usize>,
    read_data: VecDeque<u8>,
    // Edge tracking
    prev_scl: bool,
    prev_sda: bool,
    events: Vec<BusEvent>,
}

impl TwoWireBus {
    fn new() -> Self {
        TwoWireBus {
            scl_master_low: false,
            sda_pin_out: false,
            sda_latch_low: false,
            usi_output: false,
            sda_out_low: false,
            shift: 0,
            edges_left: 0,
            overflow: false,
            hold_scl: false,
            slave_sda_low: false,
            phase: Phase::Idle,
            bit_no: 0,
            cur: 0,
            pending_ack: false,
            reading_byte: 0xFF,
            master_ack: false,
            byte_index: 0,
            nack_on: None,
            read_data: VecDeque::new(),
            prev_scl: true,
            prev_sda: true,
            events: Vec::new(),
        }
    }

    fn scl_level(&self) -> bool {
        !(self.scl_master_low || self.hold_scl)
    }

    fn sda_level(&self) -> bool {
        let master_low = if self.usi_output && self.edges_left > 0 {
            self.sda_out_low
        } else {
            self.sda_pin_out && self.sda_latch_low
        };
        !(master_low || self.slave_sda_low)
    }

    fn strobe(&mut self) {
        let was_high = self.scl_level();
        self.scl_master_low = !self.scl_master_low;
        let now_high = self.scl_level();
        let rising = now_high && !was_high;
        self.settle();
        // A stretched clock never leaves the low level: no edge, no shift.
        if now_high != was_high && self.edges_left > 0 {
            if rising {
                let bit = self.sda_level() as u8;
                self.shift = (self.shift << 1) | bit;
            }
            self.edges_left -= 1;
            if self.edges_left == 0 {
                self.overflow = true;
            } else if !rising {
                // Output bit changes on the falling edge, as the shifter
                // hardware does in two-wire mode.
                self.sda_out_low = self.shift & 0x80 == 0;
            }
        }
    }

    fn settle(&mut self) {
        let scl = self.scl_level();
        let sda = self.sda_level();
        if scl && self.prev_scl {
            if sda != self.prev_sda {
                if sda {
                    self.on_stop();
                } else {
                    self.on_start();
                }
            }
        } else if scl && !self.prev_scl {
            self.on_scl_rising(sda);
        } else if !scl && self.prev_scl {
            self.on_scl_falling();
        }
        self.prev_scl = scl;
        self.prev_sda = self.sda_level();
    }

    fn on_start(&mut self) {
        self.events.push(BusEvent::Start);
        self.phase = Phase::Addr;
        self.bit_no = 0;
        self.cur = 0;
        self.slave_sda_low = false;
    }

    fn on_stop(&mut self) {
        self.events.push(BusEvent::Stop);
        self.phase = Phase::Idle;
        self.bit_no = 0;
        self.cur = 0;
        self.slave_sda_low = false;
    }

    fn on_scl_rising(&mut self, sda: bool) {
        match self.phase {
            Phase::Idle => {}
            Phase::Addr | Phase::Write => {
                if self.bit_no < 8 {
                    self.cur = (self.cur << 1) | sda as u8;
                }
                self.bit_no += 1;
            }
            Phase::Read => {
                if self.bit_no == 8 {
                    self.master_ack = !sda;
                }
                self.bit_no += 1;
            }
        }
    }

    fn on_scl_falling(&mut self) {
        match self.phase {
            Phase::Idle => {}
            Phase::Addr | Phase::Write => {
                if self.bit_no == 8 {
                    let ack = self.nack_on != Some(self.byte_index);
                    self.pending_ack = ack;
                    self.slave_sda_low = ack;
                } else if self.bit_no == 9 {
                    let byte = self.cur;
                    let ack = self.pending_ack;
                    self.slave_sda_low = false;
                    self.events.push(BusEvent::Write { byte, acked: ack });
                    let was_addr = self.phase == Phase::Addr;
                    self.byte_index += 1;
                    self.bit_no = 0;
                    self.cur = 0;
                    if was_addr {
                        if !ack {
                            self.phase = Phase::Idle;
                        } else if byte & 1 == 1 {
                            self.phase = Phase::Read;
                            self.load_read_byte();
                        } else {
                            self.phase = Phase::Write;
                        }
                    }
                }
            }
            Phase::Read => {
                if (1..=7).contains(&self.bit_no) {
                    let bit = (self.reading_byte >> (7 - self.bit_no)) & 1;
                    self.slave_sda_low = bit == 0;
                } else if self.bit_no == 8 {
                    // ACK slot: the master drives.
                    self.slave_sda_low = false;
                } else if self.bit_no == 9 {
                    self.events.push(BusEvent::Read {
                        byte: self.reading_byte,
                        master_acked: self.master_ack,
                    });
                    self.bit_no = 0;
                    if self.master_ack {
                        self.load_read_byte();
                    }
                }
            }
        }
    }

    fn load_read_byte(&mut self) {
        self.reading_byte = self.read_data.pop_front().unwrap_or(0xFF);
        self.slave_sda_low = self.reading_byte & 0x80 == 0;
    }
}

/// Handle to a simulated two-wire bus with one scripted slave.
pub struct TwoWire {
    bus: Rc<RefCell<TwoWireBus>>,
}

impl TwoWire {
    pub fn new() -> Self {
        TwoWire {
            bus: Rc::new(RefCell::new(TwoWireBus::new())),
        }
    }

    pub fn usi(&self) -> TwoWireUsi {
        TwoWireUsi {
            bus: Rc::clone(&self.bus),
        }
    }

    pub fn scl(&self) -> LinePin {
        LinePin {
            bus: Rc::clone(&self.bus),
            sda: false,
        }
    }

    pub fn sda(&self) -> LinePin {
        LinePin {
            bus: Rc::clone(&self.bus),
            sda: true,
        }
    }

    /// Refuse the acknowledgement of the byte at `index` (address byte
    /// included, counted from zero).
    pub fn nack_on_byte(&self, index: usize) {
        self.bus.borrow_mut().nack_on = Some(index);
    }

    /// Stretch the clock indefinitely.
    pub fn hold_clock_low(&self) {
        self.bus.borrow_mut().hold_scl = true;
    }

    /// Bytes the slave will return for read transfers.
    pub fn queue_read(&self, bytes: &[u8]) {
        self.bus.borrow_mut().read_data.extend(bytes.iter().copied());
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.bus.borrow().events.clone()
    }
}

/// Virtual two-wire shift peripheral attached to a [`TwoWire`] bus.
pub struct TwoWireUsi {
    bus: Rc<RefCell<TwoWireBus>>,
}

impl Usi for TwoWireUsi {
    type IrqToken = ();

    fn load(&mut self, byte: u8) {
        let mut bus = self.bus.borrow_mut();
        bus.shift = byte;
        bus.sda_out_low = byte & 0x80 == 0;
    }

    fn take(&mut self) -> u8 {
        self.bus.borrow().shift
    }

    fn arm(&mut self, bits: u8) {
        let mut bus = self.bus.borrow_mut();
        bus.edges_left = bits * 2;
        bus.overflow = bus.edges_left == 0;
    }

    fn overflowed(&self) -> bool {
        self.bus.borrow().overflow
    }

    fn strobe(&mut self) {
        self.bus.borrow_mut().strobe();
    }

    fn clock_line_high(&self) -> bool {
        self.bus.borrow().scl_level()
    }

    fn data_output(&mut self, enable: bool) {
        let mut bus = self.bus.borrow_mut();
        bus.usi_output = enable;
        bus.settle();
    }

    fn mask_interrupts(&mut self) {}

    fn restore_interrupts(&mut self, _token: ()) {}
}

/// Open-drain handle to one line of a [`TwoWire`] bus: `set_high`
/// releases the line, `set_low` drives it.
pub struct LinePin {
    bus: Rc<RefCell<TwoWireBus>>,
    sda: bool,
}

impl OutputPin for LinePin {
    type Error = Infallible;

    fn set_high(&mut self) -> Result<(), Infallible> {
        let mut bus = self.bus.borrow_mut();
        if self.sda {
            bus.sda_pin_out = false;
            bus.sda_latch_low = false;
        } else {
            bus.scl_master_low = false;
        }
        bus.settle();
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Infallible> {
        let mut bus = self.bus.borrow_mut();
        if self.sda {
            bus.sda_pin_out = true;
            bus.sda_latch_low = true;
        } else {
            bus.scl_master_low = true;
        }
        bus.settle();
        Ok(())
    }
}

impl InputPin for LinePin {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        let bus = self.bus.borrow();
        Ok(if self.sda {
            bus.sda_level()
        } else {
            bus.scl_level()
        })
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        self.is_high().map(|level| !level)
    }
}

// ---------------------------------------------------------------------------
// Timers and serial pins

/// Timer whose ticks are free: `wait` always completes immediately.
pub struct TickTimer;

impl TickTimer {
    pub fn new() -> Self {
        TickTimer
    }
}

impl CountDown for TickTimer {
    type Time = Duration;

    fn start<T: Into<Duration>>(&mut self, _count: T) {}

    fn wait(&mut self) -> nb::Result<(), void::Void> {
        Ok(())
    }
}

impl Periodic for TickTimer {}

/// Shared virtual nanosecond clock.
#[derive(Clone)]
pub struct VirtualClock {
    now: Rc<Cell<u64>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        VirtualClock {
            now: Rc::new(Cell::new(0)),
        }
    }

    pub fn now(&self) -> u64 {
        self.now.get()
    }

    fn advance(&self, ns: u64) {
        self.now.set(self.now.get() + ns);
    }
}

/// Timer that advances the [`VirtualClock`] by exactly the waited time.
pub struct ClockTimer {
    clock: VirtualClock,
    pending: u64,
}

impl ClockTimer {
    pub fn new(clock: &VirtualClock) -> Self {
        ClockTimer {
            clock: clock.clone(),
            pending: 0,
        }
    }
}

impl CountDown for ClockTimer {
    type Time = Duration;

    fn start<T: Into<Duration>>(&mut self, count: T) {
        self.pending = count.into().as_nanos() as u64;
    }

    fn wait(&mut self) -> nb::Result<(), void::Void> {
        self.clock.advance(self.pending);
        Ok(())
    }
}

impl Periodic for ClockTimer {}

/// Output pin recording every level transition with its timestamp.
#[derive(Clone)]
pub struct RecordingPin {
    clock: VirtualClock,
    log: Rc<RefCell<Vec<(u64, bool)>>>,
}

impl RecordingPin {
    /// The line starts at idle high.
    pub fn new(clock: &VirtualClock) -> Self {
        RecordingPin {
            clock: clock.clone(),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Timestamp of the first drive-low (the start bit edge).
    pub fn first_low_at(&self) -> Option<u64> {
        self.log
            .borrow()
            .iter()
            .find(|(_, level)| !level)
            .map(|(t, _)| *t)
    }

    /// Recorded line level at time `t`.
    pub fn level_at(&self, t: u64) -> bool {
        self.log
            .borrow()
            .iter()
            .take_while(|(at, _)| *at <= t)
            .last()
            .map(|(_, level)| *level)
            .unwrap_or(true)
    }
}

impl OutputPin for RecordingPin {
    type Error = Infallible;

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.log.borrow_mut().push((self.clock.now(), true));
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.log.borrow_mut().push((self.clock.now(), false));
        Ok(())
    }
}

/// Input pin replaying a fixed waveform of `(timestamp, level)` steps
/// against the virtual clock.
pub struct WavePin {
    clock: VirtualClock,
    wave: Vec<(u64, bool)>,
}

impl WavePin {
    pub fn new(clock: &VirtualClock, wave: Vec<(u64, bool)>) -> Self {
        WavePin {
            clock: clock.clone(),
            wave,
        }
    }
}

impl InputPin for WavePin {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        let now = self.clock.now();
        Ok(self
            .wave
            .iter()
            .take_while(|(at, _)| *at <= now)
            .last()
            .map(|(_, level)| *level)
            .unwrap_or(true))
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        self.is_high().map(|level| !level)
    }
}

/// Waveform of one 8N1 frame starting its start bit at `start_ns`.
pub fn uart_wave(start_ns: u64, bit_ns: u64, byte: u8) -> Vec<(u64, bool)> {
    let mut wave = Vec::new();
    wave.push((0, true));
    wave.push((start_ns, false));
    for bit in 0..8u8 {
        let level = byte & (1 << bit) != 0;
        wave.push((start_ns + bit_ns * (u64::from(bit) + 1), level));
    }
    wave.push((start_ns + bit_ns * 9, true));
    wave
}
