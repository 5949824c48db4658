//! TCB0 as a periodic 16-bit countdown timer.
//!
//! In periodic-interrupt mode the counter runs to the compare value,
//! raises the capture flag and wraps, which is exactly the
//! `CountDown + Periodic` contract the bit-banged drivers pace themselves
//! with. On this family it is the preferred clock source over a
//! calibrated spin loop.

use core::time::Duration;

use embedded_hal::timer::{CountDown, Periodic};

const CTRLA: *mut u8 = 0x0A40 as *mut u8;
const CTRLB: *mut u8 = 0x0A41 as *mut u8;
const INTFLAGS: *mut u8 = 0x0A46 as *mut u8;
const CNTL: *mut u8 = 0x0A4A as *mut u8;
const CCMPL: *mut u8 = 0x0A4C as *mut u8;

const ENABLE: u8 = 0x01;
const CNTMODE_INT: u8 = 0x00;
const CAPT: u8 = 0x01;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Counter clock prescaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    Div1,
    Div2,
}

impl Prescaler {
    fn bits(self) -> u8 {
        match self {
            Prescaler::Div1 => 0x00,
            Prescaler::Div2 => 0x02,
        }
    }

    fn divisor(self) -> u32 {
        match self {
            Prescaler::Div1 => 1,
            Prescaler::Div2 => 2,
        }
    }
}

unsafe fn write_16(low: *mut u8, value: u16) {
    low.write_volatile(value as u8);
    low.add(1).write_volatile((value >> 8) as u8);
}

unsafe fn read_16(low: *mut u8) -> u16 {
    let l = low.read_volatile() as u16;
    let h = low.add(1).read_volatile() as u16;
    l | (h << 8)
}

/// The TCB0 block in periodic-interrupt mode.
pub struct Tcb0 {
    tick_hz: u32,
}

impl Tcb0 {
    pub fn new(cpu_hz: u32, prescaler: Prescaler) -> Self {
        unsafe {
            CTRLB.write_volatile(CNTMODE_INT);
            CTRLA.write_volatile(prescaler.bits() | ENABLE);
        }
        Tcb0 {
            tick_hz: cpu_hz / prescaler.divisor(),
        }
    }

    /// Pause the counter without losing its state.
    pub fn stop(&mut self) {
        unsafe {
            CTRLA.write_volatile(CTRLA.read_volatile() & !ENABLE);
        }
    }

    pub fn resume(&mut self) {
        unsafe {
            CTRLA.write_volatile(CTRLA.read_volatile() | ENABLE);
        }
    }

    pub fn count(&self) -> u16 {
        unsafe { read_16(CNTL) }
    }

    pub fn set_count(&mut self, count: u16) {
        unsafe {
            write_16(CNTL, count);
        }
    }

    /// Block for `us` microseconds.
    pub fn delay_us(&mut self, us: u32) {
        self.start(Duration::from_micros(u64::from(us)));
        nb::block!(self.wait()).ok();
    }

    /// Block for `ms` milliseconds.
    pub fn delay_ms(&mut self, ms: u16) {
        self.start(Duration::from_millis(u64::from(ms)));
        nb::block!(self.wait()).ok();
    }

    fn ticks_for(&self, duration: Duration) -> u16 {
        let nanos = duration.as_nanos() as u64;
        let ticks = nanos * u64::from(self.tick_hz) / NANOS_PER_SEC;
        ticks.clamp(1, u64::from(u16::MAX)) as u16
    }
}

impl CountDown for Tcb0 {
    type Time = Duration;

    fn start<T: Into<Duration>>(&mut self, count: T) {
        let ticks = self.ticks_for(count.into());
        unsafe {
            write_16(CCMPL, ticks);
            write_16(CNTL, 0);
            INTFLAGS.write_volatile(CAPT);
        }
    }

    fn wait(&mut self) -> nb::Result<(), void::Void> {
        if unsafe { INTFLAGS.read_volatile() } & CAPT == 0 {
            return Err(nb::Error::WouldBlock);
        }
        unsafe {
            // The flag clears by writing a one; the counter has already
            // wrapped for the next period.
            INTFLAGS.write_volatile(CAPT);
        }
        Ok(())
    }
}

impl Periodic for Tcb0 {}
