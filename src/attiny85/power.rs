//! Sleep modes, watchdog and peripheral clock gating.

use super::critical::CriticalSection;

const PRR: *mut u8 = 0x40 as *mut u8;
const WDTCR: *mut u8 = 0x41 as *mut u8;
const MCUCR: *mut u8 = 0x55 as *mut u8;

const SE: u8 = 0x20;
const SM1: u8 = 0x10;
const SM0: u8 = 0x08;

const WDIE: u8 = 0x40;
const WDP3: u8 = 0x20;
const WDCE: u8 = 0x10;
const WDE: u8 = 0x08;

/// Clock-gating masks for [`power_down`]/[`power_up`].
pub mod peripherals {
    pub const ADC: u8 = 0x01;
    pub const USI: u8 = 0x02;
    pub const TIMER0: u8 = 0x04;
    pub const TIMER1: u8 = 0x08;
}

/// Sleep depth selected before [`sleep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepMode {
    /// CPU stops, peripherals keep running.
    Idle,
    /// CPU and I/O clocks stop for a quiet conversion.
    AdcNoiseReduction,
    /// Everything but the watchdog and pin-change wakeups stops.
    PowerDown,
}

/// Select a sleep mode and set the sleep enable bit.
pub fn sleep_enable(mode: SleepMode) {
    let sm = match mode {
        SleepMode::Idle => 0,
        SleepMode::AdcNoiseReduction => SM0,
        SleepMode::PowerDown => SM1,
    };
    unsafe {
        let mcucr = MCUCR.read_volatile() & !(SM1 | SM0);
        MCUCR.write_volatile(mcucr | sm | SE);
    }
}

/// Clear the sleep enable bit.
pub fn sleep_disable() {
    unsafe {
        MCUCR.write_volatile(MCUCR.read_volatile() & !SE);
    }
}

/// Execute the sleep instruction; returns after wake-up.
pub fn sleep() {
    #[cfg(target_arch = "avr")]
    unsafe {
        core::arch::asm!("sleep");
    }
}

/// Watchdog period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WdtTimeout {
    Ms16,
    Ms32,
    Ms64,
    Ms125,
    Ms250,
    Ms500,
    S1,
    S2,
    S4,
    S8,
}

impl WdtTimeout {
    fn bits(self) -> u8 {
        match self {
            WdtTimeout::Ms16 => 0x00,
            WdtTimeout::Ms32 => 0x01,
            WdtTimeout::Ms64 => 0x02,
            WdtTimeout::Ms125 => 0x03,
            WdtTimeout::Ms250 => 0x04,
            WdtTimeout::Ms500 => 0x05,
            WdtTimeout::S1 => 0x06,
            WdtTimeout::S2 => 0x07,
            WdtTimeout::S4 => WDP3,
            WdtTimeout::S8 => WDP3 | 0x01,
        }
    }
}

/// What the watchdog does on expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WdtMode {
    /// System reset.
    Reset,
    /// Interrupt first; the handler decides.
    Interrupt,
}

pub fn wdt_enable(timeout: WdtTimeout, mode: WdtMode) {
    let mut config = timeout.bits() | WDE;
    if mode == WdtMode::Interrupt {
        config |= WDIE;
    }
    unsafe {
        WDTCR.write_volatile(config);
    }
}

/// Pet the watchdog.
pub fn wdt_reset() {
    #[cfg(target_arch = "avr")]
    unsafe {
        core::arch::asm!("wdr");
    }
}

/// Disable the watchdog via its timed change-enable sequence.
pub fn wdt_disable() {
    let _masked = CriticalSection::enter();
    wdt_reset();
    unsafe {
        WDTCR.write_volatile(WDTCR.read_volatile() | WDCE | WDE);
        WDTCR.write_volatile(0);
    }
}

/// Gate the clocks of the given peripherals off.
pub fn power_down(mask: u8) {
    unsafe {
        PRR.write_volatile(PRR.read_volatile() | mask);
    }
}

/// Restore the clocks of the given peripherals.
pub fn power_up(mask: u8) {
    unsafe {
        PRR.write_volatile(PRR.read_volatile() & !mask);
    }
}
