//! 10-bit ADC with selectable 8-bit resolution.

use core::convert::Infallible;

const CTRLA: *mut u8 = 0x0600 as *mut u8;
const CTRLC: *mut u8 = 0x0602 as *mut u8;
const MUXPOS: *mut u8 = 0x0606 as *mut u8;
const COMMAND: *mut u8 = 0x0608 as *mut u8;
const INTFLAGS: *mut u8 = 0x060B as *mut u8;
const RESL: *mut u8 = 0x0610 as *mut u8;
const RESH: *mut u8 = 0x0611 as *mut u8;

const ENABLE: u8 = 0x01;
const RESSEL_8BIT: u8 = 0x04;
const STCONV: u8 = 0x01;
const RESRDY: u8 = 0x01;
const SAMPCAP: u8 = 0x40;
const REFSEL_VDD: u8 = 0x10;

/// Conversion reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reference {
    /// Internal voltage reference.
    Internal,
    /// Supply voltage.
    Vdd,
}

/// ADC clock prescaler, encoded as the PRESC field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    Div2 = 0,
    Div4 = 1,
    Div8 = 2,
    Div16 = 3,
    Div32 = 4,
    Div64 = 5,
    Div128 = 6,
    Div256 = 7,
}

/// Result width. The converter is 10-bit; 8-bit truncates in hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    TenBit,
    EightBit,
}

/// Analog input channels (MUXPOS values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Ain0 = 0,
    Ain1 = 1,
    Ain2 = 2,
    Ain3 = 3,
    Ain4 = 4,
    Ain5 = 5,
    Ain6 = 6,
    Ain7 = 7,
}

/// The ADC0 block.
pub struct Adc {
    in_progress: bool,
}

impl Adc {
    /// Configure reference, clock and resolution; the converter starts
    /// disabled.
    pub fn new(reference: Reference, prescaler: Prescaler, resolution: Resolution) -> Self {
        let refsel = match reference {
            Reference::Internal => 0x00,
            Reference::Vdd => REFSEL_VDD,
        };
        let ressel = match resolution {
            Resolution::TenBit => 0x00,
            Resolution::EightBit => RESSEL_8BIT,
        };
        unsafe {
            CTRLC.write_volatile(SAMPCAP | refsel | prescaler as u8);
            CTRLA.write_volatile(ressel);
        }
        Adc { in_progress: false }
    }

    pub fn enable(&mut self) {
        unsafe {
            CTRLA.write_volatile(CTRLA.read_volatile() | ENABLE);
        }
    }

    pub fn disable(&mut self) {
        unsafe {
            CTRLA.write_volatile(CTRLA.read_volatile() & !ENABLE);
        }
        self.in_progress = false;
    }

    /// Run one conversion to completion.
    pub fn read_blocking(&mut self, channel: Channel) -> u16 {
        unsafe {
            MUXPOS.write_volatile(channel as u8);
            COMMAND.write_volatile(STCONV);
            while INTFLAGS.read_volatile() & RESRDY == 0 {}
        }
        self.result()
    }

    /// Kick off a conversion without waiting for it.
    pub fn start(&mut self, channel: Channel) -> nb::Result<(), Infallible> {
        if self.in_progress {
            return Err(nb::Error::WouldBlock);
        }
        unsafe {
            MUXPOS.write_volatile(channel as u8);
            COMMAND.write_volatile(STCONV);
        }
        self.in_progress = true;
        Ok(())
    }

    /// Collect the result of a conversion begun with [`start`](Adc::start).
    pub fn poll(&mut self) -> nb::Result<u16, Infallible> {
        if unsafe { INTFLAGS.read_volatile() } & RESRDY == 0 {
            return Err(nb::Error::WouldBlock);
        }
        self.in_progress = false;
        Ok(self.result())
    }

    pub fn is_busy(&self) -> bool {
        self.in_progress
    }

    fn result(&self) -> u16 {
        // Reading the low byte latches the high byte; RESRDY clears with
        // the read.
        unsafe {
            let low = RESL.read_volatile() as u16;
            let high = RESH.read_volatile() as u16;
            low | (high << 8)
        }
    }
}
