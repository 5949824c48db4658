//! 10-bit successive-approximation ADC.
//!
//! Blocking conversion plus a start/poll pair for callers that want to do
//! work during the sample. Unlike the bus masters, the non-blocking path
//! keeps an in-progress flag in the handle across calls.

use core::convert::Infallible;

const ADCL: *mut u8 = 0x24 as *mut u8;
const ADCH: *mut u8 = 0x25 as *mut u8;
const ADCSRA: *mut u8 = 0x26 as *mut u8;
const ADMUX: *mut u8 = 0x27 as *mut u8;

const ADEN: u8 = 0x80;
const ADSC: u8 = 0x40;
const ADIF: u8 = 0x10;

const MUX_MASK: u8 = 0x0F;

/// Conversion reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reference {
    /// Vcc as reference.
    Vcc,
    /// External reference on the AREF pin.
    Aref,
    /// Internal 1.1 V bandgap.
    Internal1V1,
}

impl Reference {
    fn bits(self) -> u8 {
        match self {
            Reference::Vcc => 0x00,
            Reference::Aref => 0x40,
            Reference::Internal1V1 => 0x80,
        }
    }
}

/// ADC clock prescaler, encoded as the ADPS field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    Div2 = 1,
    Div4 = 2,
    Div8 = 3,
    Div16 = 4,
    Div32 = 5,
    Div64 = 6,
    Div128 = 7,
}

/// Single-ended input channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// ADC0 on PB5.
    Adc0 = 0,
    /// ADC1 on PB2.
    Adc1 = 1,
    /// ADC2 on PB4.
    Adc2 = 2,
    /// ADC3 on PB3.
    Adc3 = 3,
}

/// The ADC block.
pub struct Adc {
    in_progress: bool,
}

impl Adc {
    /// Configure reference and clock; the converter starts disabled.
    pub fn new(reference: Reference, prescaler: Prescaler) -> Self {
        unsafe {
            ADMUX.write_volatile(reference.bits());
            ADCSRA.write_volatile(prescaler as u8);
        }
        Adc { in_progress: false }
    }

    pub fn enable(&mut self) {
        unsafe {
            ADCSRA.write_volatile(ADCSRA.read_volatile() | ADEN);
        }
    }

    pub fn disable(&mut self) {
        unsafe {
            ADCSRA.write_volatile(ADCSRA.read_volatile() & !ADEN);
        }
        self.in_progress = false;
    }

    /// Run one conversion to completion.
    pub fn read_blocking(&mut self, channel: Channel) -> u16 {
        self.select(channel);
        unsafe {
            ADCSRA.write_volatile(ADCSRA.read_volatile() | ADSC);
            while ADCSRA.read_volatile() & ADSC != 0 {}
        }
        self.result()
    }

    /// Kick off a conversion without waiting for it.
    pub fn start(&mut self, channel: Channel) -> nb::Result<(), Infallible> {
        if self.in_progress {
            return Err(nb::Error::WouldBlock);
        }
        self.select(channel);
        unsafe {
            ADCSRA.write_volatile(ADCSRA.read_volatile() | ADSC);
        }
        self.in_progress = true;
        Ok(())
    }

    /// Collect the result of a conversion begun with [`start`](Adc::start).
    pub fn poll(&mut self) -> nb::Result<u16, Infallible> {
        let status = unsafe { ADCSRA.read_volatile() };
        if status & ADSC != 0 || status & ADIF == 0 {
            return Err(nb::Error::WouldBlock);
        }
        unsafe {
            // ADIF clears by writing a one.
            ADCSRA.write_volatile(status | ADIF);
        }
        self.in_progress = false;
        Ok(self.result())
    }

    pub fn is_busy(&self) -> bool {
        self.in_progress
    }

    fn select(&mut self, channel: Channel) {
        unsafe {
            let admux = ADMUX.read_volatile() & !MUX_MASK;
            ADMUX.write_volatile(admux | channel as u8);
        }
    }

    fn result(&self) -> u16 {
        // Low byte first; reading ADCH unlocks the result register pair.
        unsafe {
            let low = ADCL.read_volatile() as u16;
            let high = ADCH.read_volatile() as u16;
            low | (high << 8)
        }
    }
}
