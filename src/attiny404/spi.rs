//! Hardware SPI0 master.
//!
//! Unlike the USI-assisted master this block shifts a whole byte on its
//! own; the driver just feeds DATA and polls the interrupt flag. Chip
//! select stays the caller's responsibility; slave-select disable is set
//! so a low SS pin cannot knock the block out of master mode.

use embedded_hal::spi::{FullDuplex, Mode, Phase, Polarity};

use crate::spi::BitOrder;

const CTRLA: *mut u8 = 0x0820 as *mut u8;
const CTRLB: *mut u8 = 0x0821 as *mut u8;
const INTFLAGS: *mut u8 = 0x0823 as *mut u8;
const DATA: *mut u8 = 0x0824 as *mut u8;

const ENABLE: u8 = 0x01;
const MASTER: u8 = 0x20;
const DORD: u8 = 0x40;
const SSD: u8 = 0x04;
const IF: u8 = 0x80;

/// Core-clock divider for the bus clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    Div4,
    Div16,
    Div64,
    Div128,
}

impl Prescaler {
    fn bits(self) -> u8 {
        match self {
            Prescaler::Div4 => 0x00,
            Prescaler::Div16 => 0x02,
            Prescaler::Div64 => 0x04,
            Prescaler::Div128 => 0x06,
        }
    }
}

fn mode_bits(mode: Mode) -> u8 {
    let cpol = (mode.polarity == Polarity::IdleHigh) as u8;
    let cpha = (mode.phase == Phase::CaptureOnSecondTransition) as u8;
    (cpol << 1) | cpha
}

/// The SPI0 block in master mode.
pub struct Spi {
    read_buf: Option<u8>,
}

impl Spi {
    pub fn new(mode: Mode, prescaler: Prescaler, bit_order: BitOrder) -> Self {
        let mut ctrla = ENABLE | MASTER | prescaler.bits();
        if bit_order == BitOrder::LsbFirst {
            ctrla |= DORD;
        }
        unsafe {
            CTRLB.write_volatile(mode_bits(mode) | SSD);
            CTRLA.write_volatile(ctrla);
        }
        Spi { read_buf: None }
    }

    /// Exchange one byte, blocking until the shift completes.
    pub fn transfer_byte(&mut self, byte: u8) -> u8 {
        unsafe {
            DATA.write_volatile(byte);
            while INTFLAGS.read_volatile() & IF == 0 {}
            DATA.read_volatile()
        }
    }

    /// Clock a byte out, discarding the byte clocked in.
    pub fn write_byte(&mut self, byte: u8) {
        self.transfer_byte(byte);
    }

    /// Clock a byte in while sending an idle-high filler.
    pub fn read_byte(&mut self) -> u8 {
        self.transfer_byte(0xFF)
    }

    /// Disable the block, releasing the pins to GPIO.
    pub fn deinit(self) {
        unsafe {
            CTRLA.write_volatile(0);
        }
    }
}

impl FullDuplex<u8> for Spi {
    type Error = core::convert::Infallible;

    fn send(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        self.read_buf = Some(self.transfer_byte(byte));
        Ok(())
    }

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.read_buf.take().ok_or(nb::Error::WouldBlock)
    }
}

impl embedded_hal::blocking::spi::transfer::Default<u8> for Spi {}
impl embedded_hal::blocking::spi::write::Default<u8> for Spi {}

#[cfg(test)]
mod tests {
    use super::mode_bits;
    use embedded_hal::spi::{MODE_0, MODE_1, MODE_2, MODE_3};

    #[test]
    fn mode_field_encodes_polarity_and_phase() {
        assert_eq!(mode_bits(MODE_0), 0b00);
        assert_eq!(mode_bits(MODE_1), 0b01);
        assert_eq!(mode_bits(MODE_2), 0b10);
        assert_eq!(mode_bits(MODE_3), 0b11);
    }
}
