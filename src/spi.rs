//! USI-assisted SPI master.
//!
//! The classic core has no SPI block; this driver loads the outgoing byte
//! into the USI shift register and pulses the clock line sixteen times in
//! software, letting the shifter exchange bits on the configured edge. The
//! strobe loop runs with interrupts masked so the bit clock stays uniform
//! for the whole byte; one byte at the CPU-limited strobe rate bounds the
//! added interrupt latency.
//!
//! Chip select is the caller's responsibility; see
//! [`attiny85::gpio`](crate::attiny85::gpio) for plain output pins.

use embedded_hal::spi::{FullDuplex, Mode, Phase};

use crate::usi::Usi;

/// Wire bit order for a transfer.
///
/// The shifter moves the register MSB first; least-significant-bit-first
/// transfers reverse the byte on both sides of the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Most significant bit on the wire first.
    MsbFirst,
    /// Least significant bit on the wire first.
    LsbFirst,
}

/// SPI master over a USI shift register.
///
/// All four `embedded-hal` modes are accepted for compatibility with the
/// hardware SPI driver, but the shift peripheral only distinguishes phase:
/// the clock line idles low, so modes 2 and 3 behave as 0 and 1. Transfers
/// are blocking and byte-granular with no error path, since SPI has no
/// acknowledgement.
pub struct UsiSpi<U: Usi> {
    usi: U,
    bit_order: BitOrder,
    read_buf: Option<u8>,
}

impl<U: Usi> UsiSpi<U> {
    /// Create a master from a configured shift peripheral.
    pub fn new(mut usi: U, mode: Mode, bit_order: BitOrder) -> Self {
        usi.set_phase(mode.phase == Phase::CaptureOnSecondTransition);
        UsiSpi {
            usi,
            bit_order,
            read_buf: None,
        }
    }

    /// Release the shift peripheral.
    pub fn free(self) -> U {
        self.usi
    }

    /// Exchange one byte, blocking for the full 8-bit shift.
    ///
    /// Interrupts are masked from the first clock edge to the last so no
    /// handler can stretch a bit cell mid-shift.
    pub fn transfer_byte(&mut self, byte: u8) -> u8 {
        let out = match self.bit_order {
            BitOrder::MsbFirst => byte,
            BitOrder::LsbFirst => byte.reverse_bits(),
        };

        self.usi.load(out);
        self.usi.arm(8);

        let irq = self.usi.mask_interrupts();
        while !self.usi.overflowed() {
            self.usi.strobe();
        }
        self.usi.restore_interrupts(irq);

        let got = self.usi.take();
        match self.bit_order {
            BitOrder::MsbFirst => got,
            BitOrder::LsbFirst => got.reverse_bits(),
        }
    }

    /// Exchange a buffer in place, one byte at a time.
    pub fn transfer_in_place(&mut self, buf: &mut [u8]) {
        for byte in buf {
            *byte = self.transfer_byte(*byte);
        }
    }

    /// Clock out a buffer, discarding whatever shifts back in.
    pub fn write_bytes(&mut self, buf: &[u8]) {
        for &byte in buf {
            self.transfer_byte(byte);
        }
    }
}

impl<U: Usi> FullDuplex<u8> for UsiSpi<U> {
    type Error = core::convert::Infallible;

    fn send(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        self.read_buf = Some(self.transfer_byte(byte));
        Ok(())
    }

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.read_buf.take().ok_or(nb::Error::WouldBlock)
    }
}

impl<U: Usi> embedded_hal::blocking::spi::transfer::Default<u8> for UsiSpi<U> {}
impl<U: Usi> embedded_hal::blocking::spi::write::Default<u8> for UsiSpi<U> {}

#[cfg(test)]
mod tests {
    use super::{BitOrder, UsiSpi};
    use crate::testutil::LoopbackUsi;
    use embedded_hal::blocking::spi::{Transfer, Write};
    use embedded_hal::spi::{MODE_0, MODE_1};

    #[test]
    fn loopback_round_trips_every_byte() {
        let mut spi = UsiSpi::new(LoopbackUsi::new(), MODE_0, BitOrder::MsbFirst);
        for value in 0..=255u8 {
            assert_eq!(spi.transfer_byte(value), value);
        }
    }

    #[test]
    fn loopback_round_trips_lsb_first() {
        let mut spi = UsiSpi::new(LoopbackUsi::new(), MODE_0, BitOrder::LsbFirst);
        for value in [0x00u8, 0x01, 0x80, 0xA5, 0xFF] {
            assert_eq!(spi.transfer_byte(value), value);
        }
    }

    #[test]
    fn loopback_round_trips_on_second_edge() {
        let mut spi = UsiSpi::new(LoopbackUsi::new(), MODE_1, BitOrder::MsbFirst);
        for value in [0x0Fu8, 0x5A, 0xC3] {
            assert_eq!(spi.transfer_byte(value), value);
        }
    }

    #[test]
    fn byte_takes_sixteen_clock_edges() {
        let mut spi = UsiSpi::new(LoopbackUsi::new(), MODE_0, BitOrder::MsbFirst);
        spi.transfer_byte(0x42);
        assert_eq!(spi.free().strobes, 16);
    }

    #[test]
    fn interrupts_masked_once_per_byte_and_restored() {
        let mut spi = UsiSpi::new(LoopbackUsi::new(), MODE_0, BitOrder::MsbFirst);
        spi.transfer_byte(0x42);
        spi.transfer_byte(0x99);
        let usi = spi.free();
        assert_eq!(usi.masks, 2);
        assert_eq!(usi.restores, 2);
    }

    #[test]
    fn trait_transfer_and_write_cover_buffers() {
        let mut spi = UsiSpi::new(LoopbackUsi::new(), MODE_0, BitOrder::MsbFirst);
        let mut buf = [0x11u8, 0x22, 0x33];
        let echoed = spi.transfer(&mut buf).unwrap().to_vec();
        assert_eq!(echoed, [0x11, 0x22, 0x33]);
        spi.write(&[0xDE, 0xAD]).unwrap();
        assert_eq!(spi.free().strobes, 16 * 5);
    }
}
