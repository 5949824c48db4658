//! The shift-register seam shared by the bit-banged bus masters.
//!
//! Classic-core ATtiny parts carry a Universal Serial Interface: an 8-bit
//! shift register with a 4-bit edge counter, but no clock generator of its
//! own. The [`UsiSpi`](crate::spi::UsiSpi) and [`UsiI2c`](crate::i2c::UsiI2c)
//! masters drive it by software-toggling the clock line one edge at a time
//! and polling the counter-overflow flag to learn when a transfer unit has
//! been shifted through.
//!
//! [`Usi`] captures exactly the operations those drivers need, so the same
//! state machines run against the real peripheral
//! ([`attiny85::Usi`](crate::attiny85::usi::Usi)) or against a virtual
//! shift register wired to a simulated bus in the test suite.

/// Shift-register peripheral assisting a bit-banged bus master.
///
/// The contract mirrors the hardware: the counter counts *clock edges*, two
/// per bus clock cycle, and [`overflowed`](Usi::overflowed) reports the
/// carry out of its 4-bit range. A full byte therefore takes 16 strobes, a
/// single acknowledgement bit two.
pub trait Usi {
    /// Saved interrupt state returned by [`mask_interrupts`](Usi::mask_interrupts).
    type IrqToken;

    /// Load the outgoing byte into the shift register, MSB first on the wire.
    fn load(&mut self, byte: u8);

    /// Latch the byte accumulated by the last completed transfer.
    fn take(&mut self) -> u8;

    /// Clear the transfer flags and preset the edge counter so that
    /// overflow fires after `bits` full clock cycles.
    fn arm(&mut self, bits: u8);

    /// Whether the counter has overflowed since the last [`arm`](Usi::arm).
    fn overflowed(&self) -> bool;

    /// Toggle the bus clock line one edge, advancing the shifter per its
    /// configured clock mode.
    fn strobe(&mut self);

    /// Select which clock edge the shifter samples on (CPHA).
    ///
    /// Only meaningful for three-wire operation; the two-wire mode samples
    /// on the rising edge as I2C requires, so the default is a no-op.
    fn set_phase(&mut self, _sample_on_second_edge: bool) {}

    /// Sense the actual level of the clock line.
    ///
    /// On an open-drain bus a slave may hold the line low past our release;
    /// the I2C master spins on this between edges.
    fn clock_line_high(&self) -> bool;

    /// Enable or disable driving the data line from the shift register.
    ///
    /// In two-wire mode the register's MSB pulls SDA low while output is
    /// enabled; disabling releases the line for the slave to drive.
    fn data_output(&mut self, enable: bool);

    /// Mask interrupts, returning the state to restore afterwards.
    ///
    /// Byte transfers that cannot tolerate timing jitter hold the mask for
    /// their full duration; callers must pair every token with a
    /// [`restore_interrupts`](Usi::restore_interrupts) on every exit path.
    fn mask_interrupts(&mut self) -> Self::IrqToken;

    /// Restore the interrupt state captured by the matching mask call.
    fn restore_interrupts(&mut self, token: Self::IrqToken);
}

/// Edge-counter preset for a transfer of `bits` clock cycles.
///
/// The 4-bit counter increments on both edges and carries out of 15, so a
/// byte (16 edges) starts from 0 and an acknowledgement bit (2 edges) from
/// 14.
pub const fn counter_preset(bits: u8) -> u8 {
    16u8.wrapping_sub(bits.wrapping_mul(2)) & 0x0F
}
