//! Hardware abstraction layer for two ATtiny families, built on the
//! [`embedded-hal`] traits.
//!
//! The classic core (ATtiny85) has no SPI, I2C or UART hardware; this crate
//! substitutes [bit banging] assisted by the USI shift register for the two
//! bus protocols, and a purely software UART for asynchronous serial. The
//! modern core (ATtiny404) gets thin typed drivers over its real SPI0, TWI0
//! and USART0 peripherals, alongside GPIO, ADC and timer/PWM wrappers for
//! both parts.
//!
//! The protocol state machines in [`spi`], [`i2c`] and [`serial`] are
//! generic over the [`usi::Usi`] seam and the `embedded-hal` pin and timer
//! traits, so they run unchanged against real registers or against a
//! simulated bus in the test suite.
//!
//! [bit banging]: https://en.wikipedia.org/wiki/Bit_banging
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal

#![no_std]

#[cfg(test)]
extern crate std;

pub mod i2c;
pub mod serial;
pub mod spi;
pub mod usi;

#[cfg(feature = "attiny404")]
pub mod attiny404;
#[cfg(feature = "attiny85")]
pub mod attiny85;

#[cfg(test)]
pub(crate) mod testutil;
