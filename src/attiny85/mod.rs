//! Classic-core device layer (ATtiny85).
//!
//! This part has no SPI, TWI or USART hardware. Bus masters are built by
//! pairing the generic drivers with the [`usi::Usi`] shift peripheral and
//! the open-drain GPIO handles from this module; asynchronous serial uses
//! [`crate::serial::SoftSerial`] over two plain pins and the cycle-counted
//! [`delay::Delay`] time source.
//!
//! Register addresses are the data-space locations from the datasheet,
//! accessed volatile. Instances are not tracked: constructing two handles
//! to the same peripheral aliases the registers, and the caller serialises
//! access exactly as on the bare metal.

pub mod adc;
pub mod critical;
pub mod delay;
pub mod eeprom;
pub mod gpio;
pub mod power;
pub mod timer0;
pub mod usi;

/// USI-assisted SPI master on PB2/PB1/PB0.
pub type SpiMaster = crate::spi::UsiSpi<usi::Usi>;

/// USI-assisted I2C master on PB2 (SCL) and PB0 (SDA), paced by the
/// busy-wait delay timer.
pub type I2cMaster =
    crate::i2c::UsiI2c<usi::Usi, gpio::OpenDrain, gpio::OpenDrain, delay::Delay>;

/// Software UART over any two pins, paced by the busy-wait delay timer.
pub type SoftUart = crate::serial::SoftSerial<gpio::Output, gpio::Input, delay::Delay>;
