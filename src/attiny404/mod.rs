//! Modern-core device layer (ATtiny404).
//!
//! This part carries real SPI0, TWI0 and USART0 blocks, so the drivers
//! here are thin register wrappers rather than bit-banging; the TWI master
//! shares the I2C error taxonomy with the software master and can report
//! the bus faults the software one cannot observe. [`tcb0::Tcb0`] is the
//! natural `CountDown` source on this family if a bit-banged driver is
//! ever needed on spare pins.
//!
//! Peripheral base addresses follow the unified data-space layout of the
//! tinyAVR 0-series; 16-bit registers are accessed low byte first through
//! the hardware TEMP mechanism.

pub mod adc;
pub mod gpio;
pub mod spi;
pub mod tca0;
pub mod tcb0;
pub mod twi;
pub mod usart;
