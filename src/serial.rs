//! Bit-banged half-duplex UART.
//!
//! Framing is fixed 8N1, least significant bit first: the line is driven
//! low for one bit period (start), then one period per data bit, then high
//! for one period (stop), ten periods per byte. Reception polls for the
//! start edge, re-centres half a bit period past it and samples each data
//! bit at the midpoint of its cell.
//!
//! Timing comes entirely from the injected periodic timer; nothing masks
//! interrupts here, so a handler firing mid-byte stretches a bit cell and
//! corrupts the frame without detection. Keep transfers inside quiet
//! windows or accept the corruption.

use core::time::Duration;
use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::serial;
use embedded_hal::timer::{CountDown, Periodic};
use nb::block;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Serial error
#[derive(Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// GPIO error
    Bus(E),
    /// No start edge arrived inside the timeout window
    Timeout,
}

/// Software UART over one output and one input pin.
///
/// The TX pin must idle high before the first write; the device-layer
/// constructors hand out pins already driven high for this reason.
pub struct SoftSerial<TX, RX, Timer>
where
    TX: OutputPin,
    RX: InputPin,
    Timer: CountDown + Periodic,
{
    tx: TX,
    rx: RX,
    timer: Timer,
    bit_ns: u64,
    half_bit_ns: u64,
}

impl<TX, RX, Timer, E> SoftSerial<TX, RX, Timer>
where
    TX: OutputPin<Error = E>,
    RX: InputPin<Error = E>,
    Timer: CountDown + Periodic,
    Timer::Time: From<Duration>,
{
    /// Create a UART running at `baud` bits per second.
    pub fn new(tx: TX, rx: RX, timer: Timer, baud: u32) -> Self {
        let bit_ns = NANOS_PER_SEC / u64::from(baud);
        SoftSerial {
            tx,
            rx,
            timer,
            bit_ns,
            half_bit_ns: bit_ns / 2,
        }
    }

    /// Release the pins and timer.
    pub fn free(self) -> (TX, RX, Timer) {
        (self.tx, self.rx, self.timer)
    }

    /// Whether a start bit is currently on the line.
    pub fn start_pending(&self) -> Result<bool, Error<E>> {
        self.rx.is_low().map_err(Error::Bus)
    }

    /// Receive one byte, polling for the start edge in roughly
    /// microsecond steps for at most `timeout_us`.
    ///
    /// The bound is a poll counter paced by the timer, not an elapsed-time
    /// measurement; interrupts stealing cycles make it run long, never
    /// short. On timeout no bit periods are consumed.
    pub fn read_timeout(&mut self, timeout_us: u32) -> Result<u8, Error<E>> {
        let mut waited = 0u32;
        while self.rx.is_high().map_err(Error::Bus)? {
            if waited >= timeout_us {
                return Err(Error::Timeout);
            }
            waited += 1;
            self.wait_time(1_000);
        }
        self.sample_frame()
    }

    /// Sample the 8 data bits and wait out the stop bit, assuming the
    /// start edge was just observed.
    fn sample_frame(&mut self) -> Result<u8, Error<E>> {
        // Centre on the start bit, then sample one full period apart.
        self.wait_time(self.half_bit_ns);

        let mut data = 0u8;
        for bit in 0..8 {
            self.wait_time(self.bit_ns);
            if self.rx.is_high().map_err(Error::Bus)? {
                data |= 1 << bit;
            }
        }

        // Let the stop bit pass before the next poll can begin.
        self.wait_time(self.bit_ns);
        Ok(data)
    }

    #[inline]
    fn wait_time(&mut self, nanoseconds: u64) {
        self.timer.start(Duration::from_nanos(nanoseconds));
        block!(self.timer.wait()).ok();
    }
}

impl<TX, RX, Timer, E> serial::Write<u8> for SoftSerial<TX, RX, Timer>
where
    TX: OutputPin<Error = E>,
    RX: InputPin<Error = E>,
    Timer: CountDown + Periodic,
    Timer::Time: From<Duration>,
{
    type Error = Error<E>;

    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        // Start bit
        self.tx.set_low().map_err(|e| nb::Error::Other(Error::Bus(e)))?;
        self.wait_time(self.bit_ns);

        // 8 data bits, LSB first
        for bit in 0..8 {
            if byte & (1 << bit) != 0 {
                self.tx.set_high().map_err(|e| nb::Error::Other(Error::Bus(e)))?;
            } else {
                self.tx.set_low().map_err(|e| nb::Error::Other(Error::Bus(e)))?;
            }
            self.wait_time(self.bit_ns);
        }

        // Stop bit
        self.tx.set_high().map_err(|e| nb::Error::Other(Error::Bus(e)))?;
        self.wait_time(self.bit_ns);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}

impl<TX, RX, Timer, E> serial::Read<u8> for SoftSerial<TX, RX, Timer>
where
    TX: OutputPin<Error = E>,
    RX: InputPin<Error = E>,
    Timer: CountDown + Periodic,
    Timer::Time: From<Duration>,
{
    type Error = Error<E>;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        // Block until a start edge arrives.
        while self.rx.is_high().map_err(|e| nb::Error::Other(Error::Bus(e)))? {}
        self.sample_frame().map_err(nb::Error::Other)
    }
}

impl<TX, RX, Timer, E> core::fmt::Write for SoftSerial<TX, RX, Timer>
where
    TX: OutputPin<Error = E>,
    RX: InputPin<Error = E>,
    Timer: CountDown + Periodic,
    Timer::Time: From<Duration>,
{
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for &byte in s.as_bytes() {
            block!(serial::Write::write(self, byte)).map_err(|_| core::fmt::Error)?;
        }
        Ok(())
    }
}
