/*!
  # USI-assisted I2C master

  The classic core has no TWI block. This master bit-bangs the bus with the
  USI shift register doing the byte work: each data byte is loaded into the
  register, the clock line is strobed sixteen times in software, and the
  counter-overflow flag marks the completed byte. START/STOP conditions and
  the acknowledgement bit are explicit open-drain line manipulations on the
  SCL/SDA pin handles.

  This implementation consumes the following resources:
  - A [`Usi`] shift peripheral (real or virtual).
  - Open-drain SCL and SDA pin handles (`set_high` releases the line to the
    pull-up, `set_low` drives it low).
  - A periodic timer ticking at twice the desired bus clock, one tick per
    clock edge.

  Slave clock stretching is tolerated up to a configurable budget of timer
  ticks per edge; exhausting it yields [`Error::Timeout`]. Bus faults and
  lost arbitration are not observable from a software master; those
  variants are only ever produced by the hardware TWI driver sharing this
  error type.
*/

use embedded_hal::blocking::i2c::{Read, Write, WriteRead};
use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::timer::{CountDown, Periodic};
use nb::block;

use crate::usi::Usi;

/// Ticks of clock-stretch tolerance per edge before giving up.
pub const DEFAULT_TIMEOUT_TICKS: u16 = 1000;

/// I2C error
#[derive(Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// GPIO error
    Bus(E),
    /// Slave did not acknowledge the last byte
    NoAck,
    /// A slave held the clock low past the stretch budget
    Timeout,
    /// Illegal condition detected on the bus (hardware TWI only)
    BusError,
    /// Lost arbitration to another master (hardware TWI only)
    ArbitrationLost,
    /// Invalid input
    InvalidData,
}

/// Transfer direction encoded in the address byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Master reads from the slave.
    Read,
    /// Master writes to the slave.
    Write,
}

impl Direction {
    fn bit(self) -> u8 {
        match self {
            Direction::Read => 1,
            Direction::Write => 0,
        }
    }
}

/// Bit-banged I2C master over a USI shift register.
///
/// Exactly one transaction proceeds at a time; the caller serialises
/// access. A NACK anywhere in a composed sequence aborts the remaining
/// steps and surfaces to the immediate caller; there are no retries.
pub struct UsiI2c<U, SCL, SDA, CLK>
where
    U: Usi,
    SCL: OutputPin,
    SDA: OutputPin + InputPin,
    CLK: CountDown + Periodic,
{
    usi: U,
    scl: SCL,
    sda: SDA,
    clk: CLK,
    timeout_ticks: u16,
}

impl<U, SCL, SDA, CLK, E> UsiI2c<U, SCL, SDA, CLK>
where
    U: Usi,
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    CLK: CountDown + Periodic,
{
    /// Create a master and release both lines to their pull-ups.
    pub fn new(usi: U, scl: SCL, sda: SDA, clk: CLK) -> Result<Self, Error<E>> {
        let mut i2c = UsiI2c {
            usi,
            scl,
            sda,
            clk,
            timeout_ticks: DEFAULT_TIMEOUT_TICKS,
        };
        i2c.set_scl_high()?;
        i2c.set_sda_high()?;
        i2c.wait_for_clk();
        Ok(i2c)
    }

    /// Adjust the per-edge clock-stretch budget, in timer ticks.
    pub fn set_timeout(&mut self, ticks: u16) {
        self.timeout_ticks = ticks;
    }

    /// Release the peripheral, pins and timer.
    pub fn free(self) -> (U, SCL, SDA, CLK) {
        (self.usi, self.scl, self.sda, self.clk)
    }

    /// Generate a START (or repeated START) condition.
    ///
    /// SDA falls while SCL is high, then SCL is taken low ready for the
    /// first address bit.
    pub fn start(&mut self) -> Result<(), Error<E>> {
        self.set_scl_high()?;
        self.set_sda_high()?;
        self.wait_for_clk();

        self.set_sda_low()?;
        self.wait_for_clk();

        self.set_scl_low()?;
        self.wait_for_clk();

        Ok(())
    }

    /// Generate a STOP condition, returning the bus to idle.
    pub fn stop(&mut self) -> Result<(), Error<E>> {
        self.set_sda_low()?;
        self.wait_for_clk();

        self.set_scl_high()?;
        self.wait_for_clk();

        self.set_sda_high()?;
        self.wait_for_clk();

        Ok(())
    }

    /// Shift one byte out and sample the slave's acknowledgement on the
    /// ninth clock.
    pub fn write_byte(&mut self, byte: u8) -> Result<(), Error<E>> {
        self.usi.load(byte);
        self.usi.data_output(true);
        let shifted = self.clocked_shift(8);
        self.usi.data_output(false);
        shifted?;

        // ACK slot: release SDA, sample while SCL is high.
        self.set_sda_high()?;
        self.usi.load(0xFF);
        self.usi.arm(1);
        self.raise_scl()?;
        let acked = self.sda.is_low().map_err(Error::Bus)?;
        self.drop_scl();

        if acked {
            Ok(())
        } else {
            Err(Error::NoAck)
        }
    }

    /// Shift one byte in, then drive the caller's ACK/NACK on the ninth
    /// clock. NACK tells the slave this was the final byte.
    pub fn read_byte(&mut self, ack: bool) -> Result<u8, Error<E>> {
        self.set_sda_high()?;
        self.usi.load(0xFF);
        self.usi.data_output(false);
        self.clocked_shift(8)?;
        let byte = self.usi.take();

        // ACK slot: drive the chosen level for one clock.
        if ack {
            self.set_sda_low()?;
        } else {
            self.set_sda_high()?;
        }
        self.usi.arm(1);
        self.raise_scl()?;
        self.drop_scl();
        self.set_sda_high()?;

        Ok(byte)
    }

    /// START followed by the address byte for the given direction.
    ///
    /// Issued mid-transaction this is a repeated START; no STOP appears on
    /// the bus between the phases.
    pub fn address(&mut self, addr: u8, dir: Direction) -> Result<(), Error<E>> {
        self.start()?;
        self.write_byte((addr << 1) | dir.bit())
    }

    /// Write one register: `S addr+W reg value P`.
    pub fn write_reg(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), Error<E>> {
        self.address(addr, Direction::Write)?;
        self.write_byte(reg)?;
        self.write_byte(value)?;
        self.stop()
    }

    /// Read one register: `S addr+W reg Sr addr+R value P`, NACKing the
    /// single data byte.
    pub fn read_reg(&mut self, addr: u8, reg: u8) -> Result<u8, Error<E>> {
        self.address(addr, Direction::Write)?;
        self.write_byte(reg)?;
        self.address(addr, Direction::Read)?;
        let value = self.read_byte(false)?;
        self.stop()?;
        Ok(value)
    }

    fn clocked_shift(&mut self, bits: u8) -> Result<(), Error<E>> {
        self.usi.arm(bits);
        while !self.usi.overflowed() {
            self.raise_scl()?;
            self.drop_scl();
        }
        Ok(())
    }

    /// Strobe SCL high and wait for the line to actually rise, since a slave
    /// may hold it low to stretch the clock.
    fn raise_scl(&mut self) -> Result<(), Error<E>> {
        self.usi.strobe();
        let mut ticks = 0u16;
        while !self.usi.clock_line_high() {
            if ticks >= self.timeout_ticks {
                return Err(Error::Timeout);
            }
            ticks += 1;
            self.wait_for_clk();
        }
        Ok(())
    }

    fn drop_scl(&mut self) {
        self.usi.strobe();
        self.wait_for_clk();
    }

    #[inline]
    fn read_from_slave(&mut self, input: &mut [u8]) -> Result<(), Error<E>> {
        let last = input.len() - 1;
        for (i, byte) in input.iter_mut().enumerate() {
            *byte = self.read_byte(i != last)?;
        }
        Ok(())
    }

    #[inline]
    fn write_to_slave(&mut self, output: &[u8]) -> Result<(), Error<E>> {
        for byte in output {
            self.write_byte(*byte)?;
        }
        Ok(())
    }

    #[inline]
    fn set_scl_high(&mut self) -> Result<(), Error<E>> {
        self.scl.set_high().map_err(Error::Bus)
    }

    #[inline]
    fn set_scl_low(&mut self) -> Result<(), Error<E>> {
        self.scl.set_low().map_err(Error::Bus)
    }

    #[inline]
    fn set_sda_high(&mut self) -> Result<(), Error<E>> {
        self.sda.set_high().map_err(Error::Bus)
    }

    #[inline]
    fn set_sda_low(&mut self) -> Result<(), Error<E>> {
        self.sda.set_low().map_err(Error::Bus)
    }

    #[inline]
    fn wait_for_clk(&mut self) {
        block!(self.clk.wait()).ok();
    }
}

impl<U, SCL, SDA, CLK, E> Write for UsiI2c<U, SCL, SDA, CLK>
where
    U: Usi,
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    CLK: CountDown + Periodic,
{
    type Error = Error<E>;

    fn write(&mut self, addr: u8, output: &[u8]) -> Result<(), Self::Error> {
        if output.is_empty() {
            return Ok(());
        }

        self.address(addr, Direction::Write)?;
        self.write_to_slave(output)?;
        self.stop()
    }
}

impl<U, SCL, SDA, CLK, E> Read for UsiI2c<U, SCL, SDA, CLK>
where
    U: Usi,
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    CLK: CountDown + Periodic,
{
    type Error = Error<E>;

    fn read(&mut self, addr: u8, input: &mut [u8]) -> Result<(), Self::Error> {
        if input.is_empty() {
            return Ok(());
        }

        self.address(addr, Direction::Read)?;
        self.read_from_slave(input)?;
        self.stop()
    }
}

impl<U, SCL, SDA, CLK, E> WriteRead for UsiI2c<U, SCL, SDA, CLK>
where
    U: Usi,
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    CLK: CountDown + Periodic,
{
    type Error = Error<E>;

    fn write_read(&mut self, addr: u8, output: &[u8], input: &mut [u8]) -> Result<(), Self::Error> {
        if output.is_empty() || input.is_empty() {
            return Err(Error::InvalidData);
        }

        self.address(addr, Direction::Write)?;
        self.write_to_slave(output)?;

        // Sr
        self.address(addr, Direction::Read)?;
        self.read_from_slave(input)?;

        self.stop()
    }
}
