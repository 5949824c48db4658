//! Hardware TWI0 master.
//!
//! Same error taxonomy as the bit-banged master, but this block genuinely
//! observes bus faults and lost arbitration, so every primitive decodes
//! MSTATUS instead of collapsing failures into a boolean. Wait loops spin
//! on WIF/RIF, which the hardware also raises on every error condition,
//! so they terminate without a software deadline.

use core::convert::Infallible;

use embedded_hal::blocking::i2c::{Read, Write, WriteRead};

use crate::i2c::Direction;

/// TWI errors never carry a GPIO error here.
pub type Error = crate::i2c::Error<Infallible>;

const MCTRLA: *mut u8 = 0x0813 as *mut u8;
const MCTRLB: *mut u8 = 0x0814 as *mut u8;
const MSTATUS: *mut u8 = 0x0815 as *mut u8;
const MBAUD: *mut u8 = 0x0816 as *mut u8;
const MADDR: *mut u8 = 0x0817 as *mut u8;
const MDATA: *mut u8 = 0x0818 as *mut u8;

const ENABLE: u8 = 0x01;

const RIF: u8 = 0x80;
const WIF: u8 = 0x40;
const RXACK: u8 = 0x10;
const ARBLOST: u8 = 0x08;
const BUSERR: u8 = 0x04;
const BUSSTATE_IDLE: u8 = 0x01;

const ACKACT_NACK: u8 = 0x04;
const MCMD_RECVTRANS: u8 = 0x02;
const MCMD_STOP: u8 = 0x03;

/// Bus clock selection.
///
/// Baud values assume a 16 MHz core clock and sit on the conservative
/// side to absorb worst-case bus rise times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Baud {
    Khz100,
    Khz400,
}

impl Baud {
    fn setting(self) -> u8 {
        match self {
            Baud::Khz100 => 255,
            Baud::Khz400 => 47,
        }
    }
}

/// The TWI0 block in master mode.
pub struct Twi;

impl Twi {
    /// Enable the master and force the bus-state machine to idle.
    pub fn new(baud: Baud) -> Self {
        unsafe {
            MBAUD.write_volatile(baud.setting());
            MCTRLA.write_volatile(ENABLE);
            MSTATUS.write_volatile(BUSSTATE_IDLE);
        }
        Twi
    }

    /// Address a slave for the given direction (START or repeated START).
    pub fn start(&mut self, addr: u8, dir: Direction) -> Result<(), Error> {
        let rw = match dir {
            Direction::Read => 1,
            Direction::Write => 0,
        };
        unsafe {
            MADDR.write_volatile((addr << 1) | rw);
        }
        let status = self.wait_flags(if dir == Direction::Read { RIF | WIF } else { WIF });
        self.decode(status)
    }

    /// Release the bus with a STOP condition.
    pub fn stop(&mut self) {
        unsafe {
            MCTRLB.write_volatile(MCMD_STOP);
        }
    }

    /// Transmit one byte and decode the slave's response.
    pub fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        unsafe {
            MDATA.write_volatile(byte);
        }
        let status = self.wait_flags(WIF);
        self.decode(status)
    }

    /// Receive one byte; `ack` launches the next reception, NACK holds
    /// the bus for the STOP.
    pub fn read_byte(&mut self, ack: bool) -> Result<u8, Error> {
        let status = self.wait_flags(RIF);
        if status & BUSERR != 0 {
            return Err(Error::BusError);
        }
        if status & ARBLOST != 0 {
            return Err(Error::ArbitrationLost);
        }
        let data = unsafe { MDATA.read_volatile() };
        unsafe {
            if ack {
                MCTRLB.write_volatile(MCMD_RECVTRANS);
            } else {
                MCTRLB.write_volatile(ACKACT_NACK);
            }
        }
        Ok(data)
    }

    /// Address-and-release probe, the scanner primitive.
    pub fn ping(&mut self, addr: u8) -> Result<bool, Error> {
        let present = match self.start(addr, Direction::Write) {
            Ok(()) => true,
            Err(Error::NoAck) => false,
            Err(e) => return Err(e),
        };
        self.stop();
        Ok(present)
    }

    /// Write a whole buffer inside one transaction.
    pub fn write_bytes(&mut self, addr: u8, bytes: &[u8]) -> Result<(), Error> {
        self.start(addr, Direction::Write)?;
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        self.stop();
        Ok(())
    }

    /// Fill a whole buffer inside one transaction, NACKing the final byte.
    pub fn read_bytes(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), Error> {
        self.start(addr, Direction::Read)?;
        let last = buf.len() - 1;
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.read_byte(i != last)?;
        }
        self.stop();
        Ok(())
    }

    fn wait_flags(&self, flags: u8) -> u8 {
        loop {
            let status = unsafe { MSTATUS.read_volatile() };
            if status & (flags | BUSERR | ARBLOST) != 0 {
                return status;
            }
        }
    }

    fn decode(&self, status: u8) -> Result<(), Error> {
        if status & BUSERR != 0 {
            Err(Error::BusError)
        } else if status & ARBLOST != 0 {
            Err(Error::ArbitrationLost)
        } else if status & RXACK != 0 {
            // RXACK holds the last acknowledgement bit, one means NACK.
            Err(Error::NoAck)
        } else {
            Ok(())
        }
    }
}

impl Write for Twi {
    type Error = Error;

    fn write(&mut self, addr: u8, output: &[u8]) -> Result<(), Error> {
        if output.is_empty() {
            return Ok(());
        }
        self.write_bytes(addr, output)
    }
}

impl Read for Twi {
    type Error = Error;

    fn read(&mut self, addr: u8, input: &mut [u8]) -> Result<(), Error> {
        if input.is_empty() {
            return Ok(());
        }
        self.read_bytes(addr, input)
    }
}

impl WriteRead for Twi {
    type Error = Error;

    fn write_read(&mut self, addr: u8, output: &[u8], input: &mut [u8]) -> Result<(), Error> {
        if output.is_empty() || input.is_empty() {
            return Err(Error::InvalidData);
        }
        self.start(addr, Direction::Write)?;
        for &byte in output {
            self.write_byte(byte)?;
        }
        // Repeated START straight into the read phase.
        self.start(addr, Direction::Read)?;
        let last = input.len() - 1;
        for (i, byte) in input.iter_mut().enumerate() {
            *byte = self.read_byte(i != last)?;
        }
        self.stop();
        Ok(())
    }
}
