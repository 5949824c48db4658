//! Hardware USART0.
//!
//! Full frame-format control the software UART deliberately lacks:
//! 5–9 data bits, optional parity, one or two stop bits. The baud table
//! assumes a 16 MHz core clock.

use embedded_hal::serial;

const RXDATAL: *mut u8 = 0x0800 as *mut u8;
const TXDATAL: *mut u8 = 0x0802 as *mut u8;
const STATUS: *mut u8 = 0x0804 as *mut u8;
const CTRLA: *mut u8 = 0x0805 as *mut u8;
const CTRLB: *mut u8 = 0x0806 as *mut u8;
const CTRLC: *mut u8 = 0x0807 as *mut u8;
const BAUDL: *mut u8 = 0x0808 as *mut u8;
const BAUDH: *mut u8 = 0x0809 as *mut u8;

const RXCIF: u8 = 0x80;
const DREIF: u8 = 0x20;

const RXEN: u8 = 0x80;
const TXEN: u8 = 0x40;

const SBMODE_2BIT: u8 = 0x08;
const PMODE_EVEN: u8 = 0x20;
const PMODE_ODD: u8 = 0x30;

/// Line rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Baud {
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl Baud {
    fn setting(self) -> u16 {
        match self {
            Baud::B9600 => 1047,
            Baud::B19200 => 523,
            Baud::B38400 => 261,
            Baud::B57600 => 173,
            Baud::B115200 => 86,
        }
    }
}

/// Data bits per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
    Nine,
}

impl DataBits {
    fn chsize(self) -> u8 {
        match self {
            DataBits::Five => 0x00,
            DataBits::Six => 0x01,
            DataBits::Seven => 0x02,
            DataBits::Eight => 0x03,
            DataBits::Nine => 0x07,
        }
    }
}

/// Parity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Stop bits per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

/// Frame and rate configuration.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub baud: Baud,
    pub databits: DataBits,
    pub parity: Parity,
    pub stopbits: StopBits,
}

impl Default for Config {
    /// 9600 8N1.
    fn default() -> Self {
        Config {
            baud: Baud::B9600,
            databits: DataBits::Eight,
            parity: Parity::None,
            stopbits: StopBits::One,
        }
    }
}

fn frame_bits(config: &Config) -> u8 {
    let mut ctrlc = config.databits.chsize();
    ctrlc |= match config.parity {
        Parity::None => 0,
        Parity::Even => PMODE_EVEN,
        Parity::Odd => PMODE_ODD,
    };
    if config.stopbits == StopBits::Two {
        ctrlc |= SBMODE_2BIT;
    }
    ctrlc
}

/// The USART0 block.
pub struct Usart;

impl Usart {
    pub fn new(config: Config) -> Self {
        let setting = config.baud.setting();
        unsafe {
            BAUDL.write_volatile(setting as u8);
            BAUDH.write_volatile((setting >> 8) as u8);
            CTRLC.write_volatile(frame_bits(&config));
            CTRLB.write_volatile(TXEN | RXEN);
        }
        Usart
    }

    /// Transmit one byte, blocking until the data register frees up.
    pub fn write_byte(&mut self, byte: u8) {
        unsafe {
            while STATUS.read_volatile() & DREIF == 0 {}
            TXDATAL.write_volatile(byte);
        }
    }

    /// Receive one byte, blocking until one arrives.
    pub fn read_byte(&mut self) -> u8 {
        unsafe {
            while STATUS.read_volatile() & RXCIF == 0 {}
            RXDATAL.read_volatile()
        }
    }

    /// Whether a received byte is waiting.
    pub fn available(&self) -> bool {
        (unsafe { STATUS.read_volatile() }) & RXCIF != 0
    }

    /// Disable the block.
    pub fn deinit(self) {
        unsafe {
            CTRLA.write_volatile(0);
            CTRLB.write_volatile(0);
        }
    }
}

impl serial::Write<u8> for Usart {
    type Error = core::convert::Infallible;

    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        if unsafe { STATUS.read_volatile() } & DREIF == 0 {
            return Err(nb::Error::WouldBlock);
        }
        unsafe {
            TXDATAL.write_volatile(byte);
        }
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        if unsafe { STATUS.read_volatile() } & DREIF == 0 {
            return Err(nb::Error::WouldBlock);
        }
        Ok(())
    }
}

impl serial::Read<u8> for Usart {
    type Error = core::convert::Infallible;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        if unsafe { STATUS.read_volatile() } & RXCIF == 0 {
            return Err(nb::Error::WouldBlock);
        }
        Ok(unsafe { RXDATAL.read_volatile() })
    }
}

impl core::fmt::Write for Usart {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for &byte in s.as_bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}
