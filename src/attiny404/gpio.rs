//! Ports A and B through their set/clear/toggle registers.
//!
//! The modern core gives every port dedicated DIRSET/DIRCLR/OUTSET/OUTCLR
//! registers, so pin operations are single volatile writes with no
//! read-modify-write window to protect.

use core::convert::Infallible;

use embedded_hal::digital::v2::{InputPin, OutputPin, StatefulOutputPin, ToggleableOutputPin};

const PORTA_BASE: usize = 0x0400;
const PORTB_BASE: usize = 0x0420;

const DIRSET: usize = 0x01;
const DIRCLR: usize = 0x02;
const OUT: usize = 0x04;
const OUTSET: usize = 0x05;
const OUTCLR: usize = 0x06;
const OUTTGL: usize = 0x07;
const IN: usize = 0x08;
const PIN0CTRL: usize = 0x10;

const PULLUPEN: u8 = 0x08;
const ISC_INPUT_DISABLE: u8 = 0x04;

/// GPIO port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    A,
    B,
}

impl Port {
    fn base(self) -> usize {
        match self {
            Port::A => PORTA_BASE,
            Port::B => PORTB_BASE,
        }
    }
}

/// An unconfigured pin on port A or B.
pub struct Pin {
    port: Port,
    n: u8,
}

impl Pin {
    /// `n` is the pin index within the port (PA0..PA7, PB0..PB3 on the
    /// 14-pin package).
    pub fn new(port: Port, n: u8) -> Self {
        Pin { port, n: n & 0x07 }
    }

    fn reg(&self, offset: usize) -> *mut u8 {
        (self.port.base() + offset) as *mut u8
    }

    fn mask(&self) -> u8 {
        1 << self.n
    }

    fn pinctrl(&self) -> *mut u8 {
        (self.port.base() + PIN0CTRL + self.n as usize) as *mut u8
    }

    /// Push-pull output, initially low.
    pub fn into_output(self) -> Output {
        unsafe {
            self.reg(OUTCLR).write_volatile(self.mask());
            self.reg(DIRSET).write_volatile(self.mask());
        }
        Output { pin: self }
    }

    /// Push-pull output, initially high.
    pub fn into_output_high(self) -> Output {
        unsafe {
            self.reg(OUTSET).write_volatile(self.mask());
            self.reg(DIRSET).write_volatile(self.mask());
        }
        Output { pin: self }
    }

    /// Floating input.
    pub fn into_input(self) -> Input {
        unsafe {
            self.reg(DIRCLR).write_volatile(self.mask());
            self.pinctrl()
                .write_volatile(self.pinctrl().read_volatile() & !PULLUPEN);
        }
        Input { pin: self }
    }

    /// Input with the internal pull-up engaged.
    pub fn into_pull_up_input(self) -> Input {
        unsafe {
            self.reg(DIRCLR).write_volatile(self.mask());
            self.pinctrl()
                .write_volatile(self.pinctrl().read_volatile() | PULLUPEN);
        }
        Input { pin: self }
    }

    /// Analog input: digital input buffer disabled.
    pub fn into_analog(self) -> Analog {
        unsafe {
            self.reg(DIRCLR).write_volatile(self.mask());
            self.pinctrl()
                .write_volatile(self.pinctrl().read_volatile() | ISC_INPUT_DISABLE);
        }
        Analog { _pin: self }
    }
}

/// Push-pull output pin.
pub struct Output {
    pin: Pin,
}

impl OutputPin for Output {
    type Error = Infallible;

    fn set_high(&mut self) -> Result<(), Infallible> {
        unsafe {
            self.pin.reg(OUTSET).write_volatile(self.pin.mask());
        }
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Infallible> {
        unsafe {
            self.pin.reg(OUTCLR).write_volatile(self.pin.mask());
        }
        Ok(())
    }
}

impl StatefulOutputPin for Output {
    fn is_set_high(&self) -> Result<bool, Infallible> {
        Ok(unsafe { self.pin.reg(OUT).read_volatile() } & self.pin.mask() != 0)
    }

    fn is_set_low(&self) -> Result<bool, Infallible> {
        self.is_set_high().map(|level| !level)
    }
}

impl ToggleableOutputPin for Output {
    type Error = Infallible;

    fn toggle(&mut self) -> Result<(), Infallible> {
        unsafe {
            self.pin.reg(OUTTGL).write_volatile(self.pin.mask());
        }
        Ok(())
    }
}

/// Input pin.
pub struct Input {
    pin: Pin,
}

impl InputPin for Input {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(unsafe { self.pin.reg(IN).read_volatile() } & self.pin.mask() != 0)
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        self.is_high().map(|level| !level)
    }
}

/// Pin handed over to the ADC mux.
pub struct Analog {
    _pin: Pin,
}
