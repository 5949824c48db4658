//! Timer/Counter0 in PWM mode.
//!
//! Two output-compare channels, OC0A on PB0 and OC0B on PB1, split into
//! independent [`PwmPin`] handles once the waveform and prescaler are set.

use embedded_hal::PwmPin;

const OCR0B: *mut u8 = 0x48 as *mut u8;
const OCR0A: *mut u8 = 0x49 as *mut u8;
const TCCR0A: *mut u8 = 0x4A as *mut u8;
const TCCR0B: *mut u8 = 0x53 as *mut u8;

const COM0A1: u8 = 0x80;
const COM0A0: u8 = 0x40;
const COM0B1: u8 = 0x20;
const COM0B0: u8 = 0x10;
const WGM01: u8 = 0x02;
const WGM00: u8 = 0x01;

/// PWM waveform generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Waveform {
    /// Fast PWM, counting up only.
    Fast,
    /// Phase-correct PWM, counting up and down.
    PhaseCorrect,
}

/// Timer clock prescaler, encoded as the CS field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    Direct = 1,
    Div8 = 2,
    Div64 = 3,
    Div256 = 4,
    Div1024 = 5,
}

/// Timer0 configured for PWM, split into its compare channels.
pub struct Timer0Pwm;

impl Timer0Pwm {
    pub fn new(waveform: Waveform, prescaler: Prescaler) -> Self {
        let wgm = match waveform {
            Waveform::Fast => WGM01 | WGM00,
            Waveform::PhaseCorrect => WGM00,
        };
        unsafe {
            TCCR0A.write_volatile(wgm);
            TCCR0B.write_volatile(prescaler as u8);
        }
        Timer0Pwm
    }

    /// Hand out the two channels; each starts disconnected with zero duty.
    pub fn split(self) -> (Pwm0A, Pwm0B) {
        (Pwm0A, Pwm0B)
    }
}

/// Compare channel A, output on PB0.
pub struct Pwm0A;

impl PwmPin for Pwm0A {
    type Duty = u8;

    fn enable(&mut self) {
        unsafe {
            TCCR0A.write_volatile(TCCR0A.read_volatile() | COM0A1);
        }
    }

    fn disable(&mut self) {
        unsafe {
            TCCR0A.write_volatile(TCCR0A.read_volatile() & !(COM0A1 | COM0A0));
        }
    }

    fn get_duty(&self) -> u8 {
        unsafe { OCR0A.read_volatile() }
    }

    fn get_max_duty(&self) -> u8 {
        u8::MAX
    }

    fn set_duty(&mut self, duty: u8) {
        unsafe {
            OCR0A.write_volatile(duty);
        }
    }
}

/// Compare channel B, output on PB1.
pub struct Pwm0B;

impl PwmPin for Pwm0B {
    type Duty = u8;

    fn enable(&mut self) {
        unsafe {
            TCCR0A.write_volatile(TCCR0A.read_volatile() | COM0B1);
        }
    }

    fn disable(&mut self) {
        unsafe {
            TCCR0A.write_volatile(TCCR0A.read_volatile() & !(COM0B1 | COM0B0));
        }
    }

    fn get_duty(&self) -> u8 {
        unsafe { OCR0B.read_volatile() }
    }

    fn get_max_duty(&self) -> u8 {
        u8::MAX
    }

    fn set_duty(&mut self, duty: u8) {
        unsafe {
            OCR0B.write_volatile(duty);
        }
    }
}
